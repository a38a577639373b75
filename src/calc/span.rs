//! Bits and pieces for working with ranges of text.

use std::fmt;

/// A region with a text.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Span {
    /// The byte-offset of the first character of the span.
    pub begin: usize,
    /// The byte-offset of the first character *after* the span.
    pub end: usize,
}

impl Span {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    pub fn slice<'a>(&self, input: &'a str) -> &'a str {
        &input[self.begin..self.end]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.begin, self.end)
    }
}
