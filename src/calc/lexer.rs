//! Implements the lexer for the whitespace separated prefix notation.

use super::registry::{PrimOp, SEPARATOR};
use super::span::Span;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Token {
    /// A primitive of the registry
    Function(PrimOp),
    /// The `,` between the arguments of a binary call
    Separator,
    /// Brackets only occur in the parenthesized form
    ParenOpen,
    ParenClose,
    /// Anything else is content
    Symbol,
}

impl Token {
    pub fn classify(word: &str) -> Token {
        match word {
            SEPARATOR => Token::Separator,
            "(" => Token::ParenOpen,
            ")" => Token::ParenClose,
            _ => PrimOp::lookup(word).map_or(Token::Symbol, Token::Function),
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    stream: std::str::CharIndices<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            stream: input.char_indices(),
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Return the byte-offset of the next character that would be read.
    pub fn current_offset(&self) -> usize {
        self.peek_char().map_or(self.input.len(), |(pos, _)| pos)
    }

    fn peek_char(&self) -> Option<(usize, char)> {
        self.stream.clone().next()
    }

    fn next_char(&mut self) -> Option<(usize, char)> {
        self.stream.next()
    }

    /// Indentify the next token
    pub fn next_token(&mut self) -> Option<(Span, Token)> {
        while let Some((begin, ch)) = self.next_char() {
            if ch.is_whitespace() {
                continue;
            }
            while let Some((_, ch)) = self.peek_char() {
                if ch.is_whitespace() {
                    break;
                }
                self.next_char();
            }
            let span = Span::new(begin, self.current_offset());
            return Some((span, Token::classify(span.slice(self.input))));
        }
        None
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = (Span, Token);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_words() {
        let tokens: Vec<_> = Lexer::new("append  A1 reverse B1 ,\tC1").collect();
        assert_eq!(
            tokens,
            vec![
                (Span::new(0, 6), Token::Function(PrimOp::Append)),
                (Span::new(8, 10), Token::Symbol),
                (Span::new(11, 18), Token::Function(PrimOp::Reverse)),
                (Span::new(19, 21), Token::Symbol),
                (Span::new(22, 23), Token::Separator),
                (Span::new(24, 26), Token::Symbol),
            ]
        );
    }

    #[test]
    fn brackets_and_glued_commas() {
        let input = "copy ( a,b )";
        let words: Vec<_> = Lexer::new(input)
            .map(|(span, tok)| (span.slice(input), tok))
            .collect();
        assert_eq!(
            words,
            vec![
                ("copy", Token::Function(PrimOp::Copy)),
                ("(", Token::ParenOpen),
                ("a,b", Token::Symbol),
                (")", Token::ParenClose),
            ]
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(Lexer::new("   ").next_token(), None);
    }
}
