// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The fixed catalog of list-transforming primitives of the PCFG calculus.

use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

use snafu::{ensure, OptionExt, Snafu};

use super::ast::Symbol;

/// Number of arguments a primitive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    Unary,
    Binary,
}

impl Arity {
    pub fn count(self) -> usize {
        match self {
            Arity::Unary => 1,
            Arity::Binary => 2,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Unary => write!(f, "unary"),
            Arity::Binary => write!(f, "binary"),
        }
    }
}

/// A primitive operation over sequences of symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimOp {
    // unary
    Copy,
    Reverse,
    Shift,
    Echo,
    SwapFirstLast,
    Repeat,
    // binary
    Append,
    Prepend,
    RemoveFirst,
    RemoveSecond,
}

/// Name lookup table for all primitives, in the order they are listed in the PCFG grammar.
pub const PRIMOPS: &[(&str, PrimOp)] = &[
    ("append", PrimOp::Append),
    ("prepend", PrimOp::Prepend),
    ("remove_first", PrimOp::RemoveFirst),
    ("remove_second", PrimOp::RemoveSecond),
    ("echo", PrimOp::Echo),
    ("swap_first_last", PrimOp::SwapFirstLast),
    ("repeat", PrimOp::Repeat),
    ("shift", PrimOp::Shift),
    ("reverse", PrimOp::Reverse),
    ("copy", PrimOp::Copy),
];

/// The argument separator of binary calls.
pub const SEPARATOR: &str = ",";

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum RegistryError {
    #[snafu(display("unknown function `{}`", name))]
    UnknownFunction { name: String },
    #[snafu(display(
        "cannot replace {} `{}` with {} `{}`",
        function.arity(),
        function,
        replacement.arity(),
        replacement
    ))]
    ArityMismatch {
        function: PrimOp,
        replacement: PrimOp,
    },
}

/// Errors raised by the primitive rules themselves.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum RuleError {
    #[snafu(display("`{}` applied to an empty sequence", op))]
    EmptyOperand { op: PrimOp },
    #[snafu(display("`{}` expects {} argument(s), got {}", op, expected, actual))]
    ArgumentCount {
        op: PrimOp,
        expected: usize,
        actual: usize,
    },
}

impl PrimOp {
    pub fn lookup(name: &str) -> Option<PrimOp> {
        PRIMOPS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, op)| *op)
    }

    /// Whether the token names a primitive.
    pub fn is_function(token: &str) -> bool {
        Self::lookup(token).is_some()
    }

    pub fn all() -> impl Iterator<Item = PrimOp> {
        PRIMOPS.iter().map(|(_, op)| *op)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimOp::Copy => "copy",
            PrimOp::Reverse => "reverse",
            PrimOp::Shift => "shift",
            PrimOp::Echo => "echo",
            PrimOp::SwapFirstLast => "swap_first_last",
            PrimOp::Repeat => "repeat",
            PrimOp::Append => "append",
            PrimOp::Prepend => "prepend",
            PrimOp::RemoveFirst => "remove_first",
            PrimOp::RemoveSecond => "remove_second",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            PrimOp::Copy
            | PrimOp::Reverse
            | PrimOp::Shift
            | PrimOp::Echo
            | PrimOp::SwapFirstLast
            | PrimOp::Repeat => Arity::Unary,
            PrimOp::Append | PrimOp::Prepend | PrimOp::RemoveFirst | PrimOp::RemoveSecond => {
                Arity::Binary
            }
        }
    }

    /// Apply the rule of this primitive to already evaluated arguments.
    pub fn apply(self, args: Vec<Vec<Symbol>>) -> Result<Vec<Symbol>, RuleError> {
        let expected = self.arity().count();
        ensure!(
            args.len() == expected,
            ArgumentCount {
                op: self,
                expected,
                actual: args.len(),
            }
        );

        let mut args = args.into_iter();
        let first = args.next().unwrap_or_default();
        match self.arity() {
            Arity::Unary => self.apply_unary(first),
            Arity::Binary => self.apply_binary(first, args.next().unwrap_or_default()),
        }
    }

    fn apply_unary(self, mut xs: Vec<Symbol>) -> Result<Vec<Symbol>, RuleError> {
        match self {
            PrimOp::Copy => {}
            PrimOp::Reverse => xs.reverse(),
            PrimOp::Shift => {
                ensure!(!xs.is_empty(), EmptyOperand { op: self });
                xs.rotate_left(1);
            }
            PrimOp::Echo => {
                let last = xs.last().cloned().context(EmptyOperand { op: self })?;
                xs.push(last);
            }
            PrimOp::SwapFirstLast => {
                ensure!(!xs.is_empty(), EmptyOperand { op: self });
                let last = xs.len() - 1;
                xs.swap(0, last);
            }
            PrimOp::Repeat => {
                let copy = xs.clone();
                xs.extend(copy);
            }
            PrimOp::Append | PrimOp::Prepend | PrimOp::RemoveFirst | PrimOp::RemoveSecond => {
                return Err(RuleError::ArgumentCount {
                    op: self,
                    expected: 2,
                    actual: 1,
                })
            }
        }
        Ok(xs)
    }

    fn apply_binary(
        self,
        mut xs: Vec<Symbol>,
        mut ys: Vec<Symbol>,
    ) -> Result<Vec<Symbol>, RuleError> {
        Ok(match self {
            PrimOp::Append => {
                xs.append(&mut ys);
                xs
            }
            PrimOp::Prepend => {
                ys.append(&mut xs);
                ys
            }
            PrimOp::RemoveFirst => ys,
            PrimOp::RemoveSecond => xs,
            PrimOp::Copy
            | PrimOp::Reverse
            | PrimOp::Shift
            | PrimOp::Echo
            | PrimOp::SwapFirstLast
            | PrimOp::Repeat => {
                return Err(RuleError::ArgumentCount {
                    op: self,
                    expected: 1,
                    actual: 2,
                })
            }
        })
    }
}

impl fmt::Display for PrimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrimOp {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimOp::lookup(s).context(UnknownFunction { name: s })
    }
}

/// Which primitive's rule stands in for which other primitive while swapping.
///
/// Only same-arity replacements can be inserted, so a table that exists is
/// always safe to evaluate with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementTable {
    table: BTreeMap<PrimOp, PrimOp>,
}

impl ReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from function names, as they appear in configuration files.
    ///
    /// # Examples
    ///
    /// ```
    /// use compo_prep::calc::registry::*;
    ///
    /// let table = ReplacementTable::from_names(vec![("append", "prepend")]).unwrap();
    /// assert_eq!(table.get(PrimOp::Append), Some(PrimOp::Prepend));
    /// assert!(ReplacementTable::from_names(vec![("append", "reverse")]).is_err());
    /// assert!(ReplacementTable::from_names(vec![("append", "frobnicate")]).is_err());
    /// ```
    pub fn from_names<'a, I>(pairs: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = Self::new();
        for (function, replacement) in pairs {
            table.insert(function.parse()?, replacement.parse()?)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, function: PrimOp, replacement: PrimOp) -> Result<(), RegistryError> {
        ensure!(
            function.arity() == replacement.arity(),
            ArityMismatch {
                function,
                replacement
            }
        );
        self.table.insert(function, replacement);
        Ok(())
    }

    pub fn get(&self, function: PrimOp) -> Option<PrimOp> {
        self.table.get(&function).copied()
    }

    pub fn contains(&self, function: PrimOp) -> bool {
        self.table.contains_key(&function)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syms(s: &str) -> Vec<Symbol> {
        s.split_whitespace().map(str::to_owned).collect()
    }

    fn unary(op: PrimOp, xs: &str) -> Result<Vec<Symbol>, RuleError> {
        op.apply(vec![syms(xs)])
    }

    #[test]
    fn names_round_trip() {
        for (name, op) in PRIMOPS {
            assert_eq!(op.name(), *name);
            assert_eq!(name.parse::<PrimOp>(), Ok(*op));
        }
        assert_eq!(PrimOp::all().count(), 10);
        assert!(!PrimOp::is_function(","));
        assert!(!PrimOp::is_function("A"));
    }

    #[test]
    fn unary_rules() {
        assert_eq!(unary(PrimOp::Copy, "a b c"), Ok(syms("a b c")));
        assert_eq!(unary(PrimOp::Reverse, "a b c"), Ok(syms("c b a")));
        assert_eq!(unary(PrimOp::Shift, "a b c"), Ok(syms("b c a")));
        assert_eq!(unary(PrimOp::Echo, "a b c"), Ok(syms("a b c c")));
        assert_eq!(unary(PrimOp::SwapFirstLast, "a b c d"), Ok(syms("d b c a")));
        assert_eq!(unary(PrimOp::SwapFirstLast, "a"), Ok(syms("a")));
        assert_eq!(unary(PrimOp::Repeat, "a b"), Ok(syms("a b a b")));
    }

    #[test]
    fn binary_rules() {
        let apply = |op: PrimOp| op.apply(vec![syms("a b"), syms("c d")]);
        assert_eq!(apply(PrimOp::Append), Ok(syms("a b c d")));
        assert_eq!(apply(PrimOp::Prepend), Ok(syms("c d a b")));
        assert_eq!(apply(PrimOp::RemoveFirst), Ok(syms("c d")));
        assert_eq!(apply(PrimOp::RemoveSecond), Ok(syms("a b")));
    }

    #[test]
    fn empty_operands_are_rejected() {
        for op in [PrimOp::Shift, PrimOp::Echo, PrimOp::SwapFirstLast].iter() {
            assert_eq!(
                op.apply(vec![vec![]]),
                Err(RuleError::EmptyOperand { op: *op })
            );
        }
    }

    #[test]
    fn wrong_argument_count() {
        assert_eq!(
            PrimOp::Append.apply(vec![syms("a")]),
            Err(RuleError::ArgumentCount {
                op: PrimOp::Append,
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            PrimOp::Reverse.apply_binary(syms("a"), syms("b")),
            Err(RuleError::ArgumentCount {
                op: PrimOp::Reverse,
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn replacement_arity_is_checked() {
        let mut table = ReplacementTable::new();
        assert_eq!(table.insert(PrimOp::Reverse, PrimOp::Shift), Ok(()));
        assert_eq!(
            table.insert(PrimOp::Reverse, PrimOp::Append),
            Err(RegistryError::ArityMismatch {
                function: PrimOp::Reverse,
                replacement: PrimOp::Append
            })
        );
        assert_eq!(table.get(PrimOp::Reverse), Some(PrimOp::Shift));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn replacement_unknown_name() {
        assert_eq!(
            ReplacementTable::from_names(vec![("append", "prepend"), ("fold", "append")]),
            Err(RegistryError::UnknownFunction {
                name: "fold".to_owned()
            })
        );
    }
}
