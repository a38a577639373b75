// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Evaluation of expressions, optionally under a swapped semantics.
//!
//! Swapping simulates a lexical exception: the calls keep their name in the source, but
//! for the duration of one evaluation they compute what their replacement computes.

use snafu::{ensure, ResultExt, Snafu};

use super::ast::{Expr, Symbol};
use super::parser::DEFAULT_MAX_DEPTH;
use super::registry::{PrimOp, ReplacementTable, RuleError};

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum EvalError {
    #[snafu(display("{}", source))]
    Rule { source: RuleError },
    #[snafu(display("`{}` is swapped but has no replacement", op))]
    NoReplacement { op: PrimOp },
    #[snafu(display("expression is nested deeper than {} levels", limit))]
    TooDeep { limit: usize },
}

pub struct Evaluator<'a> {
    /// Calls to either of these use their replacement's rule.
    swap: Option<(PrimOp, PrimOp)>,
    replacements: Option<&'a ReplacementTable>,
    max_depth: usize,
}

impl Evaluator<'static> {
    /// Evaluate every call with its own rule.
    pub fn plain() -> Self {
        Self {
            swap: None,
            replacements: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(swap: Option<(PrimOp, PrimOp)>, replacements: &'a ReplacementTable) -> Self {
        Self {
            swap,
            replacements: Some(replacements),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Evaluate calls to `first` and `second` with their replacements.
    pub fn swapped(first: PrimOp, second: PrimOp, replacements: &'a ReplacementTable) -> Self {
        Self::new(Some((first, second)), replacements)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn swap(&self) -> Option<(PrimOp, PrimOp)> {
        self.swap
    }

    pub fn eval(&self, expr: &Expr) -> EvalResult<Vec<Symbol>> {
        self.eval_at(expr, 0)
    }

    /// The primitive whose rule computes a call to `op`.
    pub fn rule_for(&self, op: PrimOp) -> EvalResult<PrimOp> {
        match self.swap {
            Some((first, second)) if op == first || op == second => self
                .replacements
                .and_then(|table| table.get(op))
                .ok_or(EvalError::NoReplacement { op }),
            _ => Ok(op),
        }
    }

    fn eval_at(&self, expr: &Expr, depth: usize) -> EvalResult<Vec<Symbol>> {
        ensure!(
            depth <= self.max_depth,
            TooDeep {
                limit: self.max_depth
            }
        );
        match expr {
            Expr::Leaf(symbols) => Ok(symbols.clone()),
            Expr::Call { op, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval_at(arg, depth + 1))
                    .collect::<EvalResult<Vec<_>>>()?;
                let rule = self.rule_for(*op)?;
                if rule != *op {
                    log::trace!("evaluating `{}` as `{}`", op, rule);
                }
                rule.apply(values).context(Rule)
            }
        }
    }
}

/// Evaluate `expr`, using the replacements for calls to either function of `swap_pair`.
///
/// # Examples
///
/// ```
/// use compo_prep::calc::{eval::evaluate, parser::parse, registry::*};
///
/// let table = ReplacementTable::from_names(vec![("append", "prepend")]).unwrap();
/// let expr = parse("append a b , c d").unwrap();
/// assert_eq!(evaluate(&expr, None, &table).unwrap().join(" "), "a b c d");
/// let swapped = evaluate(&expr, Some((PrimOp::Append, PrimOp::Prepend)), &table).unwrap();
/// assert_eq!(swapped.join(" "), "c d a b");
/// ```
pub fn evaluate(
    expr: &Expr,
    swap_pair: Option<(PrimOp, PrimOp)>,
    replacements: &ReplacementTable,
) -> EvalResult<Vec<Symbol>> {
    Evaluator::new(swap_pair, replacements).eval(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::parser::parse;

    fn plain(source: &str) -> String {
        Evaluator::plain()
            .eval(&parse(source).unwrap())
            .unwrap()
            .join(" ")
    }

    fn table() -> ReplacementTable {
        ReplacementTable::from_names(vec![
            ("append", "prepend"),
            ("prepend", "append"),
            ("reverse", "copy"),
            ("shift", "echo"),
            ("remove_first", "remove_second"),
        ])
        .unwrap()
    }

    #[test]
    fn nested_evaluation() {
        assert_eq!(plain("reverse copy a b c"), "c b a");
        assert_eq!(plain("append reverse a b , c d"), "b a c d");
        assert_eq!(plain("repeat remove_first a , shift b c"), "c b c b");
        assert_eq!(
            plain("swap_first_last prepend echo a b , remove_second c , d"),
            "b a b c"
        );
        assert_eq!(plain("a b"), "a b");
    }

    #[test]
    fn swapped_append() {
        let expr = parse("append a b , c d").unwrap();
        let result = evaluate(&expr, Some((PrimOp::Append, PrimOp::Prepend)), &table());
        assert_eq!(result.unwrap().join(" "), "c d a b");
    }

    #[test]
    fn swap_only_touches_the_pair() {
        let table = table();
        let expr = parse("append reverse a b , shift c d e").unwrap();
        let swapped = Evaluator::swapped(PrimOp::Reverse, PrimOp::RemoveFirst, &table);
        // reverse behaves like copy, shift and append are untouched
        assert_eq!(swapped.eval(&expr).unwrap().join(" "), "a b d e c");
    }

    #[test]
    fn no_swap_is_plain_semantics() {
        let table = table();
        let sources = [
            "append reverse a b , shift c d e",
            "prepend remove_first a , b , echo swap_first_last c d",
            "repeat copy reverse a b c",
        ];
        for source in sources.iter() {
            let expr = parse(source).unwrap();
            assert_eq!(
                evaluate(&expr, None, &table),
                Evaluator::plain().eval(&expr)
            );
        }
    }

    #[test]
    fn deterministic() {
        let table = table();
        let expr = parse("prepend append a b , c , shift remove_first d , e f").unwrap();
        let pair = Some((PrimOp::Append, PrimOp::Shift));
        assert_eq!(evaluate(&expr, pair, &table), evaluate(&expr, pair, &table));
    }

    #[test]
    fn missing_replacement() {
        let table = table();
        let expr = parse("repeat a").unwrap();
        assert_eq!(
            evaluate(&expr, Some((PrimOp::Repeat, PrimOp::Append)), &table),
            Err(EvalError::NoReplacement { op: PrimOp::Repeat })
        );
        assert_eq!(
            Evaluator::plain().rule_for(PrimOp::Repeat),
            Ok(PrimOp::Repeat)
        );
    }

    #[test]
    fn empty_operand() {
        let expr = Expr::call(PrimOp::Echo, vec![Expr::Leaf(vec![])]);
        assert_eq!(
            Evaluator::plain().eval(&expr),
            Err(EvalError::Rule {
                source: RuleError::EmptyOperand { op: PrimOp::Echo }
            })
        );
    }

    #[test]
    fn depth_limit() {
        let mut expr = Expr::leaf("a");
        for _ in 0..5 {
            expr = Expr::call(PrimOp::Copy, vec![expr]);
        }
        assert!(Evaluator::plain().with_max_depth(5).eval(&expr).is_ok());
        assert_eq!(
            Evaluator::plain().with_max_depth(4).eval(&expr),
            Err(EvalError::TooDeep { limit: 4 })
        );
    }
}
