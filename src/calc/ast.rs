// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

use std::fmt;

use super::pretty;
use super::registry::PrimOp;

/// A content symbol, such as a letter of the PCFG vocabulary.
pub type Symbol = String;

/// An expression of the calculus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A non-empty sequence of content symbols
    Leaf(Vec<Symbol>),
    /// A primitive applied to as many arguments as its arity demands
    Call { op: PrimOp, args: Vec<Expr> },
}

impl Expr {
    /// A leaf made of the whitespace separated words of `symbols`.
    pub fn leaf(symbols: &str) -> Expr {
        Expr::Leaf(symbols.split_whitespace().map(str::to_owned).collect())
    }

    pub fn call(op: PrimOp, args: Vec<Expr>) -> Expr {
        Expr::Call { op, args }
    }

    /// Total number of calls in the tree.
    pub fn count_calls(&self) -> usize {
        match self {
            Expr::Leaf(_) => 0,
            Expr::Call { args, .. } => 1 + args.iter().map(Expr::count_calls).sum::<usize>(),
        }
    }

    /// Number of calls to `op` anywhere in the tree.
    pub fn count_op(&self, op: PrimOp) -> usize {
        match self {
            Expr::Leaf(_) => 0,
            Expr::Call { op: here, args } => {
                let own = if *here == op { 1 } else { 0 };
                own + args.iter().map(|arg| arg.count_op(op)).sum::<usize>()
            }
        }
    }

    /// A primitive sample consists of a single call, it cannot be unrolled any further.
    pub fn is_primitive(&self) -> bool {
        self.count_calls() == 1
    }
}

/// Renders the flat prefix notation, e.g. `append a b , c`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&pretty::flat(self))
    }
}
