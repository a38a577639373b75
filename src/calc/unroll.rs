// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Unrolling nested expressions into a trace of single calls.

use super::ast::Expr;
use super::registry::SEPARATOR;

/// One call of a trace, whose result is bound to `variable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// A single call in flat notation whose arguments are leaves or earlier variables.
    pub expression: String,
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    /// Steps in dependency order.
    pub steps: Vec<Step>,
    /// The variable standing for the whole expression, or the text of a bare leaf.
    pub result: String,
}

/// Name of the `index`th variable of a trace, counting from 1.
pub fn variable_name(index: usize) -> String {
    format!("_{}", index)
}

struct Unroller {
    counter: usize,
    steps: Vec<Step>,
}

impl Unroller {
    /// Emit the steps of `expr` and return the reference to its value.
    fn visit(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Leaf(symbols) => symbols.join(" "),
            Expr::Call { op, args } => {
                let references: Vec<String> = args.iter().map(|arg| self.visit(arg)).collect();
                let separator = format!(" {} ", SEPARATOR);
                let expression = format!("{} {}", op.name(), references.join(&separator));

                self.counter += 1;
                let variable = variable_name(self.counter);
                self.steps.push(Step {
                    expression,
                    variable: variable.clone(),
                });
                variable
            }
        }
    }
}

/// Unroll an expression in post-order.
///
/// # Examples
///
/// ```
/// use compo_prep::calc::{parser::parse, unroll::unroll};
///
/// let trace = unroll(&parse("reverse copy a b c").unwrap());
/// let steps: Vec<_> = trace
///     .steps
///     .iter()
///     .map(|step| (step.expression.as_str(), step.variable.as_str()))
///     .collect();
/// assert_eq!(steps, vec![("copy a b c", "_1"), ("reverse _1", "_2")]);
/// assert_eq!(trace.result, "_2");
/// ```
pub fn unroll(expr: &Expr) -> Trace {
    let mut unroller = Unroller {
        counter: 0,
        steps: Vec::new(),
    };
    let result = unroller.visit(expr);
    Trace {
        steps: unroller.steps,
        result,
    }
}
