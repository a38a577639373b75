// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The list-manipulation calculus of the PCFG dataset.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod span;

pub mod eval;
pub mod pretty;
pub mod registry;
pub mod unroll;

pub use ast::{Expr, Symbol};
pub use eval::{EvalError, Evaluator};
pub use parser::ParseError;
pub use registry::{Arity, PrimOp, ReplacementTable};

use snafu::{ResultExt, Snafu};

/// Anything that can go wrong when computing the target of a source sequence.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum CalcError {
    #[snafu(display("could not parse `{}`: {}", input, source))]
    Parse { input: String, source: ParseError },
    #[snafu(display("could not evaluate `{}`: {}", input, source))]
    Eval { input: String, source: EvalError },
}

/// Parse a flat source sequence and evaluate it to its target sequence.
pub fn target(source: &str, evaluator: &Evaluator<'_>) -> Result<String, CalcError> {
    let expr = parser::parse(source).context(Parse { input: source })?;
    let symbols = evaluator.eval(&expr).context(Eval { input: source })?;
    Ok(symbols.join(" "))
}
