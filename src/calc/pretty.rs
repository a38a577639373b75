// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

use super::ast::Expr;
use super::registry::SEPARATOR;

struct PrettyPrinter {
    output: String,
    /// Whether arguments are wrapped in `(` and `)`.
    brackets: bool,
}

impl PrettyPrinter {
    fn new(brackets: bool) -> Self {
        Self {
            output: String::new(),
            brackets,
        }
    }

    fn print(&mut self, expr: &Expr) {
        match expr {
            Expr::Leaf(symbols) => {
                for symbol in symbols {
                    self.word(symbol);
                }
            }
            Expr::Call { op, args } => {
                self.word(op.name());
                if self.brackets {
                    self.word("(");
                }
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        self.word(SEPARATOR);
                    }
                    self.print(arg);
                }
                if self.brackets {
                    self.word(")");
                }
            }
        }
    }

    fn word(&mut self, word: &str) {
        if !self.output.is_empty() {
            self.output.push(' ');
        }
        self.output.push_str(word);
    }
}

/// The flat prefix notation used in the datasets.
pub fn flat(expr: &Expr) -> String {
    let mut printer = PrettyPrinter::new(false);
    printer.print(expr);
    printer.output
}

/// The fully parenthesized notation, e.g. `append ( reverse ( a b ) , c )`.
pub fn bracketed(expr: &Expr) -> String {
    let mut printer = PrettyPrinter::new(true);
    printer.print(expr);
    printer.output
}
