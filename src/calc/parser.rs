// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Structural parser for the flat prefix notation of the PCFG calculus.
//!
//! The flat notation leaves the call structure implicit: `append reverse a b , c`
//! means `append ( reverse ( a b ) , c )`. Arguments of a call extend until the
//! next separator that belongs to an enclosing binary call, or until the end of
//! the input.

use snafu::{ensure, Snafu};

use super::ast::{Expr, Symbol};
use super::lexer::{Lexer, Token};
use super::pretty;
use super::registry::{Arity, PrimOp};
use super::span::Span;

/// Nesting limit that keeps pathological input from exhausting the stack.
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ParseError {
    #[snafu(display("empty expression"))]
    Empty,
    #[snafu(display("separator at {} does not belong to any binary call", span))]
    StraySeparator { span: Span },
    #[snafu(display("`{}` at {} is missing its second argument", op, span))]
    MissingSecondArgument { op: PrimOp, span: Span },
    #[snafu(display("`{}` at {} has an empty argument", op, span))]
    EmptyArgument { op: PrimOp, span: Span },
    #[snafu(display("symbols and calls are mixed within one argument at {}", span))]
    MixedArgument { span: Span },
    #[snafu(display("unexpected bracket at {}", span))]
    UnexpectedBracket { span: Span },
    #[snafu(display("unknown function `{}`", name))]
    UnknownFunction { name: String },
    #[snafu(display("unbalanced brackets in `{}`", input))]
    Unbalanced { input: String },
    #[snafu(display("no top-level separator in `{}`", input))]
    NoTopLevelSeparator { input: String },
    #[snafu(display("expression is nested deeper than {} levels", limit))]
    TooDeep { limit: usize },
}

type ParseResult<T> = Result<T, ParseError>;

/// What a call is still waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    AwaitingOne,
    AwaitingFirstOfTwo,
    AwaitingSecondOfTwo,
}

/// The argument that is currently being read.
#[derive(Debug)]
enum Arg {
    Empty,
    Leaf(Vec<Symbol>),
    Call(Expr),
}

impl Arg {
    fn into_expr(self) -> Option<Expr> {
        match self {
            Arg::Empty => None,
            Arg::Leaf(symbols) => Some(Expr::Leaf(symbols)),
            Arg::Call(expr) => Some(expr),
        }
    }
}

/// An open call whose arguments are not complete yet.
#[derive(Debug)]
struct Context {
    op: PrimOp,
    /// Location of the function name
    span: Span,
    pending: Pending,
    done: Vec<Expr>,
    current: Arg,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse the whole input into a single expression.
    pub fn parse(&mut self) -> ParseResult<Expr> {
        let mut stack: Vec<Context> = Vec::new();
        let mut root = Arg::Empty;

        loop {
            // `None` is the end sentinel, closing whatever is still open.
            match self.lexer.next_token() {
                Some((span, Token::Function(op))) => {
                    ensure!(
                        stack.len() < self.max_depth,
                        TooDeep {
                            limit: self.max_depth
                        }
                    );
                    // A call must be the only thing in its argument.
                    let vacant = matches!(scope_mut(&mut stack, &mut root), Arg::Empty);
                    ensure!(vacant, MixedArgument { span });
                    let pending = match op.arity() {
                        Arity::Unary => Pending::AwaitingOne,
                        Arity::Binary => Pending::AwaitingFirstOfTwo,
                    };
                    stack.push(Context {
                        op,
                        span,
                        pending,
                        done: Vec::with_capacity(2),
                        current: Arg::Empty,
                    });
                }
                Some((span, Token::Symbol)) => {
                    let symbol = span.slice(self.lexer.input()).to_owned();
                    let scope = scope_mut(&mut stack, &mut root);
                    *scope = match std::mem::replace(scope, Arg::Empty) {
                        Arg::Empty => Arg::Leaf(vec![symbol]),
                        Arg::Leaf(mut symbols) => {
                            symbols.push(symbol);
                            Arg::Leaf(symbols)
                        }
                        Arg::Call(_) => return Err(ParseError::MixedArgument { span }),
                    };
                }
                Some((span, Token::Separator)) => close_scopes(&mut stack, &mut root, Some(span))?,
                Some((span, Token::ParenOpen)) | Some((span, Token::ParenClose)) => {
                    return Err(ParseError::UnexpectedBracket { span })
                }
                None => {
                    close_scopes(&mut stack, &mut root, None)?;
                    break;
                }
            }
        }

        root.into_expr().ok_or(ParseError::Empty)
    }
}

/// The argument scope that receives the next token.
fn scope_mut<'s>(stack: &'s mut Vec<Context>, root: &'s mut Arg) -> &'s mut Arg {
    match stack.last_mut() {
        Some(context) => &mut context.current,
        None => root,
    }
}

/// Close all argument scopes ended by a separator (`Some(span)`) or by the end of input (`None`).
///
/// A separator closes completed calls until it reaches the innermost binary call that is
/// still waiting for its separator, and then starts that call's second argument.
fn close_scopes(
    stack: &mut Vec<Context>,
    root: &mut Arg,
    separator: Option<Span>,
) -> ParseResult<()> {
    while let Some(mut context) = stack.pop() {
        match (context.pending, separator) {
            (Pending::AwaitingFirstOfTwo, Some(_)) => {
                let current = std::mem::replace(&mut context.current, Arg::Empty);
                let first = current.into_expr().ok_or(ParseError::EmptyArgument {
                    op: context.op,
                    span: context.span,
                })?;
                context.done.push(first);
                context.pending = Pending::AwaitingSecondOfTwo;
                stack.push(context);
                return Ok(());
            }
            (Pending::AwaitingFirstOfTwo, None) => {
                return Err(ParseError::MissingSecondArgument {
                    op: context.op,
                    span: context.span,
                });
            }
            (Pending::AwaitingOne, _) | (Pending::AwaitingSecondOfTwo, _) => {
                let Context {
                    op,
                    span,
                    mut done,
                    current,
                    ..
                } = context;
                done.push(
                    current
                        .into_expr()
                        .ok_or(ParseError::EmptyArgument { op, span })?,
                );
                // The enclosing scope was empty when the call was opened, and
                // nothing could have been added to it since.
                *scope_mut(stack, root) = Arg::Call(Expr::Call { op, args: done });
            }
        }
    }

    match separator {
        Some(span) => Err(ParseError::StraySeparator { span }),
        None => Ok(()),
    }
}

/// Parse the flat prefix notation into an expression tree.
///
/// # Examples
///
/// ```
/// use compo_prep::calc::{ast::Expr, parser::parse, registry::PrimOp};
///
/// assert_eq!(
///     parse("reverse copy a b").unwrap(),
///     Expr::call(PrimOp::Reverse, vec![Expr::call(PrimOp::Copy, vec![Expr::leaf("a b")])])
/// );
/// ```
pub fn parse(flat: &str) -> ParseResult<Expr> {
    Parser::new(flat).parse()
}

/// Turn the flat prefix notation into the fully parenthesized one.
pub fn place_brackets(flat: &str) -> ParseResult<String> {
    parse(flat).map(|expr| pretty::bracketed(&expr))
}

/// Split the inside of a parenthesized binary call at its top-level separator.
///
/// # Examples
///
/// ```
/// use compo_prep::calc::parser::split_top_level_args;
///
/// assert_eq!(
///     split_top_level_args("append ( a , b ) , c").unwrap(),
///     ("append ( a , b )", "c")
/// );
/// ```
pub fn split_top_level_args(input: &str) -> ParseResult<(&str, &str)> {
    let mut depth: usize = 0;
    for (pos, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| ParseError::Unbalanced {
                    input: input.to_owned(),
                })?
            }
            ',' if depth == 0 => {
                return Ok((input[..pos].trim(), input[pos + 1..].trim()));
            }
            _ => {}
        }
    }
    Err(ParseError::NoTopLevelSeparator {
        input: input.to_owned(),
    })
}

/// Read an expression back from its parenthesized notation.
pub fn read_bracketed(input: &str) -> ParseResult<Expr> {
    read_bracketed_at(input, 0)
}

fn read_bracketed_at(input: &str, depth: usize) -> ParseResult<Expr> {
    ensure!(
        depth < DEFAULT_MAX_DEPTH,
        TooDeep {
            limit: DEFAULT_MAX_DEPTH
        }
    );
    let input = input.trim();
    let open = match input.find('(') {
        Some(open) => open,
        None => {
            ensure!(!input.contains(')'), Unbalanced { input });
            let leaf = Expr::leaf(input);
            return match leaf {
                Expr::Leaf(ref symbols) if symbols.is_empty() => Err(ParseError::Empty),
                _ => Ok(leaf),
            };
        }
    };

    let name = input[..open].trim();
    let op = PrimOp::lookup(name).ok_or_else(|| ParseError::UnknownFunction {
        name: name.to_owned(),
    })?;
    ensure!(input.ends_with(')'), Unbalanced { input });
    let inner = &input[open + 1..input.len() - 1];

    let args = match op.arity() {
        Arity::Unary => vec![read_bracketed_at(inner, depth + 1)?],
        Arity::Binary => {
            let (first, second) = split_top_level_args(inner)?;
            vec![
                read_bracketed_at(first, depth + 1)?,
                read_bracketed_at(second, depth + 1)?,
            ]
        }
    };
    Ok(Expr::Call { op, args })
}
