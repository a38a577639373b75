// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The content letters of a dataset, and substitutions of leaf tokens.

use rand::seq::SliceRandom;
use rand::Rng;
use snafu::{OptionExt, ResultExt};

use super::{Compute, NoLetters, PrepareError};
use crate::calc::lexer::Token;
use crate::calc::{self, Evaluator, Expr, PrimOp};
use crate::dataset::{Dataset, Sample};

/// Shortest and longest random leaf of a constructed primitive.
const LEAF_LENGTH: (usize, usize) = (2, 5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// Sorted and free of duplicates, so that seeded choices are reproducible.
    letters: Vec<String>,
}

fn is_content(token: &str) -> bool {
    Token::classify(token) == Token::Symbol
}

impl Vocabulary {
    pub fn new(mut letters: Vec<String>) -> Self {
        letters.sort();
        letters.dedup();
        Self { letters }
    }

    /// All content tokens occurring in the sources of `dataset`.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self::new(
            dataset
                .statistics()
                .keys()
                .filter(|token| is_content(token))
                .cloned()
                .collect(),
        )
    }

    pub fn letters(&self) -> &[String] {
        &self.letters
    }

    pub fn contains(&self, letter: &str) -> bool {
        self.letters.binary_search_by(|l| l.as_str().cmp(letter)).is_ok()
    }

    /// Replace every occurrence of a `banned` letter with a random other letter.
    pub fn replace_letters<R: Rng + ?Sized>(
        &self,
        sequence: &str,
        banned: &[&str],
        rng: &mut R,
    ) -> Result<String, PrepareError> {
        let allowed: Vec<&String> = self
            .letters
            .iter()
            .filter(|letter| !banned.contains(&letter.as_str()))
            .collect();

        let mut out = Vec::new();
        for token in sequence.split_whitespace() {
            if banned.contains(&token) {
                out.push(allowed.choose(rng).context(NoLetters)?.as_str());
            } else {
                out.push(token);
            }
        }
        Ok(out.join(" "))
    }

    /// Replace every content letter that is not in `keep` with a random letter of `keep`.
    pub fn keep_letters<R: Rng + ?Sized>(
        &self,
        sequence: &str,
        keep: &[&str],
        rng: &mut R,
    ) -> Result<String, PrepareError> {
        let mut out = Vec::new();
        for token in sequence.split_whitespace() {
            if is_content(token) && !keep.contains(&token) {
                out.push(*keep.choose(rng).context(NoLetters)?);
            } else {
                out.push(token);
            }
        }
        Ok(out.join(" "))
    }

    /// A random leaf between `min_len` and `max_len` letters long, optionally with one
    /// position overwritten by `include`.
    pub fn random_leaf<R: Rng + ?Sized>(
        &self,
        min_len: usize,
        max_len: usize,
        include: Option<&str>,
        rng: &mut R,
    ) -> Result<Vec<String>, PrepareError> {
        let len = rng.gen_range(min_len..=max_len);
        let mut leaf = Vec::with_capacity(len);
        for _ in 0..len {
            leaf.push(self.letters.choose(rng).context(NoLetters)?.clone());
        }
        if let Some(letter) = include {
            if !leaf.is_empty() {
                let position = rng.gen_range(0..leaf.len());
                leaf[position] = letter.to_owned();
            }
        }
        Ok(leaf)
    }

    /// Construct `n` samples consisting of a single call to `op` on random leaves.
    pub fn construct_primitives<R: Rng + ?Sized>(
        &self,
        op: PrimOp,
        n: usize,
        include: Option<&str>,
        rng: &mut R,
    ) -> Result<Vec<Sample>, PrepareError> {
        let (min_len, max_len) = LEAF_LENGTH;
        let evaluator = Evaluator::plain();
        let mut samples = Vec::with_capacity(n);
        for _ in 0..n {
            let mut args = Vec::with_capacity(op.arity().count());
            for _ in 0..op.arity().count() {
                args.push(Expr::Leaf(self.random_leaf(min_len, max_len, include, rng)?));
            }
            let source = Expr::call(op, args).to_string();
            let target = calc::target(&source, &evaluator).context(Compute)?;
            samples.push(Sample::new(source, target));
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn vocab() -> Vocabulary {
        Vocabulary::from_dataset(&Dataset::from_samples(vec![
            Sample::new("append A B , C", "A B C"),
            Sample::new("reverse D A", "A D"),
        ]))
    }

    #[test]
    fn letters_exclude_functions_and_separator() {
        assert_eq!(vocab().letters(), &["A", "B", "C", "D"]);
        assert!(vocab().contains("C"));
        assert!(!vocab().contains(","));
    }

    #[test]
    fn replacing_banned_letters() {
        let mut rng = StdRng::seed_from_u64(1);
        let replaced = vocab()
            .replace_letters("append A B , A", &["A", "B"], &mut rng)
            .unwrap();
        let tokens: Vec<&str> = replaced.split_whitespace().collect();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], "append");
        assert_eq!(tokens[3], ",");
        for position in [1, 2, 4].iter() {
            assert!(["C", "D"].contains(&tokens[*position]));
        }

        let everything = ["A", "B", "C", "D"];
        assert!(matches!(
            vocab().replace_letters("copy A", &everything, &mut rng),
            Err(PrepareError::NoLetters)
        ));
    }

    #[test]
    fn keeping_letters() {
        let mut rng = StdRng::seed_from_u64(2);
        let kept = vocab()
            .keep_letters("prepend A B , C D", &["C"], &mut rng)
            .unwrap();
        assert_eq!(kept, "prepend C C , C C");
    }

    #[test]
    fn constructed_primitives_are_consistent() {
        let mut rng = StdRng::seed_from_u64(3);
        let samples = vocab()
            .construct_primitives(PrimOp::Append, 20, Some("Z"), &mut rng)
            .unwrap();
        assert_eq!(samples.len(), 20);
        for sample in &samples {
            let expr = calc::parser::parse(&sample.source).unwrap();
            assert!(expr.is_primitive());
            assert_eq!(expr.count_op(PrimOp::Append), 1);
            assert!(sample.source.split_whitespace().any(|t| t == "Z"));
            assert_eq!(
                calc::target(&sample.source, &Evaluator::plain()).unwrap(),
                sample.target
            );
            if let Expr::Call { args, .. } = expr {
                for arg in &args {
                    if let Expr::Leaf(symbols) = arg {
                        assert!((2..=5).contains(&symbols.len()));
                    }
                }
            }
        }
    }
}
