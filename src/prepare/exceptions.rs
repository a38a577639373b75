// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Lexical exceptions: samples whose pair of functions swaps rules.
//!
//! For every candidate pair, a share of the samples calling both functions exactly
//! once is recomputed with the replacement rules. The recomputed samples replace the
//! originals in the training data, and both versions are kept as held-out sets.

use std::mem;
use std::path::Path;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use snafu::ResultExt;

use super::vocab::Vocabulary;
use super::{Configuration, Data, PrepareError, Skipped};
use crate::calc::lexer::Token;
use crate::calc::{parser, Evaluator, Expr, PrimOp};
use crate::config::{Config, ExceptionSettings};
use crate::dataset::{Dataset, DatasetError, Sample};

/// The datasets produced for one pair of functions.
#[derive(Debug, Clone)]
pub struct ExceptionSets {
    pub pair: (PrimOp, PrimOp),
    /// The original dataset with the exceptions in their adapted form.
    pub train: Dataset,
    pub test_original: Dataset,
    pub test_adapted: Dataset,
    /// Samples calling both functions exactly once.
    pub qualifying: usize,
    pub quota: usize,
    pub vacuous: usize,
}

impl ExceptionSets {
    pub fn file_suffix(&self) -> String {
        format!("{}-{}", self.pair.0, self.pair.1)
    }

    /// Write `train_`, `test_org_` and `test_adap_` files into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), DatasetError> {
        let suffix = self.file_suffix();
        self.train.save(dir.join(format!("train_{}.tsv", suffix)))?;
        self.test_original
            .save(dir.join(format!("test_org_{}.tsv", suffix)))?;
        self.test_adapted
            .save(dir.join(format!("test_adap_{}.tsv", suffix)))?;
        Ok(())
    }
}

/// Number of exceptions to aim for, relative to the rarer of the two functions.
pub fn exception_quota(percentage: f64, dataset: &Dataset, first: PrimOp, second: PrimOp) -> usize {
    let rarer = dataset
        .frequency(first.name())
        .min(dataset.frequency(second.name()));
    (percentage * rarer as f64).round() as usize
}

/// Pick `quota` indices, half of them from `shallow` and the rest from `deep`.
///
/// When one bucket is too small, the other one makes up for it.
/// The result is sorted.
fn select_balanced<R: Rng + ?Sized>(
    shallow: &[usize],
    deep: &[usize],
    quota: usize,
    rng: &mut R,
) -> Vec<usize> {
    let quota = quota.min(shallow.len() + deep.len());
    let shallow_half = (quota / 2).min(shallow.len());
    let deep_quota = (quota - shallow_half).min(deep.len());
    let shallow_quota = quota - deep_quota;

    let mut chosen: Vec<usize> = shallow.choose_multiple(rng, shallow_quota).copied().collect();
    chosen.extend(deep.choose_multiple(rng, deep_quota).copied());
    chosen.sort_unstable();
    chosen
}

pub struct ExceptionBuilder<'a> {
    dataset: &'a Dataset,
    settings: &'a ExceptionSettings,
    /// Parsed samples not yet claimed by an earlier pair, by dataset index.
    pool: Vec<(usize, Expr)>,
    /// The dataset without every sample skipped so far.
    base: Dataset,
    skipped: Skipped,
}

impl<'a> ExceptionBuilder<'a> {
    pub fn new(dataset: &'a Dataset, settings: &'a ExceptionSettings) -> Self {
        let mut skipped = Skipped::new();
        let mut pool = Vec::with_capacity(dataset.len());
        let mut clean = Vec::with_capacity(dataset.len());
        for (index, sample) in dataset.iter().enumerate() {
            match parser::parse(&sample.source) {
                Ok(expr) => {
                    pool.push((index, expr));
                    clean.push(sample.clone());
                }
                Err(err) => skipped.record(sample, err),
            }
        }
        Self {
            dataset,
            settings,
            pool,
            base: Dataset::from_samples(clean),
            skipped,
        }
    }

    pub fn skipped(&self) -> &Skipped {
        &self.skipped
    }

    /// Samples that can still qualify for a later pair.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn build_pair<R: Rng + ?Sized>(
        &mut self,
        first: PrimOp,
        second: PrimOp,
        rng: &mut R,
    ) -> ExceptionSets {
        let dataset = self.dataset;
        let settings = self.settings;

        let (qualifying, rest): (Vec<_>, Vec<_>) = mem::take(&mut self.pool)
            .into_iter()
            .partition(|(_, expr)| expr.count_op(first) == 1 && expr.count_op(second) == 1);
        self.pool = rest;

        let quota = exception_quota(settings.percentage, dataset, first, second);
        let (shallow, deep): (Vec<usize>, Vec<usize>) =
            (0..qualifying.len()).partition(|&i| qualifying[i].1.count_calls() == 2);
        let chosen = select_balanced(&shallow, &deep, quota, rng);
        debug!(
            "{}-{}: {} qualifying ({} shallow, {} deep), quota {}",
            first,
            second,
            qualifying.len(),
            shallow.len(),
            deep.len(),
            quota
        );

        let evaluator = Evaluator::swapped(first, second, &settings.replacements);
        let mut originals = Vec::with_capacity(chosen.len());
        let mut adapted = Vec::with_capacity(chosen.len());
        let mut failed = Vec::new();
        let mut vacuous = 0;
        for i in chosen {
            let (index, expr) = &qualifying[i];
            let sample = &dataset[*index];
            match evaluator.eval(expr) {
                Ok(symbols) => {
                    let target = symbols.join(" ");
                    if target == sample.target {
                        debug!("dropping vacuous exception `{}`", sample.source);
                        vacuous += 1;
                    } else {
                        originals.push(sample.clone());
                        adapted.push(Sample::new(sample.source.clone(), target));
                    }
                }
                Err(err) => {
                    self.skipped.record(sample, err);
                    failed.push(sample.clone());
                }
            }
        }
        self.base.remove(&failed);

        let mut train = self.base.clone();
        train.remove(&originals);
        train.extend(adapted.iter().cloned());

        ExceptionSets {
            pair: (first, second),
            train,
            test_original: Dataset::from_samples(originals),
            test_adapted: Dataset::from_samples(adapted),
            qualifying: qualifying.len(),
            quota,
            vacuous,
        }
    }
}

/// Prepare the exception datasets of every configured pair.
pub fn run(config: &Config) -> Result<(), PrepareError> {
    let settings = config.exception_settings().context(Configuration)?;
    let dataset = Dataset::load(&config.general.train).context(Data)?;
    info!(
        "preparing exceptions for {} pair(s) from {} samples, percentage {}",
        settings.pairs.len(),
        dataset.len(),
        settings.percentage
    );
    if let Some(letters) = &settings.letters {
        let vocabulary = Vocabulary::new(letters.clone());
        let unknown = dataset
            .statistics()
            .keys()
            .filter(|token| Token::classify(token) == Token::Symbol && !vocabulary.contains(token))
            .count();
        if unknown > 0 {
            log::warn!("{} content token(s) are not among the configured letters", unknown);
        }
    }

    let mut rng = StdRng::seed_from_u64(config.general.seed);
    let dir = config.general.output_dir.join("exceptions");
    let mut builder = ExceptionBuilder::new(&dataset, &settings);
    for &(first, second) in &settings.pairs {
        let sets = builder.build_pair(first, second, &mut rng);
        info!(
            "{}: {} exception(s), {} vacuous, {} left in the pool",
            sets.file_suffix(),
            sets.test_original.len(),
            sets.vacuous,
            builder.pool_size()
        );
        sets.save(&dir).context(Data)?;
    }
    builder.skipped().summarize("exceptions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::ReplacementTable;
    use std::fs;

    fn dataset() -> Dataset {
        Dataset::from_samples(vec![
            Sample::new("append prepend a , b , c", "b a c"),
            Sample::new("prepend append a , a , a", "a a a"),
            Sample::new("reverse append b c , prepend d , e", "d e c b"),
            Sample::new("copy a b", "a b"),
            Sample::new("append a , b", "a b"),
            Sample::new("append a b ,", "broken"),
        ])
    }

    fn settings(percentage: f64) -> ExceptionSettings {
        let pairs = vec![
            (PrimOp::Append, PrimOp::Prepend),
            (PrimOp::Prepend, PrimOp::Append),
        ];
        ExceptionSettings {
            percentage,
            replacements: ReplacementTable::from_names(vec![
                ("append", "prepend"),
                ("prepend", "append"),
            ])
            .unwrap(),
            pairs,
            letters: None,
        }
    }

    fn sources(data: &Dataset) -> Vec<&str> {
        data.iter().map(|s| s.source.as_str()).collect()
    }

    #[test]
    fn builds_adapted_and_original_sets() {
        let data = dataset();
        let settings = settings(1.0);
        let mut rng = StdRng::seed_from_u64(0);
        let mut builder = ExceptionBuilder::new(&data, &settings);
        assert_eq!(builder.skipped().count(), 1);

        let sets = builder.build_pair(PrimOp::Append, PrimOp::Prepend, &mut rng);
        assert_eq!(sets.qualifying, 3);
        assert_eq!(sets.quota, 3);
        assert_eq!(sets.vacuous, 1);
        assert_eq!(
            sources(&sets.test_original),
            vec!["append prepend a , b , c", "reverse append b c , prepend d , e"]
        );
        let adapted: Vec<&str> = sets.test_adapted.iter().map(|s| s.target.as_str()).collect();
        assert_eq!(adapted, vec!["c a b", "c b e d"]);

        assert_eq!(sets.train.len(), data.len() - 1);
        assert!(sets.train.iter().any(|s| s.target == "c a b"));
        assert!(!sets.train.iter().any(|s| s.target == "b a c"));
        assert!(sets.train.iter().any(|s| s.source == "prepend append a , a , a"));
    }

    #[test]
    fn qualifying_samples_leave_the_pool() {
        let data = dataset();
        let settings = settings(1.0);
        let mut rng = StdRng::seed_from_u64(0);
        let mut builder = ExceptionBuilder::new(&data, &settings);
        assert_eq!(builder.pool_size(), 5);
        builder.build_pair(PrimOp::Append, PrimOp::Prepend, &mut rng);
        assert_eq!(builder.pool_size(), 2);

        let sets = builder.build_pair(PrimOp::Prepend, PrimOp::Append, &mut rng);
        assert_eq!(sets.qualifying, 0);
        assert!(sets.test_original.is_empty());
        assert!(sets.test_adapted.is_empty());
        assert_eq!(sets.train, Dataset::from_samples(data.samples()[..5].to_vec()));
    }

    #[test]
    fn skipped_samples_stay_out_of_train() {
        let data = Dataset::from_samples(vec![
            Sample::new("append reverse a , b", "a b"),
            Sample::new("append prepend a , b , c", "b a c"),
            Sample::new("append a b ,", "broken"),
        ]);
        // `reverse` has no replacement, so its swapped evaluation fails
        let settings = ExceptionSettings {
            percentage: 1.0,
            replacements: ReplacementTable::from_names(vec![("append", "prepend")]).unwrap(),
            pairs: vec![(PrimOp::Append, PrimOp::Reverse)],
            letters: None,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let mut builder = ExceptionBuilder::new(&data, &settings);
        assert_eq!(builder.skipped().count(), 1);

        let sets = builder.build_pair(PrimOp::Append, PrimOp::Reverse, &mut rng);
        assert_eq!(sets.qualifying, 1);
        assert_eq!(builder.skipped().count(), 2);
        assert!(sets.test_original.is_empty());
        assert!(sets.test_adapted.is_empty());
        assert_eq!(sources(&sets.train), vec!["append prepend a , b , c"]);
    }

    #[test]
    fn never_exceeds_the_quota() {
        let data = dataset();
        let settings = settings(0.5);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut builder = ExceptionBuilder::new(&data, &settings);
            let sets = builder.build_pair(PrimOp::Append, PrimOp::Prepend, &mut rng);
            assert_eq!(sets.quota, 2);
            assert!(sets.test_original.len() + sets.vacuous <= sets.quota);
            assert_eq!(sets.test_original.len(), sets.test_adapted.len());
            for (original, adapted) in sets.test_original.iter().zip(&sets.test_adapted) {
                assert_eq!(original.source, adapted.source);
                assert_ne!(original.target, adapted.target);
            }
        }
    }

    #[test]
    fn balanced_selection() {
        let mut rng = StdRng::seed_from_u64(4);
        let picked = select_balanced(&[0, 1, 2, 3], &[4, 5, 6, 7], 5, &mut rng);
        assert_eq!(picked.len(), 5);
        assert_eq!(picked.iter().filter(|&&i| i < 4).count(), 2);

        let picked = select_balanced(&[0, 1, 2, 3], &[4], 5, &mut rng);
        assert_eq!(picked, vec![0, 1, 2, 3, 4]);

        let picked = select_balanced(&[], &[4, 5, 6], 2, &mut rng);
        assert_eq!(picked.len(), 2);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));

        assert!(select_balanced(&[0], &[1], 0, &mut rng).is_empty());
    }

    #[test]
    fn quota_rounds_the_rarer_frequency() {
        let data = dataset();
        assert_eq!(data.frequency("append"), 5);
        assert_eq!(exception_quota(0.5, &data, PrimOp::Append, PrimOp::Prepend), 2);
        assert_eq!(exception_quota(0.5, &data, PrimOp::Append, PrimOp::Shift), 0);
    }

    #[test]
    fn writes_every_pair() {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("train.tsv");
        dataset().save(&train).unwrap();
        let config = Config::from_json(&format!(
            r#"{{
                "general": {{ "output_dir": {:?}, "train": {:?}, "seed": 5 }},
                "exceptions": {{
                    "percentage": 1.0,
                    "replacements": {{ "append": "prepend", "prepend": "append" }},
                    "candidates": ["append", "prepend"]
                }}
            }}"#,
            dir.path().join("out"),
            train
        ))
        .unwrap();
        run(&config).unwrap();

        let out = dir.path().join("out").join("exceptions");
        let adapted = fs::read_to_string(out.join("test_adap_append-prepend.tsv")).unwrap();
        assert_eq!(
            adapted,
            "append prepend a , b , c\tc a b\nreverse append b c , prepend d , e\tc b e d\n"
        );
        for name in &[
            "train_prepend-append.tsv",
            "test_org_prepend-append.tsv",
            "test_adap_prepend-append.tsv",
        ] {
            assert!(out.join(name).exists());
        }
        assert_eq!(
            fs::read_to_string(out.join("test_org_prepend-append.tsv")).unwrap(),
            ""
        );
        let train = fs::read_to_string(out.join("train_append-prepend.tsv")).unwrap();
        assert_eq!(train.lines().count(), 5);
        assert!(!train.contains("broken"));
    }
}
