// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Localism: datasets where nested samples are also given step by step.

use log::info;
use snafu::{OptionExt, ResultExt};

use super::{Configuration, Data, NoTestSet, PrepareError, Skipped};
use crate::calc::{parser, unroll::unroll};
use crate::config::Config;
use crate::dataset::{Dataset, Sample};

/// Marks samples that are a single step of an unrolled expression.
pub const UNROLLED_TAG: &str = "unrolled";
/// Marks the complete expression a group of steps came from.
pub const ORIGINAL_TAG: &str = "original";

/// Unroll the first `percentage` of `dataset`.
///
/// Every step but the last maps to its variable, the last step maps to the
/// original target, followed by the original sample itself. Samples with a
/// single call have nothing to unroll and are left out.
pub fn unroll_dataset(dataset: &Dataset, percentage: f64, skipped: &mut Skipped) -> Dataset {
    let take = (percentage * dataset.len() as f64).round() as usize;
    let mut unrolled = Dataset::new();
    for sample in dataset.iter().take(take) {
        let expr = match parser::parse(&sample.source) {
            Ok(expr) => expr,
            Err(err) => {
                skipped.record(sample, err);
                continue;
            }
        };
        if expr.count_calls() <= 1 {
            continue;
        }

        let trace = unroll(&expr);
        let last = trace.steps.len() - 1;
        for (position, step) in trace.steps.iter().enumerate() {
            let target = if position == last {
                sample.target.as_str()
            } else {
                step.variable.as_str()
            };
            unrolled.add(Sample::new(
                format!("{}\t{}", UNROLLED_TAG, step.expression),
                target,
            ));
        }
        unrolled.add(Sample::new(
            format!("{}\t{}", ORIGINAL_TAG, sample.source),
            sample.target.as_str(),
        ));
    }
    unrolled
}

/// Prepare the unrolled train and test datasets.
pub fn run(config: &Config) -> Result<(), PrepareError> {
    let percentage = config.localism_percentage().context(Configuration)?;
    let test = config.general.test.as_ref().context(NoTestSet)?;
    let dir = config.general.output_dir.join("localism");

    let mut skipped = Skipped::new();
    for (name, path) in [("train", &config.general.train), ("test", test)].iter() {
        let dataset = Dataset::load(path).context(Data)?;
        let unrolled = unroll_dataset(&dataset, percentage, &mut skipped);
        info!(
            "unrolled {} of {} {} samples into {} lines",
            (percentage * dataset.len() as f64).round(),
            dataset.len(),
            name,
            unrolled.len()
        );
        unrolled
            .save(dir.join(format!("unrolled_{}.tsv", name)))
            .context(Data)?;
    }
    skipped.summarize("localism");
    Ok(())
}
