// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Preparation of the individual compositionality tests.

pub mod exceptions;
pub mod localism;
pub mod tsv;
pub mod vocab;

use std::fmt;
use std::io;
use std::path::PathBuf;

use snafu::Snafu;

use crate::calc::CalcError;
use crate::config::ConfigError;
use crate::dataset::{DatasetError, Sample};

#[derive(Debug, Snafu)]
pub enum PrepareError {
    #[snafu(display("{}", source))]
    Data { source: DatasetError },
    #[snafu(display("{}", source))]
    Configuration { source: ConfigError },
    #[snafu(display("{}", source))]
    Compute { source: CalcError },
    #[snafu(display("could not read {}: {}", path.display(), source))]
    ReadFile { path: PathBuf, source: io::Error },
    #[snafu(display("could not write {}: {}", path.display(), source))]
    WriteFile { path: PathBuf, source: io::Error },
    #[snafu(display("{}:{}: expected `source<TAB>target`", path.display(), line))]
    MalformedLine { path: PathBuf, line: usize },
    #[snafu(display(
        "{} has {} lines but {} has {}",
        sources.display(),
        source_lines,
        targets.display(),
        target_lines
    ))]
    LineCount {
        sources: PathBuf,
        source_lines: usize,
        targets: PathBuf,
        target_lines: usize,
    },
    #[snafu(display("no test dataset configured"))]
    NoTestSet,
    #[snafu(display("the vocabulary has no letters to choose from"))]
    NoLetters,
}

/// Counts the samples that had to be left out of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Skipped {
    count: usize,
}

impl Skipped {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<E: fmt::Display>(&mut self, sample: &Sample, error: E) {
        log::warn!("skipping `{}`: {}", sample.source, error);
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Log how many samples were left out of preparing `what`.
    pub fn summarize(&self, what: &str) {
        if self.count > 0 {
            log::warn!("skipped {} malformed sample(s) while preparing {}", self.count, what);
        } else {
            log::info!("no samples skipped while preparing {}", what);
        }
    }
}
