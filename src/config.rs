// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The JSON configuration of the test preparation.
//!
//! Configurations are validated as a whole before any dataset is touched, so that
//! misspelled function names or replacements of the wrong arity abort the run early.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use snafu::{ensure, ResultExt, Snafu};

use crate::calc::registry::{PrimOp, RegistryError, ReplacementTable, SEPARATOR};

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("could not read config {}: {}", path.display(), source))]
    ReadConfig { path: PathBuf, source: io::Error },
    #[snafu(display("invalid config: {}", source))]
    Json { source: serde_json::Error },
    #[snafu(display("invalid config: {}", source))]
    Registry { source: RegistryError },
    #[snafu(display("{} percentage {} is not within [0, 1]", section, value))]
    Percentage { section: &'static str, value: f64 },
    #[snafu(display("candidate `{}` has no replacement", op))]
    MissingReplacement { op: PrimOp },
    #[snafu(display(
        "candidates1 and candidates2 differ in length ({} vs {})",
        first,
        second
    ))]
    PairedLength { first: usize, second: usize },
    #[snafu(display("letter `{}` collides with a function name or the separator", letter))]
    LetterCollision { letter: String },
    #[snafu(display("the config has no `{}` section", section))]
    MissingSection { section: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: General,
    #[serde(default)]
    pub exceptions: Option<ExceptionsConfig>,
    #[serde(default)]
    pub localism: Option<LocalismConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    /// Directory receiving one subdirectory per kind of test.
    pub output_dir: PathBuf,
    pub train: PathBuf,
    #[serde(default)]
    pub test: Option<PathBuf>,
    /// Seed for every random choice of a run.
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionsConfig {
    /// Fraction of the rarer function's frequency to turn into exceptions.
    pub percentage: f64,
    pub replacements: BTreeMap<String, String>,
    #[serde(default)]
    pub candidates: Vec<String>,
    /// Paired candidates, used instead of `candidates` when given.
    #[serde(default)]
    pub candidates1: Vec<String>,
    #[serde(default)]
    pub candidates2: Vec<String>,
    /// Content vocabulary, derived from the training data when absent.
    #[serde(default)]
    pub letters: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalismConfig {
    /// Fraction of each dataset to unroll.
    pub percentage: f64,
}

/// Exception settings after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionSettings {
    pub percentage: f64,
    pub replacements: ReplacementTable,
    /// Ordered pairs of distinct functions, in processing order.
    pub pairs: Vec<(PrimOp, PrimOp)>,
    pub letters: Option<Vec<String>>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).context(ReadConfig { path })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).context(Json)
    }

    /// The validated exception settings.
    pub fn exception_settings(&self) -> Result<ExceptionSettings, ConfigError> {
        self.exceptions
            .as_ref()
            .ok_or(ConfigError::MissingSection {
                section: "exceptions",
            })?
            .validate()
    }

    /// The validated localism percentage.
    pub fn localism_percentage(&self) -> Result<f64, ConfigError> {
        let localism = self.localism.as_ref().ok_or(ConfigError::MissingSection {
            section: "localism",
        })?;
        check_percentage("localism", localism.percentage)
    }
}

impl ExceptionsConfig {
    pub fn validate(&self) -> Result<ExceptionSettings, ConfigError> {
        let percentage = check_percentage("exceptions", self.percentage)?;
        let replacements = ReplacementTable::from_names(
            self.replacements
                .iter()
                .map(|(function, replacement)| (function.as_str(), replacement.as_str())),
        )
        .context(Registry)?;

        let pairs = self.pairs()?;
        for (first, second) in &pairs {
            for op in [*first, *second].iter() {
                ensure!(replacements.contains(*op), MissingReplacement { op: *op });
            }
        }

        if let Some(letters) = &self.letters {
            for letter in letters {
                ensure!(
                    letter != SEPARATOR && !PrimOp::is_function(letter),
                    LetterCollision { letter }
                );
            }
        }

        Ok(ExceptionSettings {
            percentage,
            replacements,
            pairs,
            letters: self.letters.clone(),
        })
    }

    /// Identical pairs are dropped here, before anything gets counted.
    fn pairs(&self) -> Result<Vec<(PrimOp, PrimOp)>, ConfigError> {
        let resolve = |names: &[String]| -> Result<Vec<PrimOp>, ConfigError> {
            names
                .iter()
                .map(|name| name.parse::<PrimOp>().context(Registry))
                .collect()
        };

        let candidate_pairs: Vec<(PrimOp, PrimOp)> =
            if self.candidates1.is_empty() && self.candidates2.is_empty() {
                let mut candidates = resolve(&self.candidates)?;
                let mut seen = Vec::new();
                candidates.retain(|op| {
                    let fresh = !seen.contains(op);
                    seen.push(*op);
                    fresh
                });
                candidates
                    .iter()
                    .flat_map(|first| candidates.iter().map(move |second| (*first, *second)))
                    .collect()
            } else {
                ensure!(
                    self.candidates1.len() == self.candidates2.len(),
                    PairedLength {
                        first: self.candidates1.len(),
                        second: self.candidates2.len(),
                    }
                );
                resolve(&self.candidates1)?
                    .into_iter()
                    .zip(resolve(&self.candidates2)?)
                    .collect()
            };

        Ok(candidate_pairs
            .into_iter()
            .filter(|(first, second)| {
                if first == second {
                    log::debug!("skipping identical pair {}-{}", first, second);
                }
                first != second
            })
            .collect())
    }
}

fn check_percentage(section: &'static str, value: f64) -> Result<f64, ConfigError> {
    ensure!((0.0..=1.0).contains(&value), Percentage { section, value });
    Ok(value)
}
