// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Datasets of source/target pairs stored as tab separated lines.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::ops::Index;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum DatasetError {
    #[snafu(display("could not read {}: {}", path.display(), source))]
    ReadFile { path: PathBuf, source: io::Error },
    #[snafu(display("could not write {}: {}", path.display(), source))]
    WriteFile { path: PathBuf, source: io::Error },
    #[snafu(display("{}:{}: expected `source<TAB>target`", path.display(), line))]
    MalformedLine { path: PathBuf, line: usize },
}

/// A single source sequence with its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sample {
    pub source: String,
    pub target: String,
}

impl Sample {
    pub fn new<S: Into<String>, T: Into<String>>(source: S, target: T) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// The distinct whitespace separated tokens of the source.
    fn distinct_tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.source.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.dedup();
        tokens
    }
}

/// Renders the sample as a line of a dataset file, without the line break.
impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.source, self.target)
    }
}

/// Samples together with the number of samples each source token occurs in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    samples: Vec<Sample>,
    statistics: HashMap<String, usize>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        let statistics = frequency_table(&samples);
        Self {
            samples,
            statistics,
        }
    }

    /// Load a dataset with one `source<TAB>target` pair per line.
    ///
    /// Blank lines are skipped. A source may itself contain tabs, the target
    /// starts after the last one.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).context(ReadFile { path })?;

        let mut samples = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match line.rsplit_once('\t') {
                Some((source, target)) => samples.push(Sample::new(source.trim(), target.trim())),
                None => {
                    return Err(DatasetError::MalformedLine {
                        path: path.to_owned(),
                        line: index + 1,
                    })
                }
            }
        }
        log::debug!("loaded {} samples from {}", samples.len(), path.display());
        Ok(Self::from_samples(samples))
    }

    /// Save the dataset, creating the parent directory if necessary.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context(WriteFile { path: parent })?;
            }
        }

        let file = File::create(path).context(WriteFile { path })?;
        let mut out = BufWriter::new(file);
        for sample in &self.samples {
            writeln!(out, "{}", sample).context(WriteFile { path })?;
        }
        out.flush().context(WriteFile { path })?;
        log::debug!("saved {} samples to {}", self.samples.len(), path.display());
        Ok(())
    }

    pub fn add(&mut self, sample: Sample) {
        count_tokens(&mut self.statistics, &sample);
        self.samples.push(sample);
    }

    pub fn extend<I: IntoIterator<Item = Sample>>(&mut self, samples: I) {
        for sample in samples {
            self.add(sample);
        }
    }

    /// Remove one sample with the same source for each of `samples`.
    ///
    /// Returns how many samples were actually removed.
    pub fn remove(&mut self, samples: &[Sample]) -> usize {
        let mut wanted: HashMap<&str, usize> = HashMap::new();
        for sample in samples {
            *wanted.entry(sample.source.as_str()).or_insert(0) += 1;
        }

        let mut kept = Vec::with_capacity(self.samples.len());
        let mut removed = Vec::new();
        for sample in self.samples.drain(..) {
            match wanted.get_mut(sample.source.as_str()) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    removed.push(sample);
                }
                _ => kept.push(sample),
            }
        }
        self.samples = kept;

        for sample in &removed {
            uncount_tokens(&mut self.statistics, sample);
        }
        removed.len()
    }

    /// Keep a random subset of at most `n` samples, in random order.
    pub fn keep_random<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) {
        let chosen: Vec<Sample> = self.samples.choose_multiple(rng, n).cloned().collect();
        *self = Self::from_samples(chosen);
    }

    /// Number of samples whose source contains `token`.
    pub fn frequency(&self, token: &str) -> usize {
        self.statistics.get(token).copied().unwrap_or(0)
    }

    pub fn statistics(&self) -> &HashMap<String, usize> {
        &self.statistics
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Index<usize> for Dataset {
    type Output = Sample;

    fn index(&self, index: usize) -> &Sample {
        &self.samples[index]
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl std::iter::FromIterator<Sample> for Dataset {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self::from_samples(iter.into_iter().collect())
    }
}

/// Count, for each token, the number of samples whose source contains it.
pub fn frequency_table(samples: &[Sample]) -> HashMap<String, usize> {
    let mut table = HashMap::new();
    for sample in samples {
        count_tokens(&mut table, sample);
    }
    table
}

fn count_tokens(table: &mut HashMap<String, usize>, sample: &Sample) {
    for token in sample.distinct_tokens() {
        *table.entry(token.to_owned()).or_insert(0) += 1;
    }
}

fn uncount_tokens(table: &mut HashMap<String, usize>, sample: &Sample) {
    for token in sample.distinct_tokens() {
        if let Some(count) = table.get_mut(token) {
            *count -= 1;
            if *count == 0 {
                table.remove(token);
            }
        }
    }
}
