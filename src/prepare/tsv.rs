// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Conversion between dataset files and separate source and target files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use snafu::{ensure, ResultExt};

use super::{LineCount, PrepareError, ReadFile, WriteFile};

fn read_lines(path: &Path) -> Result<Vec<String>, PrepareError> {
    let text = fs::read_to_string(path).context(ReadFile { path })?;
    Ok(text.lines().map(|line| line.trim_end().to_owned()).collect())
}

fn write_lines<'a, I>(path: &Path, lines: I) -> Result<(), PrepareError>
where
    I: IntoIterator<Item = &'a str>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WriteFile { path: parent })?;
        }
    }
    let mut out = BufWriter::new(File::create(path).context(WriteFile { path })?);
    for line in lines {
        writeln!(out, "{}", line).context(WriteFile { path })?;
    }
    out.flush().context(WriteFile { path })
}

/// Combine a file of sources and a file of targets line by line.
pub fn join(sources: &Path, targets: &Path, output: &Path) -> Result<usize, PrepareError> {
    let source_lines = read_lines(sources)?;
    let target_lines = read_lines(targets)?;
    ensure!(
        source_lines.len() == target_lines.len(),
        LineCount {
            sources,
            source_lines: source_lines.len(),
            targets,
            target_lines: target_lines.len(),
        }
    );

    let joined: Vec<String> = source_lines
        .iter()
        .zip(&target_lines)
        .map(|(source, target)| format!("{}\t{}", source, target))
        .collect();
    write_lines(output, joined.iter().map(String::as_str))?;
    log::debug!("joined {} lines into {}", joined.len(), output.display());
    Ok(joined.len())
}

/// Split a dataset file into a file of sources and a file of targets.
pub fn separate(input: &Path, sources: &Path, targets: &Path) -> Result<usize, PrepareError> {
    let lines = read_lines(input)?;
    let mut pairs = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        match line.rsplit_once('\t') {
            Some(pair) => pairs.push(pair),
            None => {
                return Err(PrepareError::MalformedLine {
                    path: input.to_owned(),
                    line: index + 1,
                })
            }
        }
    }
    write_lines(sources, pairs.iter().map(|(source, _)| *source))?;
    write_lines(targets, pairs.iter().map(|(_, target)| *target))?;
    Ok(pairs.len())
}

fn is_split_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map_or(false, |stem| stem.ends_with("_src") || stem.ends_with("_tgt"))
}

fn split_name(path: &Path, part: &str) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, part, ext),
        None => format!("{}_{}", stem, part),
    })
}

/// Separate every dataset file of `input_dir` into `output_dir`.
///
/// Subdirectories and files that are already the result of a split are
/// ignored. Returns the inputs that were split, in name order.
pub fn separate_folder(input_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, PrepareError> {
    let mut inputs = Vec::new();
    for entry in fs::read_dir(input_dir).context(ReadFile { path: input_dir })? {
        let path = entry.context(ReadFile { path: input_dir })?.path();
        if path.is_file() && !is_split_file(&path) {
            inputs.push(path);
        }
    }
    inputs.sort();

    for input in &inputs {
        let names = split_name(input, "src").zip(split_name(input, "tgt"));
        match names {
            Some((sources, targets)) => {
                let count = separate(input, &output_dir.join(sources), &output_dir.join(targets))?;
                log::info!("separated {} lines of {}", count, input.display());
            }
            None => log::warn!("skipping {}, its name is not valid UTF-8", input.display()),
        }
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_separate() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let tgt = dir.path().join("tgt.txt");
        fs::write(&src, "copy a b\nreverse c d\n").unwrap();
        fs::write(&tgt, "a b\nd c\n").unwrap();

        let joined = dir.path().join("joined.tsv");
        assert_eq!(join(&src, &tgt, &joined).unwrap(), 2);
        assert_eq!(
            fs::read_to_string(&joined).unwrap(),
            "copy a b\ta b\nreverse c d\td c\n"
        );

        let src2 = dir.path().join("out").join("src.txt");
        let tgt2 = dir.path().join("out").join("tgt.txt");
        assert_eq!(separate(&joined, &src2, &tgt2).unwrap(), 2);
        assert_eq!(fs::read_to_string(&src2).unwrap(), "copy a b\nreverse c d\n");
        assert_eq!(fs::read_to_string(&tgt2).unwrap(), "a b\nd c\n");
    }

    #[test]
    fn mismatched_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let tgt = dir.path().join("tgt.txt");
        fs::write(&src, "copy a\ncopy b\n").unwrap();
        fs::write(&tgt, "a\n").unwrap();
        assert!(matches!(
            join(&src, &tgt, &dir.path().join("out.tsv")),
            Err(PrepareError::LineCount {
                source_lines: 2,
                target_lines: 1,
                ..
            })
        ));

        fs::write(&src, "copy a\ta\nno tab\n").unwrap();
        assert!(matches!(
            separate(&src, &dir.path().join("s"), &dir.path().join("t")),
            Err(PrepareError::MalformedLine { line: 2, .. })
        ));
    }

    #[test]
    fn separates_a_folder() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(input.join("nested")).unwrap();
        fs::write(input.join("train.tsv"), "copy a\ta\n").unwrap();
        fs::write(input.join("test.tsv"), "copy b\tb\n").unwrap();
        fs::write(input.join("old_src.tsv"), "copy c\n").unwrap();

        let output = dir.path().join("out");
        let done = separate_folder(&input, &output).unwrap();
        assert_eq!(done, vec![input.join("test.tsv"), input.join("train.tsv")]);
        assert_eq!(
            fs::read_to_string(output.join("train_src.tsv")).unwrap(),
            "copy a\n"
        );
        assert_eq!(fs::read_to_string(output.join("test_tgt.tsv")).unwrap(), "b\n");
        assert!(!output.join("old_src_src.tsv").exists());
    }
}
