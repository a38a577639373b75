// compo-prep -- preparing compositionality tests for sequence models
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! `compo-prep` prepares the compositionality test datasets and gives direct
//! access to the calculus for inspecting single samples.

use std::error::Error;
use std::path::PathBuf;
use std::process;

use rand::{rngs::StdRng, SeedableRng};
use simple_logger;
use structopt::StructOpt;

use compo_prep::calc::{self, parser, unroll::unroll, Evaluator, PrimOp, ReplacementTable};
use compo_prep::config::Config;
use compo_prep::dataset::Dataset;
use compo_prep::prepare::{exceptions, localism, tsv, vocab::Vocabulary};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "compo-prep",
    about = "Preparing compositionality tests for sequence models"
)]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Build train and test sets with lexical exceptions for every candidate pair.
    Exceptions {
        #[structopt(short, long, parse(from_os_str))]
        config: PathBuf,
    },
    /// Build train and test sets where nested samples are also given step by step.
    Localism {
        #[structopt(short, long, parse(from_os_str))]
        config: PathBuf,
    },
    /// Compute the target of a source sequence.
    Eval {
        expression: String,
        /// Evaluate calls to these two functions with their replacements.
        #[structopt(long, number_of_values = 2)]
        swap: Vec<PrimOp>,
        /// A replacement of the form `function=replacement`.
        #[structopt(long, parse(try_from_str = parse_replacement))]
        replace: Vec<(PrimOp, PrimOp)>,
    },
    /// Show the single calls a source sequence unrolls to.
    Unroll { expression: String },
    /// Generate samples with a single call, using the letters of a dataset.
    Primitives {
        #[structopt(long, parse(from_os_str))]
        data: PathBuf,
        #[structopt(short, long)]
        function: PrimOp,
        #[structopt(short, default_value = "10")]
        n: usize,
        /// A letter that every leaf must contain.
        #[structopt(long)]
        include: Option<String>,
        #[structopt(long, default_value = "0")]
        seed: u64,
        /// Where to write the samples. They are printed if not given.
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
    /// Combine a file of sources and a file of targets into a dataset.
    Join {
        #[structopt(parse(from_os_str))]
        sources: PathBuf,
        #[structopt(parse(from_os_str))]
        targets: PathBuf,
        #[structopt(parse(from_os_str))]
        output: PathBuf,
    },
    /// Split a dataset into a file of sources and a file of targets.
    Separate {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        #[structopt(parse(from_os_str))]
        sources: PathBuf,
        #[structopt(parse(from_os_str))]
        targets: PathBuf,
    },
    /// Split every dataset in a directory.
    SeparateFolder {
        #[structopt(parse(from_os_str))]
        input_dir: PathBuf,
        #[structopt(parse(from_os_str))]
        output_dir: PathBuf,
    },
}

fn parse_replacement(arg: &str) -> Result<(PrimOp, PrimOp), String> {
    let (function, replacement) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected `function=replacement`, got `{}`", arg))?;
    let function = function.trim().parse::<PrimOp>().map_err(|err| format!("{}", err))?;
    let replacement = replacement.trim().parse::<PrimOp>().map_err(|err| format!("{}", err))?;
    Ok((function, replacement))
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Exceptions { config } => exceptions::run(&Config::load(config)?)?,
        Command::Localism { config } => localism::run(&Config::load(config)?)?,
        Command::Eval {
            expression,
            swap,
            replace,
        } => {
            let mut table = ReplacementTable::new();
            for (function, replacement) in replace {
                table.insert(function, replacement)?;
            }
            let pair = match swap.as_slice() {
                [first, second] => Some((*first, *second)),
                _ => None,
            };
            let evaluator = Evaluator::new(pair, &table);
            println!("{}", calc::target(&expression, &evaluator)?);
        }
        Command::Unroll { expression } => {
            let trace = unroll(&parser::parse(&expression)?);
            for step in &trace.steps {
                println!("{} = {}", step.variable, step.expression);
            }
            println!("{}", trace.result);
        }
        Command::Primitives {
            data,
            function,
            n,
            include,
            seed,
            output,
        } => {
            let vocabulary = Vocabulary::from_dataset(&Dataset::load(data)?);
            let mut rng = StdRng::seed_from_u64(seed);
            let samples =
                vocabulary.construct_primitives(function, n, include.as_deref(), &mut rng)?;
            match output {
                Some(path) => Dataset::from_samples(samples).save(path)?,
                None => {
                    for sample in &samples {
                        println!("{}", sample);
                    }
                }
            }
        }
        Command::Join {
            sources,
            targets,
            output,
        } => {
            let count = tsv::join(&sources, &targets, &output)?;
            log::info!("wrote {} samples to {}", count, output.display());
        }
        Command::Separate {
            input,
            sources,
            targets,
        } => {
            tsv::separate(&input, &sources, &targets)?;
        }
        Command::SeparateFolder {
            input_dir,
            output_dir,
        } => {
            let done = tsv::separate_folder(&input_dir, &output_dir)?;
            log::info!("separated {} files", done.len());
        }
    }
    Ok(())
}

fn main() {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    if let Err(err) = simple_logger::init_with_level(level) {
        eprintln!("could not initialize logging: {}", err);
        process::exit(1);
    }

    if let Err(err) = run(opt.command) {
        log::error!("{}", err);
        process::exit(1);
    }
}
