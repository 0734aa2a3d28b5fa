/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use lockbench::config::ExperimentConfigManager;
use lockbench::sweep::{run_experiment, CsvResultSink};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Compare fine-grained, group and global locking over a sweep of maximum
/// critical-section lengths.
///
/// Example:
///   lockbench -c lockbench/configs/experiments.yaml -o results -e experiment_1
#[derive(Debug, Parser)]
#[command(
    name = "lockbench",
    about = "Nested-locking taskset synthesis and schedulability sweeps",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML experiment configuration file.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Directory the per-experiment CSV files are written to.
    #[arg(short = 'o', long = "output", default_value = "results")]
    output: PathBuf,

    /// Only run the named experiment(s); repeatable.
    #[arg(short = 'e', long = "experiment")]
    experiments: Vec<String>,

    /// Override the number of samples per mcsl point.
    #[arg(short = 'n', long = "samples")]
    samples: Option<usize>,

    /// Override the base seed.
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        config      = %cli.config.display(),
        output      = %cli.output.display(),
        experiments = ?cli.experiments,
        samples     = ?cli.samples,
        seed        = ?cli.seed,
        "Configuration"
    );

    if let Err(e) = run(&cli) {
        error!("lockbench failed: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // ── Load experiment configuration ─────────────────────────────────────────
    let mut manager = ExperimentConfigManager::new();
    manager.load_from_file(&cli.config)?;

    let mut sweep = manager
        .sweep()
        .cloned()
        .context("configuration has no sweep block")?;
    let taskset = manager
        .taskset()
        .context("configuration has no taskset block")?;

    if let Some(samples) = cli.samples {
        if samples == 0 {
            bail!("--samples must be at least 1");
        }
        sweep.samples = samples;
    }
    if let Some(seed) = cli.seed {
        sweep.seed = seed;
    }

    for name in &cli.experiments {
        if manager.get_experiment(name).is_none() {
            bail!("Unknown experiment: {name}");
        }
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    let mut sink = CsvResultSink::new(&cli.output);
    let mut ran = 0usize;

    for (index, experiment) in manager.get_all_experiments().iter().enumerate() {
        if !cli.experiments.is_empty() && !cli.experiments.contains(&experiment.name) {
            continue;
        }
        run_experiment(&sweep, taskset, experiment, index, &mut sink)?;
        ran += 1;
    }

    if ran == 0 {
        warn!("No experiment was run");
    } else {
        info!(experiments = ran, output = %cli.output.display(), "sweep complete");
    }
    Ok(())
}
