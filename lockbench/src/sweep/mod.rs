/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Parameter sweep driver and result sinks.
//!
//! For every experiment and every mcsl point the driver synthesizes
//! `samples` tasksets, evaluates the three protocol views and hands the
//! per-protocol success ratios to a [`ResultSink`].
//!
//! Each sample owns its own [`StdRng`], seeded from the base seed and the
//! sample's coordinates, so a point can be re-run in isolation and samples
//! never share random state.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{ExperimentConfig, SweepConfig, TasksetConfig};
use crate::critical_section::DurationRange;
use crate::locking::{apply_fine_grained_bounds, apply_group_lock_bounds};
use crate::schedulability::{cluster_count, evaluate};
use crate::synthesis::{synthesize, ConfigurationError, ProtocolTasksets};

// ── Protocols ─────────────────────────────────────────────────────────────────

/// Locking protocols compared by the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    FineGrained,
    GroupLock,
    GlobalLock,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [
        Protocol::FineGrained,
        Protocol::GroupLock,
        Protocol::GlobalLock,
    ];

    /// Base name of the protocol's result file.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Protocol::FineGrained => "fine_grained",
            Protocol::GroupLock => "group_lock",
            Protocol::GlobalLock => "global_lock",
        }
    }
}

/// Success ratio of each protocol at one mcsl point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointResult {
    pub mcsl: u64,
    pub fine_grained: f64,
    pub group_lock: f64,
    pub global_lock: f64,
}

impl PointResult {
    pub fn ratio(&self, protocol: Protocol) -> f64 {
        match protocol {
            Protocol::FineGrained => self.fine_grained,
            Protocol::GroupLock => self.group_lock,
            Protocol::GlobalLock => self.global_lock,
        }
    }
}

// ── Result sinks ──────────────────────────────────────────────────────────────

/// Destination of sweep results.
pub trait ResultSink {
    /// Accept the result of one mcsl point of `experiment`.
    fn record(&mut self, experiment: &str, point: &PointResult) -> Result<()>;

    /// Persist everything recorded so far.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every result in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryResultSink {
    pub records: Vec<(String, PointResult)>,
}

impl ResultSink for MemoryResultSink {
    fn record(&mut self, experiment: &str, point: &PointResult) -> Result<()> {
        self.records.push((experiment.to_string(), *point));
        Ok(())
    }
}

/// One line of a protocol's result file.
#[derive(Debug, Serialize)]
struct Row {
    mcsl: u64,
    samples: f64,
}

/// Writes `<root>/<experiment>/<protocol>_samples.csv` with header
/// `mcsl,samples`, one file per protocol.
///
/// Files are rewritten in full on every [`flush`](ResultSink::flush).
#[derive(Debug)]
pub struct CsvResultSink {
    root: PathBuf,
    rows: BTreeMap<String, Vec<PointResult>>,
}

impl CsvResultSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rows: BTreeMap::new(),
        }
    }

    fn write_file(path: &Path, points: &[PointResult], protocol: Protocol) -> Result<()> {
        let mut out = csv::Writer::from_path(path)
            .with_context(|| format!("Cannot create {}", path.display()))?;
        for p in points {
            out.serialize(Row {
                mcsl: p.mcsl,
                samples: p.ratio(protocol),
            })
            .with_context(|| format!("Cannot write {}", path.display()))?;
        }
        out.flush()
            .with_context(|| format!("Cannot write {}", path.display()))?;
        Ok(())
    }
}

impl ResultSink for CsvResultSink {
    fn record(&mut self, experiment: &str, point: &PointResult) -> Result<()> {
        self.rows
            .entry(experiment.to_string())
            .or_default()
            .push(*point);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for (experiment, points) in &self.rows {
            let dir = self.root.join(experiment);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Cannot create result directory {}", dir.display()))?;
            for protocol in Protocol::ALL {
                let path = dir.join(format!("{}_samples.csv", protocol.file_stem()));
                Self::write_file(&path, points, protocol)?;
            }
            debug!(experiment = %experiment, points = points.len(), "results written");
        }
        Ok(())
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Seed of one sample, derived from the base seed and its coordinates.
pub fn sample_seed(base: u64, experiment: usize, mcsl: u64, sample: usize) -> u64 {
    [experiment as u64, mcsl, sample as u64]
        .into_iter()
        .fold(splitmix64(base), |acc, x| splitmix64(acc ^ x))
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Evaluate the three protocol views of one synthesized taskset.
///
/// Returns `(fine_grained, group_lock, global_lock)` verdicts.
///
/// # Errors
/// [`ConfigurationError::ClusterSizeNotDivisible`] when `cluster_size` does
/// not tile `cpu_count`; no view is touched in that case.
pub fn evaluate_views(
    views: &mut ProtocolTasksets,
    cpu_count: usize,
    cluster_size: usize,
) -> Result<(bool, bool, bool), ConfigurationError> {
    let clusters = cluster_count(cpu_count, cluster_size)?;
    let fine = evaluate(
        &mut views.fine_grained,
        clusters,
        cluster_size,
        cpu_count,
        |ts, cpus, size| apply_fine_grained_bounds(ts, cpus, size, false),
    );
    let group = evaluate(
        &mut views.group_lock,
        clusters,
        cluster_size,
        cpu_count,
        apply_group_lock_bounds,
    );
    let global = evaluate(
        &mut views.global_lock,
        clusters,
        cluster_size,
        cpu_count,
        |ts, cpus, size| apply_fine_grained_bounds(ts, cpus, size, true),
    );
    Ok((fine, group, global))
}

/// Run one mcsl point of `experiment`.
///
/// # Errors
/// Synthesis failures are configuration faults and abort the point.
pub fn run_point(
    sweep: &SweepConfig,
    taskset: &TasksetConfig,
    experiment: &ExperimentConfig,
    experiment_index: usize,
    mcsl: u64,
) -> Result<PointResult> {
    let durations = DurationRange::new(sweep.mcsl_min, mcsl)?;
    let params = experiment.synthesis_params(taskset, durations);

    let mut successes = [0usize; 3];
    for sample in 0..sweep.samples {
        let seed = sample_seed(sweep.seed, experiment_index, mcsl, sample);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut views = synthesize(&params, &mut rng).with_context(|| {
            format!(
                "Experiment {}: synthesis failed at mcsl {mcsl}, sample {sample}",
                experiment.name
            )
        })?;
        let (fine, group, global) =
            evaluate_views(&mut views, experiment.cpu_count, sweep.cluster_size)
                .with_context(|| format!("Experiment {}", experiment.name))?;
        for (count, ok) in successes.iter_mut().zip([fine, group, global]) {
            *count += usize::from(ok);
        }
    }

    let ratio = |n: usize| n as f64 / sweep.samples as f64;
    Ok(PointResult {
        mcsl,
        fine_grained: ratio(successes[0]),
        group_lock: ratio(successes[1]),
        global_lock: ratio(successes[2]),
    })
}

/// Run every mcsl point of `experiment`, reporting each to `sink`.
pub fn run_experiment<S: ResultSink + ?Sized>(
    sweep: &SweepConfig,
    taskset: &TasksetConfig,
    experiment: &ExperimentConfig,
    experiment_index: usize,
    sink: &mut S,
) -> Result<Vec<PointResult>> {
    info!(
        experiment = %experiment.name,
        cpus = experiment.cpu_count,
        utilization = experiment.utilization,
        tasks = experiment.task_count,
        "=== experiment start ==="
    );

    let mut results = Vec::new();
    for mcsl in sweep.mcsl_points() {
        let point = run_point(sweep, taskset, experiment, experiment_index, mcsl)?;
        info!(
            experiment = %experiment.name,
            mcsl,
            fine_grained = point.fine_grained,
            group_lock = point.group_lock,
            global_lock = point.global_lock,
            "point done"
        );
        sink.record(&experiment.name, &point)?;
        results.push(point);
    }
    sink.flush()?;
    Ok(results)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
