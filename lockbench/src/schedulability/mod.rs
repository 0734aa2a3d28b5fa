/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedulability evaluation harness for clustered EDF with a pluggable
//! locking-protocol bounds function.
//!
//! ```text
//! PREEMPTION_ASSIGNED → PARTITIONED → BOUNDED → TESTED → DONE
//!                           │
//!                           └─ misfit ─► INFEASIBLE (false)
//! ```
//!
//! The harness knows nothing about locking protocols: the caller supplies
//! `bounds_fn`, which is invoked exactly once over the whole partitioned
//! taskset.  A packing failure is an ordinary `false` verdict, not an error.
//!
//! # Example
//! ```rust,ignore
//! let ok = evaluate(&mut views.global_lock, clusters, cluster_size, cpus, |ts, cpus, size| {
//!     apply_fine_grained_bounds(ts, cpus, size, true)
//! });
//! ```

pub mod binpack;
pub mod feasibility;

pub use binpack::{worst_fit, DidNotFit};
pub use feasibility::is_schedulable;

use tracing::debug;

use crate::locking::assign_edf_preemption_levels;
use crate::synthesis::ConfigurationError;
use crate::task::SynthesizedTask;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Granularity (µs) the feasibility test rounds execution demand to.
pub const RESPONSE_TIME_RESOLUTION: u64 = 1;

// ── Public API ────────────────────────────────────────────────────────────────

/// Number of clusters formed by `cpu_count` processors grouped
/// `cluster_size` at a time.
///
/// # Errors
/// [`ConfigurationError::ClusterSizeNotDivisible`] unless the clusters tile
/// a non-empty platform exactly.
pub fn cluster_count(cpu_count: usize, cluster_size: usize) -> Result<usize, ConfigurationError> {
    if cpu_count == 0 || cluster_size == 0 || cpu_count % cluster_size != 0 {
        return Err(ConfigurationError::ClusterSizeNotDivisible {
            cpus: cpu_count,
            cluster_size,
        });
    }
    Ok(cpu_count / cluster_size)
}

/// Evaluate `taskset` on `cluster_count` clusters of `cluster_size`
/// processors using [`is_schedulable`] per cluster.
///
/// Fills `preemption_level`, `response_time`, `partition` and (through
/// `bounds_fn`) `blocking` on every task.
pub fn evaluate<B>(
    taskset: &mut [SynthesizedTask],
    cluster_count: usize,
    cluster_size: usize,
    cpu_count: usize,
    bounds_fn: B,
) -> bool
where
    B: FnMut(&mut [SynthesizedTask], usize, usize),
{
    evaluate_with(
        taskset,
        cluster_count,
        cluster_size,
        cpu_count,
        bounds_fn,
        |capacity, tasks| is_schedulable(capacity, tasks, RESPONSE_TIME_RESOLUTION),
    )
}

/// [`evaluate`] with a caller-supplied per-cluster feasibility test.
///
/// `test(cluster_size, tasks)` is called for every cluster in index order;
/// the scan stops at the first infeasible cluster.
pub fn evaluate_with<B, T>(
    taskset: &mut [SynthesizedTask],
    cluster_count: usize,
    cluster_size: usize,
    cpu_count: usize,
    mut bounds_fn: B,
    mut test: T,
) -> bool
where
    B: FnMut(&mut [SynthesizedTask], usize, usize),
    T: FnMut(usize, &[&SynthesizedTask]) -> bool,
{
    // ── Preemption levels ─────────────────────────────────────────────────────
    assign_edf_preemption_levels(taskset);
    for task in taskset.iter_mut() {
        task.response_time = task.deadline;
    }
    debug!(task_count = taskset.len(), "preemption levels assigned");

    // ── Partitioning ──────────────────────────────────────────────────────────
    let clusters = match worst_fit(taskset, cluster_count, cluster_size as f64, |t| {
        t.utilization()
    }) {
        Ok(clusters) => clusters,
        Err(misfit) => {
            debug!(
                item = misfit.item,
                weight = misfit.weight,
                cluster_count,
                cluster_size,
                "partitioning failed"
            );
            return false;
        }
    };
    for (cluster, members) in clusters.iter().enumerate() {
        for &idx in members {
            taskset[idx].partition = Some(cluster);
        }
    }
    debug!(task_count = taskset.len(), cluster_count, "partitioned");

    // ── Blocking bounds ───────────────────────────────────────────────────────
    bounds_fn(taskset, cpu_count, cluster_size);
    debug!(
        max_remote = taskset.iter().map(|t| t.blocking.remote).max().unwrap_or(0),
        max_local = taskset.iter().map(|t| t.blocking.local).max().unwrap_or(0),
        "blocking bounded"
    );

    // ── Per-cluster tests ─────────────────────────────────────────────────────
    for (cluster, members) in clusters.iter().enumerate() {
        let tasks: Vec<&SynthesizedTask> = members.iter().map(|&i| &taskset[i]).collect();
        if !test(cluster_size, &tasks) {
            debug!(cluster, tasks = tasks.len(), "cluster infeasible");
            return false;
        }
    }

    debug!(task_count = taskset.len(), "taskset schedulable");
    true
}

// ── Tests ─────────────────────────────────────────────────────────────────────
