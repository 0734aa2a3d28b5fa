/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Spin-based blocking bounds for partitioned / clustered EDF.
//!
//! Critical sections execute non-preemptively and conflicting requests are
//! served in FIFO order, so a job waiting for a lock spins on its processor.
//! Two terms are charged to every task `i` placed in cluster `p(i)`:
//!
//! **Remote spin** – for every other cluster `c`, the smaller of
//!
//! * the per-request bound: each request of `i` waits for at most
//!   `cluster_size` conflicting requests from `c` (one per processor),
//!   charged with the longest such requests;
//! * the per-window bound: a task `x` in `c` releases at most
//!   `⌈(R_i + R_x) / T_x⌉` jobs while a job of `i` is pending, each issuing
//!   all of its conflicting requests once.
//!
//! **Local blocking** – the longest outermost critical section of a task in
//! `p(i)` with a lower preemption level, which may already be running
//! non-preemptively when `i` is released.
//!
//! Two requests conflict when their paths share a resource.  The
//! `global_lock` flag of [`apply_fine_grained_bounds`] makes every pair of
//! requests conflict, which is how the global-lock view is analysed.

use std::collections::BTreeMap;

use tracing::debug;

use crate::task::{Blocking, CriticalSectionRequest, SynthesizedTask};

/// Conflict relation between two requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conflict {
    SharedResource,
    Always,
}

impl Conflict {
    fn between(self, a: &CriticalSectionRequest, b: &CriticalSectionRequest) -> bool {
        match self {
            Conflict::SharedResource => a.conflicts_with(b),
            Conflict::Always => true,
        }
    }
}

/// Blocking bounds for fine-grained nested locking.
///
/// With `global_lock` set, every request is treated as contending for one
/// lock instance.
pub fn apply_fine_grained_bounds(
    taskset: &mut [SynthesizedTask],
    cpu_count: usize,
    cluster_size: usize,
    global_lock: bool,
) {
    let conflict = if global_lock {
        Conflict::Always
    } else {
        Conflict::SharedResource
    };
    apply_spin_bounds(taskset, cpu_count, cluster_size, conflict);
}

/// Blocking bounds for a taskset already converted to group locks.
///
/// Every request holds exactly one group lock, so conflicts reduce to
/// "same group".
pub fn apply_group_lock_bounds(taskset: &mut [SynthesizedTask], cpu_count: usize, cluster_size: usize) {
    apply_spin_bounds(taskset, cpu_count, cluster_size, Conflict::SharedResource);
}

fn apply_spin_bounds(
    taskset: &mut [SynthesizedTask],
    cpu_count: usize,
    cluster_size: usize,
    conflict: Conflict,
) {
    let requests: Vec<Vec<CriticalSectionRequest>> =
        taskset.iter().map(|t| t.requests()).collect();

    // cluster → member task indices
    let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, task) in taskset.iter().enumerate() {
        if let Some(p) = task.partition {
            clusters.entry(p).or_default().push(idx);
        }
    }

    let tasks: &[SynthesizedTask] = taskset;
    let bounds: Vec<Blocking> = (0..tasks.len())
        .map(|i| {
            let Some(home) = tasks[i].partition else {
                return Blocking::default();
            };
            let own = &requests[i];

            let remote = clusters
                .iter()
                .filter(|&(&c, _)| c != home)
                .map(|(_, members)| {
                    let per_request =
                        per_request_spin(own, members, &requests, cluster_size, conflict);
                    let per_window = per_window_spin(i, own, members, tasks, &requests, conflict);
                    per_request.min(per_window)
                })
                .fold(0u64, u64::saturating_add);

            let local = clusters
                .get(&home)
                .into_iter()
                .flatten()
                .filter(|&&x| x != i && tasks[x].preemption_level < tasks[i].preemption_level)
                .flat_map(|&x| requests[x].iter().map(|r| r.duration))
                .max()
                .unwrap_or(0);

            Blocking { remote, local }
        })
        .collect();

    for (task, blocking) in taskset.iter_mut().zip(bounds) {
        task.blocking = blocking;
    }

    debug!(
        task_count = taskset.len(),
        cpu_count,
        cluster_size,
        cluster_count = clusters.len(),
        ?conflict,
        "blocking bounds applied"
    );
}

/// Each own request waits behind at most `cluster_size` conflicting requests
/// of the remote cluster.
fn per_request_spin(
    own: &[CriticalSectionRequest],
    members: &[usize],
    requests: &[Vec<CriticalSectionRequest>],
    cluster_size: usize,
    conflict: Conflict,
) -> u64 {
    own.iter()
        .map(|r| {
            let mut lengths: Vec<u64> = members
                .iter()
                .flat_map(|&x| requests[x].iter())
                .filter(|q| conflict.between(r, q))
                .map(|q| q.duration)
                .collect();
            lengths.sort_unstable_by(|a, b| b.cmp(a));
            lengths.into_iter().take(cluster_size).sum::<u64>()
        })
        .fold(0u64, u64::saturating_add)
}

/// Every conflicting request a remote task can issue while a job of task
/// `i` is pending.
fn per_window_spin(
    i: usize,
    own: &[CriticalSectionRequest],
    members: &[usize],
    taskset: &[SynthesizedTask],
    requests: &[Vec<CriticalSectionRequest>],
    conflict: Conflict,
) -> u64 {
    let window = response_window(&taskset[i]);
    members
        .iter()
        .map(|&x| {
            let tx = &taskset[x];
            let conflicting: u64 = requests[x]
                .iter()
                .filter(|q| own.iter().any(|r| conflict.between(r, q)))
                .map(|q| q.duration)
                .sum();
            if conflicting == 0 || tx.period == 0 {
                return 0;
            }
            let jobs = (window + response_window(tx)).div_ceil(tx.period);
            jobs.saturating_mul(conflicting)
        })
        .fold(0u64, u64::saturating_add)
}

/// Response-time bound used for job counting; falls back to the deadline
/// when the task has not been seeded yet.
fn response_window(task: &SynthesizedTask) -> u64 {
    if task.response_time > 0 {
        task.response_time
    } else {
        task.deadline
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
