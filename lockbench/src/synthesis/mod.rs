/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Taskset synthesis: timing, groups, critical sections, protocol views.
//!
//! [`synthesize`] builds one base taskset out of two independently generated
//! subsets and projects it into the three protocol views compared by the
//! sweep.
//!
//! ```text
//!            ┌── LS subset ──┐      ┌── NLS subset ─┐
//! generate → │ assign_groups │      │ assign_groups │
//!            │ draw_budgets  │      │ draw_budgets  │
//!            │ assign_reqs   │      │ assign_reqs   │
//!            │ durations     │      │ durations     │
//!            └──── offset ───┘      └──── offset ───┘
//!                   └────────── merge (NLS, LS) ──────────┐
//!                                                         ▼
//!                        fine_grained ─ group_lock ─ global_lock
//! ```
//!
//! # Resource identity
//! Inside a subset, a task in group `g` has its local shape indices offset
//! by `g × resources_per_group`.  The LS pool starts right after the NLS
//! pool, so the two subsets never share a resource.
//!
//! # Randomness
//! Every draw comes from the `rng` handed in by the caller; the same seed
//! always yields the same three views.

pub mod error;

pub use error::{ConfigurationError, SynthesisError};

use rand::Rng;
use tracing::debug;

use crate::critical_section::{
    assign_durations, assign_requests, draw_budgets, DurationRange, RequestMode,
};
use crate::generator;
use crate::group::{
    assign_groups, lookup, GroupTopology, ResourceGroupConfiguration, ResourceTuple,
};
use crate::locking::{convert_to_group_locks, convert_to_single_lock};
use crate::task::{LatencyClass, SynthesizedTask, Taskset};

// ── Parameters ────────────────────────────────────────────────────────────────

/// How the global-lock view is derived from the fine-grained one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlobalLockDerivation {
    /// Plain copy of the fine-grained view.  Whether requests contend for
    /// one lock is then decided by the bounds function alone.
    #[default]
    CopyOfFineGrained,
    /// Every request is rewritten to lock resource `0`.
    SingleLock,
}

/// Per-subset generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetProfile {
    /// Period catalog in milliseconds.
    pub periods_ms: Vec<u64>,
    /// Critical-section length range in µs.
    pub durations: DurationRange,
    /// Upper bound of the per-task request budget.
    pub max_requests: usize,
    /// Size of the subset's own resource pool.
    pub resources: usize,
}

/// Everything [`synthesize`] needs for one taskset.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisParams {
    pub task_count: usize,
    /// How many of `task_count` tasks are latency-sensitive.
    pub ls_task_count: usize,
    /// Total utilization of the taskset.
    pub utilization: f64,
    /// Share of `utilization` carried by the LS subset.
    pub ls_utilization: f64,
    pub cpu_count: usize,
    pub group_size: usize,
    pub topology: GroupTopology,
    pub mode: RequestMode,
    pub global_lock: GlobalLockDerivation,
    pub ls: SubsetProfile,
    pub nls: SubsetProfile,
}

impl SynthesisParams {
    fn nls_task_count(&self) -> usize {
        self.task_count - self.ls_task_count
    }

    fn nls_utilization(&self) -> f64 {
        self.utilization - self.ls_utilization
    }

    /// Check the parameters that do not depend on the group catalog.
    ///
    /// # Errors
    /// The first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.ls_task_count > self.task_count {
            return Err(ConfigurationError::TooManyLatencySensitiveTasks {
                tasks: self.task_count,
                ls_tasks: self.ls_task_count,
            });
        }

        let invalid_utilization = || ConfigurationError::InvalidUtilization {
            utilization: self.utilization,
            ls_utilization: self.ls_utilization,
            cpus: self.cpu_count,
        };
        if !self.utilization.is_finite()
            || !self.ls_utilization.is_finite()
            || self.ls_utilization < 0.0
            || self.ls_utilization > self.utilization
            || self.utilization > self.cpu_count as f64
        {
            return Err(invalid_utilization());
        }
        // A subset without tasks cannot carry load.
        if (self.ls_task_count == 0 && self.ls_utilization > 0.0)
            || (self.nls_task_count() == 0 && self.nls_utilization() > 0.0)
        {
            return Err(invalid_utilization());
        }

        for (count, profile) in [
            (self.ls_task_count, &self.ls),
            (self.nls_task_count(), &self.nls),
        ] {
            if count == 0 {
                continue;
            }
            profile.durations.validate()?;
            if profile.max_requests == 0 {
                return Err(ConfigurationError::ZeroRequestBudget);
            }
        }
        Ok(())
    }
}

/// The three protocol views of one synthesized taskset.
///
/// Each view is an independent copy; mutating one never affects another.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolTasksets {
    pub fine_grained: Taskset,
    pub group_lock: Taskset,
    pub global_lock: Taskset,
}

// ── Catalog resolution ────────────────────────────────────────────────────────

/// Resolve `(group_size, topology)` to a validated catalog entry.
///
/// # Errors
/// * [`SynthesisError::UnsupportedTopology`] – no catalog entry.
/// * [`SynthesisError::Configuration`] – the entry violates its invariants.
pub fn resolve_group_configuration(
    group_size: usize,
    topology: GroupTopology,
) -> Result<ResourceGroupConfiguration, SynthesisError> {
    let config = lookup(group_size, topology).ok_or(SynthesisError::UnsupportedTopology {
        group_size,
        topology,
    })?;
    config.validate()?;
    Ok(config)
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// Synthesize one taskset and derive its protocol views.
///
/// Subsets are generated LS first, then NLS; the base taskset lists NLS tasks
/// first.  Task ids are positions in the base taskset.
///
/// # Errors
/// Any [`SynthesisError`].  Nothing is retried.
pub fn synthesize<R: Rng + ?Sized>(
    params: &SynthesisParams,
    rng: &mut R,
) -> Result<ProtocolTasksets, SynthesisError> {
    params.validate()?;
    let config = resolve_group_configuration(params.group_size, params.topology)?;

    let ls = synthesize_subset(
        &config,
        params.ls_task_count,
        params.ls_utilization,
        &params.ls,
        params.nls.resources,
        LatencyClass::Sensitive,
        params.mode,
        rng,
    )?;
    let nls = synthesize_subset(
        &config,
        params.nls_task_count(),
        params.nls_utilization(),
        &params.nls,
        0,
        LatencyClass::Insensitive,
        params.mode,
        rng,
    )?;

    let mut fine_grained: Taskset = nls.into_iter().chain(ls).collect();
    for (id, task) in fine_grained.iter_mut().enumerate() {
        task.id = id;
    }

    let mut group_lock = fine_grained.clone();
    convert_to_group_locks(&mut group_lock);

    let mut global_lock = fine_grained.clone();
    if params.global_lock == GlobalLockDerivation::SingleLock {
        convert_to_single_lock(&mut global_lock);
    }

    debug!(
        tasks = fine_grained.len(),
        ls_tasks = params.ls_task_count,
        group_size = params.group_size,
        topology = %params.topology,
        global_lock = ?params.global_lock,
        "taskset synthesized"
    );

    Ok(ProtocolTasksets {
        fine_grained,
        group_lock,
        global_lock,
    })
}

/// Build one subset whose resources start at `pool_base`.
#[allow(clippy::too_many_arguments)]
fn synthesize_subset<R: Rng + ?Sized>(
    config: &ResourceGroupConfiguration,
    count: usize,
    utilization: f64,
    profile: &SubsetProfile,
    pool_base: usize,
    class: LatencyClass,
    mode: RequestMode,
    rng: &mut R,
) -> Result<Vec<SynthesizedTask>, SynthesisError> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let timings = generator::generate(&profile.periods_ms, count, utilization, rng)?;
    let assignment = assign_groups(count, profile.resources, config, rng)?;
    let budgets = draw_budgets(config, &assignment, profile.max_requests, rng)?;
    let local = assign_requests(config, &assignment, &budgets, mode, rng)?;

    // group-local → pool-global resource ids
    let shapes: Vec<Vec<ResourceTuple>> = local
        .iter()
        .enumerate()
        .map(|(t, seq)| {
            let base = pool_base + assignment.group_of(t) * config.resources_per_group;
            seq.iter().map(|s| ResourceTuple::new(s.offset(base))).collect()
        })
        .collect();
    let requests = assign_durations(&shapes, profile.durations, rng);

    debug!(
        ?class,
        tasks = count,
        utilization,
        pool_base,
        resources = profile.resources,
        groups = assignment.group_count(),
        "subset synthesized"
    );

    let tasks = timings
        .into_iter()
        .zip(requests)
        .map(|(timing, requests)| {
            let mut task = SynthesizedTask {
                class,
                period: timing.period,
                cost: timing.cost,
                deadline: timing.deadline,
                ..Default::default()
            };
            for request in &requests {
                task.critical_sections.add_request(request);
            }
            task
        })
        .collect();

    Ok(tasks)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
