/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for taskset synthesis.
//!
//! Two error enums model the two failure layers:
//!
//! * [`ConfigurationError`]: an experiment point whose parameters cannot
//!   yield a well-formed taskset (carries the offending values).
//! * [`SynthesisError`]: top-level failure returned from
//!   [`synthesize()`](super::synthesize).
//!
//! Neither is ever downgraded to a log line: a configuration that cannot
//! produce the requested nesting pattern is surfaced before any random draw
//! is made.  Partitioning failure is **not** an error; the schedulability
//! harness folds it into a `false` verdict.

use thiserror::Error;

use crate::generator::GeneratorError;
use crate::group::GroupTopology;

// ── Configuration errors ──────────────────────────────────────────────────────

/// Why an experiment point cannot be synthesized.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// The resource pool cannot be split evenly into groups.
    #[error("{resources} resources cannot be split into groups of {group_size}")]
    ResourceCountNotDivisible { resources: usize, group_size: usize },

    /// A non-empty subset has no resource group to be assigned to.
    #[error("{tasks} task(s) need a resource group but the pool has no resources")]
    NoResourceGroups { tasks: usize },

    /// The members of a group cannot issue enough requests to carry the
    /// group's minimal nesting pattern.
    #[error(
        "group {group} has a request budget of {budget} but its minimal pattern needs {required}"
    )]
    InsufficientRequestBudget {
        group: usize,
        budget: usize,
        required: usize,
    },

    /// A critical-section duration range is empty or starts at zero.
    #[error("invalid critical-section duration range [{min}, {max}]")]
    InvalidDurationRange { min: u64, max: u64 },

    /// Request budgets were supplied for a different number of tasks.
    #[error("{budgets} request budget(s) supplied for {tasks} task(s)")]
    BudgetCountMismatch { tasks: usize, budgets: usize },

    /// A per-task request budget of zero was configured.
    #[error("maximum request budget must be at least 1")]
    ZeroRequestBudget,

    /// A catalog entry violates its own shape invariants.
    #[error("invalid resource group configuration: {0}")]
    InvalidGroupConfiguration(String),

    /// More latency-sensitive tasks than tasks.
    #[error("{ls_tasks} latency-sensitive task(s) requested out of {tasks}")]
    TooManyLatencySensitiveTasks { tasks: usize, ls_tasks: usize },

    /// The utilization split does not fit the platform.
    #[error("utilization {utilization:.3} (ls {ls_utilization:.3}) is invalid for {cpus} CPU(s)")]
    InvalidUtilization {
        utilization: f64,
        ls_utilization: f64,
        cpus: usize,
    },

    /// Clusters must tile the platform exactly.
    #[error("cluster size {cluster_size} does not divide {cpus} CPU(s)")]
    ClusterSizeNotDivisible { cpus: usize, cluster_size: usize },
}

// ── Top-level synthesis errors ────────────────────────────────────────────────

/// Top-level error type returned by [`synthesize()`](super::synthesize).
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The experiment parameters are inconsistent.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// No catalog entry exists for the requested group size and topology.
    #[error("no resource group configuration for size {group_size} with {topology} topology")]
    UnsupportedTopology {
        group_size: usize,
        topology: GroupTopology,
    },

    /// The periodic task generator could not produce the subset timing.
    #[error("periodic task generation failed: {0}")]
    Generation(#[from] GeneratorError),
}
