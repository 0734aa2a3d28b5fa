/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! lockbench – nested-locking taskset synthesis and schedulability sweeps
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task              – task, critical-section and blocking data model
//! ├── group/            – group topologies, catalog, task → group mapping
//! ├── critical_section  – request budgets, shapes and durations
//! ├── generator/        – UUniFast periodic task timing
//! ├── synthesis/        – taskset synthesis and protocol views
//! ├── locking/          – group/single-lock transforms, preemption levels, bounds
//! ├── schedulability/   – partitioning + per-cluster feasibility harness
//! ├── config/           – YAML experiment configuration
//! └── sweep/            – mcsl sweep driver and result sinks
//! ```

pub mod config;
pub mod critical_section;
pub mod generator;
pub mod group;
pub mod locking;
pub mod schedulability;
pub mod sweep;
pub mod synthesis;
pub mod task;
