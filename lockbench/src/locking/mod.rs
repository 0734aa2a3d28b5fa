/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Locking-protocol views of a taskset and their analysis hooks.
//!
//! * [`convert_to_group_locks`] – coalesce nested requests into one lock per
//!   resource group.
//! * [`convert_to_single_lock`] – route every request through one lock.
//! * [`assign_edf_preemption_levels`] – EDF preemption levels from relative
//!   deadlines.
//! * [`bounds`] – protocol blocking bounds.

pub mod bounds;

pub use bounds::{apply_fine_grained_bounds, apply_group_lock_bounds};

use std::collections::BTreeMap;

use tracing::debug;

use crate::task::{CriticalSectionRequest, SynthesizedTask};

// ── Union–find over resource ids ──────────────────────────────────────────────

/// Disjoint sets of resource ids; each set's representative is its smallest
/// member, so the result does not depend on union order.
#[derive(Debug, Default)]
struct ResourceSets {
    parent: BTreeMap<usize, usize>,
}

impl ResourceSets {
    fn find(&mut self, r: usize) -> usize {
        let p = *self.parent.entry(r).or_insert(r);
        if p == r {
            return r;
        }
        let root = self.find(p);
        self.parent.insert(r, root);
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent.insert(hi, lo);
        }
    }
}

// ── Group locks ───────────────────────────────────────────────────────────────

/// Replace fine-grained nested locking by group locks, in place.
///
/// Two resources belong to the same group when some request of some task
/// holds both.  Every outermost critical section is rewritten to acquire the
/// group's lock (the smallest resource id of the group) for its full length;
/// nested sections disappear.
pub fn convert_to_group_locks(taskset: &mut [SynthesizedTask]) {
    let mut sets = ResourceSets::default();
    for task in taskset.iter() {
        for request in task.requests() {
            let first = request.outermost();
            for &r in &request.resource_path {
                sets.union(first, r);
            }
        }
    }

    for task in taskset.iter_mut() {
        let coalesced: Vec<CriticalSectionRequest> = task
            .requests()
            .into_iter()
            .map(|r| CriticalSectionRequest {
                resource_path: vec![sets.find(r.outermost())],
                duration: r.duration,
            })
            .collect();
        task.critical_sections.replace_with(&coalesced);
    }

    debug!(task_count = taskset.len(), "converted to group locks");
}

/// Route every request through lock `0`, in place.
pub fn convert_to_single_lock(taskset: &mut [SynthesizedTask]) {
    for task in taskset.iter_mut() {
        let single: Vec<CriticalSectionRequest> = task
            .requests()
            .into_iter()
            .map(|r| CriticalSectionRequest {
                resource_path: vec![0],
                duration: r.duration,
            })
            .collect();
        task.critical_sections.replace_with(&single);
    }
}

// ── Preemption levels ─────────────────────────────────────────────────────────

/// Assign EDF preemption levels: the shorter the relative deadline, the
/// higher the level.  Tasks with equal deadlines share a level; the longest
/// deadline gets level 1.
pub fn assign_edf_preemption_levels(taskset: &mut [SynthesizedTask]) {
    let mut deadlines: Vec<u64> = taskset.iter().map(|t| t.deadline).collect();
    deadlines.sort_unstable_by(|a, b| b.cmp(a));
    deadlines.dedup();

    for task in taskset.iter_mut() {
        // deadlines is sorted descending
        let rank = deadlines.partition_point(|&d| d > task.deadline);
        task.preemption_level = rank as u32 + 1;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
