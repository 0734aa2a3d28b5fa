/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures.
//!
//! ```text
//! generator ──(PeriodicTiming)──►  SynthesizedTask  ──(harness)──►  verdict
//!                                   ↑ timing + nested critical sections
//!                                   mutable analysis fields
//! ```
//!
//! # Ownership model
//! A `SynthesizedTask` is a plain owned value.  Each protocol view of a
//! taskset is an independent `Vec<SynthesizedTask>`; the analysis stages
//! (preemption levels, partitioning, blocking bounds) take `&mut [_]` and
//! fill the analysis fields in place, so no two views ever alias.

use std::collections::BTreeSet;

// ── Critical-section requests ─────────────────────────────────────────────────

/// One critical-section request of a task.
///
/// `resource_path[0]` is the outermost lock; every following resource is
/// acquired while the previous one is held.  The request holds its locks for
/// `duration` time units (µs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalSectionRequest {
    pub resource_path: Vec<usize>,
    pub duration: u64,
}

impl CriticalSectionRequest {
    /// Outermost resource of the request.
    ///
    /// # Panics
    /// Panics if `resource_path` is empty.
    pub fn outermost(&self) -> usize {
        self.resource_path[0]
    }

    /// `true` if the two requests lock at least one common resource.
    pub fn conflicts_with(&self, other: &CriticalSectionRequest) -> bool {
        self.resource_path
            .iter()
            .any(|r| other.resource_path.contains(r))
    }
}

// ── Nested resource model ─────────────────────────────────────────────────────

/// Handle to a critical section inside one [`NestedCriticalSections`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsHandle(usize);

/// One critical section: a resource held for `length` µs, optionally inside
/// an enclosing section of the same task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalSection {
    pub resource_id: usize,
    pub length: u64,
    pub outer: Option<CsHandle>,
}

impl CriticalSection {
    pub fn is_outermost(&self) -> bool {
        self.outer.is_none()
    }
}

/// Nested critical-section container attached to every task.
///
/// Sections are stored in insertion order; a nested section always comes
/// after its enclosing section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestedCriticalSections {
    sections: Vec<CriticalSection>,
}

impl NestedCriticalSections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new outermost section.
    pub fn add_outermost(&mut self, resource_id: usize, length: u64) -> CsHandle {
        self.sections.push(CriticalSection {
            resource_id,
            length,
            outer: None,
        });
        CsHandle(self.sections.len() - 1)
    }

    /// Open a section nested inside `parent`.
    ///
    /// # Panics
    /// Panics if `parent` does not belong to this container.
    pub fn add_nested(&mut self, parent: CsHandle, resource_id: usize, length: u64) -> CsHandle {
        assert!(parent.0 < self.sections.len(), "dangling parent handle");
        self.sections.push(CriticalSection {
            resource_id,
            length,
            outer: Some(parent),
        });
        CsHandle(self.sections.len() - 1)
    }

    /// Splice one request in: its first resource becomes an outermost
    /// section, every further resource nests inside the previous one.
    pub fn add_request(&mut self, request: &CriticalSectionRequest) {
        let mut path = request.resource_path.iter();
        let Some(&first) = path.next() else {
            return;
        };
        let mut handle = self.add_outermost(first, request.duration);
        for &r in path {
            handle = self.add_nested(handle, r, request.duration);
        }
    }

    pub fn sections(&self) -> &[CriticalSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn outermost(&self) -> impl Iterator<Item = &CriticalSection> {
        self.sections.iter().filter(|cs| cs.is_outermost())
    }

    /// Rebuild the ordered request list.
    ///
    /// Every outermost section yields one request; its path follows the
    /// chain of directly nested sections (first child at each level).
    pub fn requests(&self) -> Vec<CriticalSectionRequest> {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, cs)| cs.is_outermost())
            .map(|(idx, cs)| {
                let mut path = vec![cs.resource_id];
                let mut current = idx;
                while let Some(child) = self
                    .sections
                    .iter()
                    .enumerate()
                    .skip(current + 1)
                    .find(|(_, s)| s.outer == Some(CsHandle(current)))
                    .map(|(i, _)| i)
                {
                    path.push(self.sections[child].resource_id);
                    current = child;
                }
                CriticalSectionRequest {
                    resource_path: path,
                    duration: cs.length,
                }
            })
            .collect()
    }

    /// Every resource accessed by any section.
    pub fn resources(&self) -> BTreeSet<usize> {
        self.sections.iter().map(|cs| cs.resource_id).collect()
    }

    /// Replace all sections with `requests`.
    pub fn replace_with(&mut self, requests: &[CriticalSectionRequest]) {
        self.sections.clear();
        for r in requests {
            self.add_request(r);
        }
    }
}

// ── Latency class ─────────────────────────────────────────────────────────────

/// Which subset a task was synthesized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatencyClass {
    /// Short periods, short critical sections, own resource pool.
    Sensitive,
    #[default]
    Insensitive,
}

// ── Blocking terms ────────────────────────────────────────────────────────────

/// Blocking attributed to a task by a protocol bounds function (µs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Blocking {
    /// Time spent spinning on requests held by tasks in other clusters.
    /// Consumes processor time, so it inflates the task's execution cost.
    pub remote: u64,
    /// Non-preemptive blocking by a local job with a lower preemption level
    /// that is already inside a critical section.
    pub local: u64,
}

// ── SynthesizedTask ───────────────────────────────────────────────────────────

/// A sporadic task together with its nested locking profile.
///
/// Timing fields are in microseconds.  `preemption_level`, `response_time`,
/// `partition` and `blocking` are analysis state written by the
/// schedulability harness and the bounds functions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesizedTask {
    // ── Identity ──────────────────────────────────────────────────────────────
    /// Index of the task in its taskset.
    pub id: usize,

    pub class: LatencyClass,

    // ── Timing ────────────────────────────────────────────────────────────────
    pub period: u64,

    /// Worst-case execution time, including time spent inside critical
    /// sections.
    pub cost: u64,

    /// Relative deadline.
    pub deadline: u64,

    // ── Locking ───────────────────────────────────────────────────────────────
    pub critical_sections: NestedCriticalSections,

    // ── Analysis state ────────────────────────────────────────────────────────
    /// EDF preemption level; a higher value preempts a lower one.
    pub preemption_level: u32,

    /// Current response-time upper bound.
    pub response_time: u64,

    /// Cluster the task was partitioned onto.
    pub partition: Option<usize>,

    pub blocking: Blocking,
}

impl SynthesizedTask {
    /// Utilisation `cost / period`.
    ///
    /// Returns `0.0` when `period` is zero to avoid division by zero.
    pub fn utilization(&self) -> f64 {
        if self.period == 0 {
            0.0
        } else {
            self.cost as f64 / self.period as f64
        }
    }

    /// The task's ordered critical-section requests.
    pub fn requests(&self) -> Vec<CriticalSectionRequest> {
        self.critical_sections.requests()
    }
}

/// An ordered collection of tasks.
pub type Taskset = Vec<SynthesizedTask>;

// ── Tests ─────────────────────────────────────────────────────────────────────
