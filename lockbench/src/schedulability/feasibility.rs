/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-cluster EDF feasibility tests with spin-lock blocking.
//!
//! Remote spin is processor time, so it is added to each task's cost.  Local
//! (arrival) blocking only delays a job and is charged once per job.  Both
//! are rounded up to the analysis `resolution` before testing.
//!
//! # Theory
//! **Single processor, EDF + SRP (Baker 1991)**: with tasks ordered by
//! relative deadline, the set is schedulable if for every `k`
//!
//! $$\sum_{i \le k} \frac{C'_i}{D_i} + \frac{B_k}{D_k} \le 1$$
//!
//! **`m` processors, global EDF (Goossens, Funk & Baruah 2003)**: with
//! blocking folded into the densities `δ_i = (C'_i + B_i) / D_i`,
//!
//! $$\sum_i \delta_i \le m - (m - 1) \max_i \delta_i$$
//!
//! where `C'_i` is the spin-inflated cost and `B_i` the local blocking.

use crate::task::SynthesizedTask;

// ── Public API ────────────────────────────────────────────────────────────────

/// Decide whether `tasks` are schedulable on a cluster of
/// `cluster_capacity` processors.
///
/// An empty cluster is trivially schedulable; a task with a zero deadline
/// never is.
pub fn is_schedulable(cluster_capacity: usize, tasks: &[&SynthesizedTask], resolution: u64) -> bool {
    if tasks.is_empty() {
        return true;
    }
    if cluster_capacity == 0 || tasks.iter().any(|t| t.deadline.min(t.period) == 0) {
        return false;
    }

    let mut demands: Vec<Demand> = tasks.iter().map(|t| Demand::of(t, resolution)).collect();

    if cluster_capacity == 1 {
        edf_srp_density_test(&mut demands)
    } else {
        gfb_density_test(cluster_capacity, &demands)
    }
}

// ── Internals ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Demand {
    cost: u64,
    blocking: u64,
    window: u64,
}

impl Demand {
    fn of(task: &SynthesizedTask, resolution: u64) -> Self {
        Demand {
            cost: round_up(task.cost.saturating_add(task.blocking.remote), resolution),
            blocking: round_up(task.blocking.local, resolution),
            window: task.deadline.min(task.period),
        }
    }

    fn density(&self) -> f64 {
        self.cost as f64 / self.window as f64
    }
}

fn round_up(value: u64, resolution: u64) -> u64 {
    if resolution <= 1 {
        return value;
    }
    value.div_ceil(resolution).saturating_mul(resolution)
}

fn edf_srp_density_test(demands: &mut [Demand]) -> bool {
    demands.sort_by_key(|d| d.window);
    let mut load = 0.0;
    for d in demands.iter() {
        load += d.density();
        if load + d.blocking as f64 / d.window as f64 > 1.0 {
            return false;
        }
    }
    true
}

fn gfb_density_test(m: usize, demands: &[Demand]) -> bool {
    let densities: Vec<f64> = demands
        .iter()
        .map(|d| (d.cost.saturating_add(d.blocking)) as f64 / d.window as f64)
        .collect();
    let max = densities.iter().copied().fold(0.0, f64::max);
    if max > 1.0 {
        return false;
    }
    let total: f64 = densities.iter().sum();
    let m = m as f64;
    total <= m - (m - 1.0) * max
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Blocking;

    fn task(period: u64, cost: u64, remote: u64, local: u64) -> SynthesizedTask {
        SynthesizedTask {
            period,
            deadline: period,
            cost,
            blocking: Blocking { remote, local },
            ..Default::default()
        }
    }

    #[test]
    fn empty_cluster_is_schedulable() {
        assert!(is_schedulable(1, &[], 1));
        assert!(is_schedulable(4, &[], 1));
    }

    #[test]
    fn full_uniprocessor_without_blocking_is_schedulable() {
        let a = task(10_000, 5_000, 0, 0);
        let b = task(20_000, 10_000, 0, 0);
        assert!(is_schedulable(1, &[&a, &b], 1));
    }

    #[test]
    fn remote_spin_inflates_cost() {
        let a = task(10_000, 5_000, 0, 0);
        let b = task(20_000, 9_000, 1_500, 0);
        assert!(!is_schedulable(1, &[&a, &b], 1));
    }

    #[test]
    fn local_blocking_counts_once_per_job() {
        // 0.5 + 0.2 blocking fits; 0.5 + 0.6 does not
        let short = task(10_000, 5_000, 0, 2_000);
        let long = task(100_000, 20_000, 0, 0);
        assert!(is_schedulable(1, &[&short, &long], 1));

        let blocked = task(10_000, 5_000, 0, 6_000);
        assert!(!is_schedulable(1, &[&blocked, &long], 1));
    }

    #[test]
    fn resolution_rounds_costs_up() {
        let a = task(10_000, 4_001, 0, 0);
        let b = task(10_000, 5_000, 0, 0);
        assert!(is_schedulable(1, &[&a, &b], 1));
        // 4_001 → 5_000 at 1 ms resolution: exactly full
        assert!(is_schedulable(1, &[&a, &b], 1_000));
        let c = task(10_000, 5_001, 0, 0);
        assert!(!is_schedulable(1, &[&a, &c], 1_000));
    }

    #[test]
    fn gfb_bound_on_two_processors() {
        // densities 0.5 × 3: 1.5 ≤ 2 − 0.5
        let a = task(10_000, 5_000, 0, 0);
        assert!(is_schedulable(2, &[&a, &a, &a], 1));
        // densities 0.9 + 0.9: 1.8 > 2 − 0.9
        let h = task(10_000, 9_000, 0, 0);
        assert!(!is_schedulable(2, &[&h, &h], 1));
    }

    #[test]
    fn overdense_task_never_fits() {
        let a = task(10_000, 9_000, 2_000, 0);
        assert!(!is_schedulable(4, &[&a], 1));
        assert!(!is_schedulable(1, &[&a], 1));
    }

    #[test]
    fn zero_deadline_is_infeasible() {
        let a = task(0, 1, 0, 0);
        assert!(!is_schedulable(1, &[&a], 1));
    }
}
