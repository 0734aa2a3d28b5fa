/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Critical-section assignment: request shapes, then durations.
//!
//! # Shapes
//! Groups are visited in index order and, inside a group, member tasks in
//! task order.  The group's `minimal_requests` are dealt out first, one shape
//! per member in round-robin order (a member whose budget is used up is
//! skipped), so every minimal shape occurs exactly once per group and
//! `min(minimal_requests.len(), members)` tasks carry one.  Each member then
//! fills the rest of its budget with random shapes:
//!
//! * [`RequestMode::Symmetric`] – a fair coin picks the non-nested or the
//!   nested set, then a shape is drawn uniformly from it.
//! * [`RequestMode::Asymmetric`] – only non-nested shapes.  The members that
//!   carry the minimal pattern are the group's heavy tasks; everyone else
//!   only touches single resources.
//!
//! Shapes keep group-local indices; the caller offsets them.
//!
//! # Durations
//! A separate pass draws one independent duration per shape, uniformly from
//! a [`DurationRange`].

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use crate::group::{GroupAssignment, ResourceGroupConfiguration, ResourceTuple};
use crate::synthesis::ConfigurationError;
use crate::task::CriticalSectionRequest;

// ── Parameters ────────────────────────────────────────────────────────────────

/// How requests beyond the minimal pattern are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    #[default]
    Symmetric,
    Asymmetric,
}

/// Inclusive critical-section length range in µs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DurationRange {
    pub min: u64,
    pub max: u64,
}

impl DurationRange {
    /// Build a validated range.
    ///
    /// # Errors
    /// [`ConfigurationError::InvalidDurationRange`] if `min` is zero or
    /// greater than `max`.
    pub fn new(min: u64, max: u64) -> Result<Self, ConfigurationError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.min == 0 || self.min > self.max {
            return Err(ConfigurationError::InvalidDurationRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min..=self.max)
    }
}

// ── Request budgets ───────────────────────────────────────────────────────────

/// Draw one request budget per task, uniformly from `[1, max_requests]`.
///
/// When the draw leaves a populated group short of its minimal pattern, the
/// group's members are raised one request at a time (round-robin, never past
/// `max_requests`) until the pattern fits.  A group whose members cannot
/// carry the pattern even at `max_requests` keeps its draw and is rejected
/// by [`assign_requests`].
///
/// # Errors
/// [`ConfigurationError::ZeroRequestBudget`] if `max_requests` is zero.
pub fn draw_budgets<R: Rng + ?Sized>(
    config: &ResourceGroupConfiguration,
    assignment: &GroupAssignment,
    max_requests: usize,
    rng: &mut R,
) -> Result<Vec<usize>, ConfigurationError> {
    if max_requests == 0 {
        return Err(ConfigurationError::ZeroRequestBudget);
    }

    let mut budgets: Vec<usize> = (0..assignment.task_count())
        .map(|_| rng.gen_range(1..=max_requests))
        .collect();

    let required = config.minimal_requests.len();
    for group in 0..assignment.group_count() {
        let members: Vec<usize> = assignment.members(group).collect();
        if members.len() * max_requests < required {
            continue;
        }
        let mut total: usize = members.iter().map(|&t| budgets[t]).sum();
        let mut cursor = 0usize;
        while total < required {
            let task = members[cursor % members.len()];
            cursor += 1;
            if budgets[task] < max_requests {
                budgets[task] += 1;
                total += 1;
            }
        }
    }

    Ok(budgets)
}

// ── Shape assignment ──────────────────────────────────────────────────────────

/// Draw the request shapes of every task.
///
/// `budgets[t]` is the number of requests task `t` issues.  Returns one shape
/// sequence per task, indices local to the task's group.
///
/// # Errors
/// * [`ConfigurationError::InvalidGroupConfiguration`] – `config` breaks its
///   own shape invariants.
/// * [`ConfigurationError::BudgetCountMismatch`] – `budgets` and
///   `assignment` cover a different number of tasks.
/// * [`ConfigurationError::InsufficientRequestBudget`] – a group with members
///   cannot issue its minimal pattern.  Checked for every group before any
///   random draw.
pub fn assign_requests<R: Rng + ?Sized>(
    config: &ResourceGroupConfiguration,
    assignment: &GroupAssignment,
    budgets: &[usize],
    mode: RequestMode,
    rng: &mut R,
) -> Result<Vec<Vec<ResourceTuple>>, ConfigurationError> {
    config.validate()?;
    if budgets.len() != assignment.task_count() {
        return Err(ConfigurationError::BudgetCountMismatch {
            tasks: assignment.task_count(),
            budgets: budgets.len(),
        });
    }

    let required = config.minimal_requests.len();
    for group in 0..assignment.group_count() {
        let mut members = assignment.members(group).peekable();
        if members.peek().is_none() {
            continue;
        }
        let budget: usize = members.map(|t| budgets[t]).sum();
        if budget < required {
            return Err(ConfigurationError::InsufficientRequestBudget {
                group,
                budget,
                required,
            });
        }
    }

    let mut shapes: Vec<Vec<ResourceTuple>> = vec![Vec::new(); assignment.task_count()];

    for group in 0..assignment.group_count() {
        let members: Vec<usize> = assignment.members(group).collect();
        if members.is_empty() {
            continue;
        }

        // Deal the minimal pattern round-robin over members with budget left
        let mut cursor = 0usize;
        for shape in &config.minimal_requests {
            loop {
                let task = members[cursor % members.len()];
                cursor += 1;
                if shapes[task].len() < budgets[task] {
                    shapes[task].push(shape.clone());
                    break;
                }
            }
        }

        for &task in &members {
            while shapes[task].len() < budgets[task] {
                let shape = draw_shape(config, mode, rng)?;
                shapes[task].push(shape);
            }
        }
    }

    Ok(shapes)
}

fn draw_shape<R: Rng + ?Sized>(
    config: &ResourceGroupConfiguration,
    mode: RequestMode,
    rng: &mut R,
) -> Result<ResourceTuple, ConfigurationError> {
    let pool = match mode {
        RequestMode::Asymmetric => &config.non_nested_requests,
        RequestMode::Symmetric if rng.gen_bool(0.5) => &config.non_nested_requests,
        RequestMode::Symmetric => &config.nested_requests,
    };
    pool.choose(rng).cloned().ok_or_else(|| {
        ConfigurationError::InvalidGroupConfiguration("request sets must not be empty".into())
    })
}

// ── Duration assignment ───────────────────────────────────────────────────────

/// Attach an independent uniform duration from `range` to every shape.
///
/// The resulting requests still carry group-local resource indices.
pub fn assign_durations<R: Rng + ?Sized>(
    shapes: &[Vec<ResourceTuple>],
    range: DurationRange,
    rng: &mut R,
) -> Vec<Vec<CriticalSectionRequest>> {
    shapes
        .iter()
        .map(|task_shapes| {
            task_shapes
                .iter()
                .map(|shape| CriticalSectionRequest {
                    resource_path: shape.as_slice().to_vec(),
                    duration: range.sample(rng),
                })
                .collect()
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{assign_groups, lookup, GroupTopology};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn single_resource_group_forces_one_minimal_request() {
        let cfg = lookup(1, GroupTopology::Flat).unwrap();
        let mut r = rng(5);
        let a = assign_groups(2, 1, &cfg, &mut r).unwrap();
        let shapes = assign_requests(&cfg, &a, &[1, 1], RequestMode::Symmetric, &mut r).unwrap();

        assert_eq!(shapes[0], vec![ResourceTuple::new(vec![0])]);
        assert_eq!(shapes[1].len(), 1);
    }

    #[test]
    fn minimal_pattern_is_spread_over_members_not_repeated() {
        // 9 resources / 3 → 3 groups, 9 tasks, 2 minimal shapes per group
        let cfg = lookup(3, GroupTopology::Wide).unwrap();
        let mut r = rng(11);
        let a = assign_groups(9, 9, &cfg, &mut r).unwrap();
        let budgets = vec![3; 9];
        // asymmetric draws are never nested, so a nested shape was dealt
        let shapes = assign_requests(&cfg, &a, &budgets, RequestMode::Asymmetric, &mut r).unwrap();

        // seeded tasks 0..6 open with the minimal shapes, in catalog order
        for g in 0..3 {
            assert_eq!(shapes[2 * g][0], cfg.minimal_requests[0]);
            assert_eq!(shapes[2 * g + 1][0], cfg.minimal_requests[1]);
        }
        // overflow tasks 6..9 join an already seeded group and receive no
        // dealt shape
        for seq in &shapes[6..] {
            assert!(seq.iter().all(|s| !s.is_nested()));
        }
        for g in 0..3 {
            let nested: usize = a
                .members(g)
                .map(|t| shapes[t].iter().filter(|s| s.is_nested()).count())
                .sum();
            assert_eq!(nested, 2);
        }
        // every task fills its budget
        assert!(shapes.iter().all(|s| s.len() == 3));
    }

    #[test]
    fn lone_member_carries_the_whole_pattern() {
        let cfg = lookup(4, GroupTopology::Deep).unwrap();
        let mut r = rng(2);
        let a = assign_groups(1, 4, &cfg, &mut r).unwrap();
        let shapes = assign_requests(&cfg, &a, &[4], RequestMode::Symmetric, &mut r).unwrap();
        assert_eq!(&shapes[0][..3], cfg.minimal_requests.as_slice());
        assert_eq!(shapes[0].len(), 4);
    }

    #[test]
    fn exhausted_members_are_skipped_while_dealing() {
        let cfg = lookup(4, GroupTopology::Wide).unwrap();
        let mut r = rng(9);
        let a = assign_groups(2, 4, &cfg, &mut r).unwrap();
        // task 0 can only take one shape; task 1 takes the other two
        let shapes = assign_requests(&cfg, &a, &[1, 5], RequestMode::Symmetric, &mut r).unwrap();
        assert_eq!(shapes[0], vec![cfg.minimal_requests[0].clone()]);
        assert_eq!(shapes[1][0], cfg.minimal_requests[1]);
        assert_eq!(shapes[1][1], cfg.minimal_requests[2]);
        assert_eq!(shapes[1].len(), 5);
    }

    #[test]
    fn insufficient_budget_is_a_configuration_error() {
        let cfg = lookup(4, GroupTopology::Deep).unwrap();
        let mut r = rng(0);
        let a = assign_groups(2, 4, &cfg, &mut r).unwrap();
        let err = assign_requests(&cfg, &a, &[1, 1], RequestMode::Symmetric, &mut r).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InsufficientRequestBudget {
                group: 0,
                budget: 2,
                required: 3
            }
        );
    }

    #[test]
    fn malformed_inputs_are_configuration_errors() {
        let cfg = lookup(3, GroupTopology::Deep).unwrap();
        let mut r = rng(0);
        let a = assign_groups(2, 3, &cfg, &mut r).unwrap();
        assert_eq!(
            assign_requests(&cfg, &a, &[2], RequestMode::Symmetric, &mut r),
            Err(ConfigurationError::BudgetCountMismatch {
                tasks: 2,
                budgets: 1
            })
        );

        let empty_pools = ResourceGroupConfiguration {
            non_nested_requests: Vec::new(),
            ..cfg
        };
        assert!(matches!(
            assign_requests(&empty_pools, &a, &[2, 2], RequestMode::Asymmetric, &mut r),
            Err(ConfigurationError::InvalidGroupConfiguration(_))
        ));
    }

    #[test]
    fn empty_groups_issue_nothing() {
        let cfg = lookup(3, GroupTopology::Wide).unwrap();
        let mut r = rng(0);
        // two tasks fill group 0; groups 1..4 stay empty
        let a = assign_groups(2, 12, &cfg, &mut r).unwrap();
        let shapes = assign_requests(&cfg, &a, &[1, 1], RequestMode::Symmetric, &mut r).unwrap();
        assert_eq!(shapes.len(), 2);
    }

    #[test]
    fn asymmetric_mode_draws_only_single_resources() {
        let cfg = lookup(3, GroupTopology::Deep).unwrap();
        let mut r = rng(17);
        let a = assign_groups(12, 6, &cfg, &mut r).unwrap();
        let budgets = vec![4; 12];
        let shapes = assign_requests(&cfg, &a, &budgets, RequestMode::Asymmetric, &mut r).unwrap();

        for g in 0..a.group_count() {
            let members: Vec<usize> = a.members(g).collect();
            for (i, &t) in members.iter().enumerate() {
                let skip = usize::from(i < cfg.minimal_requests.len());
                assert!(shapes[t][skip..].iter().all(|s| !s.is_nested()));
            }
        }
    }

    #[test]
    fn budgets_are_raised_until_the_minimal_pattern_fits() {
        let cfg = lookup(4, GroupTopology::Mixed).unwrap();
        for seed in 0..32 {
            let mut r = rng(seed);
            // two tasks share one group whose pattern needs three requests
            let a = assign_groups(2, 4, &cfg, &mut r).unwrap();
            let budgets = draw_budgets(&cfg, &a, 2, &mut r).unwrap();
            assert!(budgets.iter().all(|&b| (1..=2).contains(&b)));
            assert!(budgets.iter().sum::<usize>() >= 3);
            assert!(assign_requests(&cfg, &a, &budgets, RequestMode::Symmetric, &mut r).is_ok());
        }
    }

    #[test]
    fn budgets_that_cannot_fit_are_left_for_rejection() {
        let cfg = lookup(4, GroupTopology::Deep).unwrap();
        let mut r = rng(3);
        let a = assign_groups(1, 4, &cfg, &mut r).unwrap();
        let budgets = draw_budgets(&cfg, &a, 2, &mut r).unwrap();
        assert!(matches!(
            assign_requests(&cfg, &a, &budgets, RequestMode::Symmetric, &mut r),
            Err(ConfigurationError::InsufficientRequestBudget { .. })
        ));
        assert_eq!(
            draw_budgets(&cfg, &a, 0, &mut r),
            Err(ConfigurationError::ZeroRequestBudget)
        );
    }

    #[test]
    fn durations_stay_in_range_and_keep_shapes() {
        let shapes = vec![
            vec![ResourceTuple::new(vec![0, 2]), ResourceTuple::new(vec![1])],
            vec![],
        ];
        let range = DurationRange::new(5, 9).unwrap();
        let timed = assign_durations(&shapes, range, &mut rng(1));
        assert_eq!(timed.len(), 2);
        assert_eq!(timed[0][0].resource_path, vec![0, 2]);
        assert_eq!(timed[0][1].resource_path, vec![1]);
        assert!(timed[0].iter().all(|r| (5..=9).contains(&r.duration)));
        assert!(timed[1].is_empty());
    }

    #[test]
    fn invalid_duration_ranges_are_rejected() {
        assert!(DurationRange::new(0, 5).is_err());
        assert!(DurationRange::new(6, 5).is_err());
        assert!(DurationRange::new(5, 5).is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn shapes_are_local_and_minimal_pattern_appears_once_per_group(
            groups in 1usize..5,
            extra_tasks in 0usize..10,
            max_budget in 1usize..5,
            asymmetric in any::<bool>(),
            seed in any::<u64>(),
        ) {
            let cfg = lookup(4, GroupTopology::Mixed).unwrap();
            let quota = cfg.minimal_requests.len();
            let tasks = groups * quota + extra_tasks;
            let mut r = rng(seed);
            let a = assign_groups(tasks, groups * 4, &cfg, &mut r).unwrap();
            let budgets: Vec<usize> = (0..tasks).map(|_| r.gen_range(1..=max_budget)).collect();
            let mode = if asymmetric { RequestMode::Asymmetric } else { RequestMode::Symmetric };
            let shapes = assign_requests(&cfg, &a, &budgets, mode, &mut r).unwrap();

            for (t, seq) in shapes.iter().enumerate() {
                prop_assert_eq!(seq.len(), budgets[t]);
                for s in seq {
                    prop_assert!(!s.is_empty());
                    prop_assert!(s.as_slice().iter().all(|&i| i < cfg.resources_per_group));
                }
            }
            for g in 0..groups {
                let members = a.members(g).count();
                let dealt: Vec<ResourceTuple> = a
                    .members(g)
                    .take(quota)
                    .map(|t| shapes[t][0].clone())
                    .collect();
                prop_assert_eq!(dealt.len(), quota.min(members));
                prop_assert_eq!(&dealt[..], &cfg.minimal_requests[..dealt.len()]);
            }
        }
    }
}
