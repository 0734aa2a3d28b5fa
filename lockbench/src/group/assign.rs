/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Task → resource group mapping.
//!
//! Two passes:
//!
//! 1. **Seeding** – groups in index order each take the next unassigned
//!    tasks, up to `minimal_requests.len()` of them.  Walking groups (not
//!    tasks) in the outer loop means low-index groups are never starved.
//! 2. **Overflow** – every task still unassigned joins a group drawn
//!    uniformly from `[0, groups)`.
//!
//! When there are fewer tasks than `groups × minimal_requests.len()` the
//! trailing groups simply receive fewer (possibly zero) seeded tasks.

use rand::Rng;
use tracing::debug;

use super::ResourceGroupConfiguration;
use crate::synthesis::ConfigurationError;

/// Mapping task-index → group-index for one subset.
///
/// Created once per synthesized taskset and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    groups: Vec<usize>,
    group_count: usize,
}

impl GroupAssignment {
    /// Group of task `task`.
    ///
    /// # Panics
    /// Panics if `task` is out of range.
    pub fn group_of(&self, task: usize) -> usize {
        self.groups[task]
    }

    /// Number of groups formed from the resource pool.
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Number of tasks covered by the mapping.
    pub fn task_count(&self) -> usize {
        self.groups.len()
    }

    /// Member task indices of `group`, in ascending order.
    pub fn members(&self, group: usize) -> impl Iterator<Item = usize> + '_ {
        self.groups
            .iter()
            .enumerate()
            .filter(move |(_, &g)| g == group)
            .map(|(t, _)| t)
    }

    /// The raw mapping, indexed by task.
    pub fn as_slice(&self) -> &[usize] {
        &self.groups
    }
}

/// Assign `task_count` tasks to the groups formed from `resource_count`
/// resources.
///
/// # Errors
/// * [`ConfigurationError::ResourceCountNotDivisible`] – the pool does not
///   split into whole groups.
/// * [`ConfigurationError::NoResourceGroups`] – tasks exist but the pool is
///   empty.
pub fn assign_groups<R: Rng + ?Sized>(
    task_count: usize,
    resource_count: usize,
    config: &ResourceGroupConfiguration,
    rng: &mut R,
) -> Result<GroupAssignment, ConfigurationError> {
    let group_count = config.group_count(resource_count)?;
    if group_count == 0 && task_count > 0 {
        return Err(ConfigurationError::NoResourceGroups { tasks: task_count });
    }

    let quota = config.minimal_requests.len();
    let mut slots: Vec<Option<usize>> = vec![None; task_count];

    // Seeding pass
    let mut next = 0usize;
    for group in 0..group_count {
        for slot in slots.iter_mut().skip(next).take(quota) {
            *slot = Some(group);
        }
        next = (next + quota).min(task_count);
    }

    // Overflow pass
    let groups: Vec<usize> = slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| rng.gen_range(0..group_count)))
        .collect();

    debug!(
        task_count,
        group_count,
        seeded = (quota * group_count).min(task_count),
        "groups assigned"
    );

    Ok(GroupAssignment {
        groups,
        group_count,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{lookup, GroupTopology};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wide3() -> ResourceGroupConfiguration {
        lookup(3, GroupTopology::Wide).unwrap()
    }

    #[test]
    fn single_group_takes_every_task() {
        let cfg = lookup(1, GroupTopology::Flat).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let a = assign_groups(2, 1, &cfg, &mut rng).unwrap();
        assert_eq!(a.as_slice(), &[0, 0]);
        assert_eq!(a.group_count(), 1);
    }

    #[test]
    fn seeding_fills_groups_in_index_order() {
        // 3 groups × 2 minimal requests → the first 6 tasks are seeded
        let mut rng = StdRng::seed_from_u64(7);
        let a = assign_groups(9, 9, &wide3(), &mut rng).unwrap();
        assert_eq!(&a.as_slice()[..6], &[0, 0, 1, 1, 2, 2]);
        assert!(a.as_slice()[6..].iter().all(|&g| g < 3));
    }

    #[test]
    fn too_few_tasks_starve_trailing_groups_only() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = assign_groups(3, 12, &wide3(), &mut rng).unwrap();
        assert_eq!(a.as_slice(), &[0, 0, 1]);
        assert_eq!(a.members(2).count(), 0);
        assert_eq!(a.members(3).count(), 0);
    }

    #[test]
    fn uneven_pool_is_a_configuration_error() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = assign_groups(4, 10, &wide3(), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::ResourceCountNotDivisible { .. }
        ));
    }

    #[test]
    fn tasks_without_resources_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = assign_groups(2, 0, &wide3(), &mut rng).unwrap_err();
        assert_eq!(err, ConfigurationError::NoResourceGroups { tasks: 2 });
        // an empty subset with an empty pool is fine
        assert!(assign_groups(0, 0, &wide3(), &mut rng).is_ok());
    }

    #[test]
    fn members_are_listed_in_task_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = assign_groups(12, 6, &wide3(), &mut rng).unwrap();
        for g in 0..a.group_count() {
            let m: Vec<usize> = a.members(g).collect();
            assert!(m.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn same_seed_same_assignment() {
        let a = assign_groups(20, 12, &wide3(), &mut StdRng::seed_from_u64(42)).unwrap();
        let b = assign_groups(20, 12, &wide3(), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn every_task_gets_exactly_one_valid_group(
            tasks in 0usize..40,
            groups in 1usize..6,
            seed in any::<u64>(),
        ) {
            let cfg = wide3();
            let mut rng = StdRng::seed_from_u64(seed);
            let a = assign_groups(tasks, groups * 3, &cfg, &mut rng).unwrap();
            prop_assert_eq!(a.task_count(), tasks);
            prop_assert!(a.as_slice().iter().all(|&g| g < groups));

            let covered: usize = (0..groups).map(|g| a.members(g).count()).sum();
            prop_assert_eq!(covered, tasks);

            // each group holds at least min(quota, tasks left for it) members
            let quota = cfg.minimal_requests.len();
            for g in 0..groups {
                let left = tasks.saturating_sub(g * quota);
                prop_assert!(a.members(g).count() >= quota.min(left));
            }
        }
    }
}
