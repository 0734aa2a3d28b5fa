/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Built-in resource group configurations.
//!
//! | Size | Topology | Outermost | Inner | Minimal requests |
//! |---|---|---|---|---|
//! | 1 | flat  | 0       | –       | (0) |
//! | 3 | deep  | 0       | 1, 2    | (0,1) (0,2) |
//! | 3 | wide  | 0, 1    | 2       | (0,2) (1,2) |
//! | 4 | deep  | 0       | 1, 2, 3 | (0,1) (0,2) (0,3) |
//! | 4 | wide  | 0, 1, 2 | 3       | (0,3) (1,3) (2,3) |
//! | 4 | mixed | 0, 1    | 2, 3    | (0,2) (0,3) (1,3) |

use super::{GroupTopology, ResourceGroupConfiguration, ResourceTuple};

fn shapes(raw: &[&[usize]]) -> Vec<ResourceTuple> {
    raw.iter().map(|&s| ResourceTuple::from(s)).collect()
}

fn entry(
    resources_per_group: usize,
    topology: GroupTopology,
    minimal: &[&[usize]],
    non_nested: &[&[usize]],
    nested: &[&[usize]],
) -> ResourceGroupConfiguration {
    ResourceGroupConfiguration {
        resources_per_group,
        topology,
        minimal_requests: shapes(minimal),
        non_nested_requests: shapes(non_nested),
        nested_requests: shapes(nested),
    }
}

/// Resolve `(group_size, topology)` to its catalog entry.
///
/// Returns `None` for combinations the catalog does not define.
pub fn lookup(group_size: usize, topology: GroupTopology) -> Option<ResourceGroupConfiguration> {
    use GroupTopology::*;

    let cfg = match (group_size, topology) {
        // A flat group has no nesting; its only shape doubles as the nested
        // set so that a nested draw is always possible.
        (1, Flat) => entry(1, Flat, &[&[0]], &[&[0]], &[&[0]]),
        (3, Deep) => entry(
            3,
            Deep,
            &[&[0, 1], &[0, 2]],
            &[&[0], &[1], &[2]],
            &[&[0, 1], &[0, 2], &[1, 2]],
        ),
        (3, Wide) => entry(
            3,
            Wide,
            &[&[0, 2], &[1, 2]],
            &[&[0], &[1], &[2]],
            &[&[0, 2], &[1, 2]],
        ),
        (4, Deep) => entry(
            4,
            Deep,
            &[&[0, 1], &[0, 2], &[0, 3]],
            &[&[0], &[1], &[2], &[3]],
            &[&[0, 1], &[0, 2], &[0, 3]],
        ),
        (4, Wide) => entry(
            4,
            Wide,
            &[&[0, 3], &[1, 3], &[2, 3]],
            &[&[0], &[1], &[2]],
            &[&[0, 3], &[1, 3], &[2, 3]],
        ),
        (4, Mixed) => entry(
            4,
            Mixed,
            &[&[0, 2], &[0, 3], &[1, 3]],
            &[&[0], &[1], &[2], &[3]],
            &[&[0, 2], &[0, 3], &[1, 3], &[1, 2], &[2, 3]],
        ),
        _ => return None,
    };
    Some(cfg)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
