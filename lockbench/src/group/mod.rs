/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Resource groups: the static shape catalog and the task → group mapping.
//!
//! A *resource group* is a block of `resources_per_group` consecutive
//! resources in a pool.  Its [`ResourceGroupConfiguration`] lists the request
//! shapes tasks may issue against it, with all indices local to the group:
//!
//! ```text
//! wide, 3 resources           deep, 3 resources
//!   0   1   (outermost)         0       (outermost)
//!    \ /                        |\
//!     2     (nested)            1 2     (nested)
//! ```
//!
//! The `minimal_requests` of a configuration are the shapes that must appear
//! once per group for the topology to exist at all; the assignment engines
//! guarantee that.

pub mod assign;
pub mod catalog;

pub use assign::{assign_groups, GroupAssignment};
pub use catalog::lookup;

use std::fmt;

use serde::Deserialize;

use crate::synthesis::ConfigurationError;

// ── Topology ──────────────────────────────────────────────────────────────────

/// Nesting topology of a resource group.
///
/// A closed set: each variant maps to catalog entries in [`catalog`], so a
/// new topology is a compile-checked extension rather than a string branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupTopology {
    /// Single resource, no nesting.
    #[serde(alias = "none", alias = "")]
    Flat,
    /// Several outermost resources nesting one shared inner resource.
    Wide,
    /// One outermost resource nesting every other resource.
    Deep,
    /// Two outermost resources, two inner resources, partially shared.
    #[serde(alias = "wide_2")]
    Mixed,
}

impl fmt::Display for GroupTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupTopology::Flat => "flat",
            GroupTopology::Wide => "wide",
            GroupTopology::Deep => "deep",
            GroupTopology::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

// ── Request shapes ────────────────────────────────────────────────────────────

/// Shape of one critical-section request: the outermost resource followed by
/// the resources nested inside it, in acquisition order.
///
/// Indices are local to a group until the caller offsets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceTuple(Vec<usize>);

impl ResourceTuple {
    pub fn new(resources: impl Into<Vec<usize>>) -> Self {
        Self(resources.into())
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` when the shape acquires at least one resource while holding
    /// another.
    pub fn is_nested(&self) -> bool {
        self.0.len() > 1
    }

    /// Global resource path obtained by adding `base` to every local index.
    pub fn offset(&self, base: usize) -> Vec<usize> {
        self.0.iter().map(|r| r + base).collect()
    }
}

impl From<&[usize]> for ResourceTuple {
    fn from(resources: &[usize]) -> Self {
        Self(resources.to_vec())
    }
}

// ── ResourceGroupConfiguration ────────────────────────────────────────────────

/// Static description of one group topology.
///
/// Immutable once built; loaded once per experiment point.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGroupConfiguration {
    pub resources_per_group: usize,
    pub topology: GroupTopology,
    /// Shapes that must occur once per group, in catalog order.
    pub minimal_requests: Vec<ResourceTuple>,
    /// Single-resource shapes.
    pub non_nested_requests: Vec<ResourceTuple>,
    /// Multi-resource shapes (contains every minimal shape).
    pub nested_requests: Vec<ResourceTuple>,
}

impl ResourceGroupConfiguration {
    /// Check the shape invariants of the configuration.
    ///
    /// # Errors
    /// [`ConfigurationError::InvalidGroupConfiguration`] naming the first
    /// violated invariant.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |msg: String| Err(ConfigurationError::InvalidGroupConfiguration(msg));

        if self.resources_per_group == 0 {
            return invalid("resources_per_group must be positive".into());
        }
        if self.minimal_requests.is_empty() {
            return invalid("minimal_requests is empty".into());
        }
        if self.non_nested_requests.is_empty() || self.nested_requests.is_empty() {
            return invalid("request sets must not be empty".into());
        }

        let all = self
            .minimal_requests
            .iter()
            .chain(&self.non_nested_requests)
            .chain(&self.nested_requests);
        for tuple in all {
            if tuple.is_empty() {
                return invalid("empty request shape".into());
            }
            if let Some(&r) = tuple
                .as_slice()
                .iter()
                .find(|&&r| r >= self.resources_per_group)
            {
                return invalid(format!(
                    "resource {r} in {:?} is outside a group of {}",
                    tuple.as_slice(),
                    self.resources_per_group
                ));
            }
        }

        if let Some(t) = self.non_nested_requests.iter().find(|t| t.is_nested()) {
            return invalid(format!("{:?} is listed as non-nested", t.as_slice()));
        }
        if let Some(t) = self
            .minimal_requests
            .iter()
            .find(|t| !self.nested_requests.contains(t))
        {
            return invalid(format!(
                "minimal request {:?} is missing from nested_requests",
                t.as_slice()
            ));
        }

        Ok(())
    }

    /// Number of groups in a pool of `resource_count` resources.
    ///
    /// # Errors
    /// [`ConfigurationError::ResourceCountNotDivisible`] when the pool does
    /// not split evenly.
    pub fn group_count(&self, resource_count: usize) -> Result<usize, ConfigurationError> {
        if resource_count % self.resources_per_group != 0 {
            return Err(ConfigurationError::ResourceCountNotDivisible {
                resources: resource_count,
                group_size: self.resources_per_group,
            });
        }
        Ok(resource_count / self.resources_per_group)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
