/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Worst-fit bin packing.
//!
//! Items are placed in input order, each into the bin with the most remaining
//! capacity (the lowest bin index wins ties).  The first item that fits
//! nowhere aborts the packing.

use thiserror::Error;

/// Slack allowed when comparing a weight against the remaining capacity, so
/// that utilisations summing to exactly the capacity still fit.
pub const FIT_TOLERANCE: f64 = 1e-9;

/// An item does not fit into any bin.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("item {item} (weight {weight:.4}) does not fit into any bin")]
pub struct DidNotFit {
    /// Index of the item in the input slice.
    pub item: usize,
    pub weight: f64,
}

/// Pack `items` into `bin_count` bins of `capacity`, by `weight`.
///
/// Returns, per bin, the indices of the items placed there in placement
/// order.
///
/// # Errors
/// [`DidNotFit`] for the first item that no bin can take.
pub fn worst_fit<T, F>(
    items: &[T],
    bin_count: usize,
    capacity: f64,
    weight: F,
) -> Result<Vec<Vec<usize>>, DidNotFit>
where
    F: Fn(&T) -> f64,
{
    let mut bins: Vec<Vec<usize>> = vec![Vec::new(); bin_count];
    let mut remaining: Vec<f64> = vec![capacity; bin_count];

    for (item, value) in items.iter().enumerate() {
        let w = weight(value);
        // first maximum → lowest index on ties
        let best = remaining
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (idx, &room)| match best {
                Some((_, best_room)) if best_room >= room => best,
                _ => Some((idx, room)),
            });

        match best {
            Some((idx, room)) if w <= room + FIT_TOLERANCE => {
                bins[idx].push(item);
                remaining[idx] = room - w;
            }
            _ => return Err(DidNotFit { item, weight: w }),
        }
    }

    Ok(bins)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
