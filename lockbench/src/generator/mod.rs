/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Periodic task timing generator.
//!
//! Per-task utilisations come from UUniFast (Bini & Buttazzo), discarding
//! vectors in which any task exceeds a utilisation of 1.  Periods are drawn
//! uniformly from a catalog given in milliseconds and scaled to microseconds.
//! Deadlines are implicit and costs are integral:
//!
//! ```text
//! period   = choice(catalog) × 1000
//! cost     = max(1, ⌈u × period⌉)
//! deadline = period
//! ```

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// Microseconds per millisecond.
pub const MS_TO_US: u64 = 1_000;

/// Maximum number of UUniFast draws before giving up.
pub const MAX_UUNIFAST_ATTEMPTS: usize = 1_000;

/// Timing of one generated task (µs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicTiming {
    pub period: u64,
    pub cost: u64,
    pub deadline: u64,
}

/// Why a timing set could not be generated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    #[error("period catalog is empty")]
    EmptyPeriodCatalog,

    #[error("period catalog contains a zero period")]
    ZeroPeriod,

    /// `count` tasks cannot carry `utilization` when each is capped at 1.
    #[error("{count} task(s) cannot carry a total utilization of {utilization:.3}")]
    InfeasibleUtilization { count: usize, utilization: f64 },

    #[error("no utilization vector with every task ≤ 1 after {attempts} attempts")]
    AttemptsExhausted { attempts: usize },
}

/// Generate `count` task timings whose utilisations sum to
/// `total_utilization`.
///
/// Returns an empty vector when `count` is zero and `total_utilization` is
/// zero.
///
/// # Errors
/// * [`GeneratorError::EmptyPeriodCatalog`] / [`GeneratorError::ZeroPeriod`]
/// * [`GeneratorError::InfeasibleUtilization`] – negative, non-finite, or
///   more than `count`.
/// * [`GeneratorError::AttemptsExhausted`] – rejection sampling did not
///   converge.
pub fn generate<R: Rng + ?Sized>(
    periods_ms: &[u64],
    count: usize,
    total_utilization: f64,
    rng: &mut R,
) -> Result<Vec<PeriodicTiming>, GeneratorError> {
    if !total_utilization.is_finite()
        || total_utilization < 0.0
        || total_utilization > count as f64
        || (count == 0 && total_utilization > 0.0)
    {
        return Err(GeneratorError::InfeasibleUtilization {
            count,
            utilization: total_utilization,
        });
    }
    if count == 0 {
        return Ok(Vec::new());
    }
    if periods_ms.is_empty() {
        return Err(GeneratorError::EmptyPeriodCatalog);
    }
    if periods_ms.contains(&0) {
        return Err(GeneratorError::ZeroPeriod);
    }

    let utilizations = uunifast_discard(count, total_utilization, rng)?;

    let timings = utilizations
        .into_iter()
        .map(|u| {
            // non-empty catalog checked above
            let period = periods_ms.choose(rng).copied().unwrap_or(1) * MS_TO_US;
            let cost = ((u * period as f64).ceil() as u64).clamp(1, period);
            PeriodicTiming {
                period,
                cost,
                deadline: period,
            }
        })
        .collect();

    Ok(timings)
}

/// UUniFast with rejection of vectors containing a utilisation above 1.
fn uunifast_discard<R: Rng + ?Sized>(
    count: usize,
    total: f64,
    rng: &mut R,
) -> Result<Vec<f64>, GeneratorError> {
    for _ in 0..MAX_UUNIFAST_ATTEMPTS {
        let mut out = Vec::with_capacity(count);
        let mut remaining = total;
        for i in 1..count {
            let next = remaining * rng.gen::<f64>().powf(1.0 / (count - i) as f64);
            out.push(remaining - next);
            remaining = next;
        }
        out.push(remaining);

        if out.iter().all(|&u| u <= 1.0) {
            return Ok(out);
        }
    }
    Err(GeneratorError::AttemptsExhausted {
        attempts: MAX_UUNIFAST_ATTEMPTS,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
