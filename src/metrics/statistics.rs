// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Aggregate statistics over the client age population.
//!
//! The age list is treated as the whole population, so the standard
//! deviation divides by `N`, not `N - 1`.

use serde::Serialize;
use utoipa::ToSchema;

/// Arithmetic mean. Returns `0.0` for an empty slice.
pub fn average(ages: &[i32]) -> f64 {
    if ages.is_empty() {
        return 0.0;
    }
    let sum: i64 = ages.iter().map(|&age| i64::from(age)).sum();
    sum as f64 / ages.len() as f64
}

/// Population standard deviation around `mean`.
///
/// Returns `0.0` when there are fewer than two values.
pub fn standard_deviation(ages: &[i32], mean: f64) -> f64 {
    if ages.len() <= 1 {
        return 0.0;
    }
    let squared: f64 = ages
        .iter()
        .map(|&age| {
            let delta = f64::from(age) - mean;
            delta * delta
        })
        .sum();
    (squared / ages.len() as f64).sqrt()
}

/// Median of the ages. The input does not need to be sorted.
///
/// Even-sized populations average the two middle values. Returns `0.0` for
/// an empty slice.
pub fn median(ages: &[i32]) -> f64 {
    if ages.is_empty() {
        return 0.0;
    }

    let mut sorted = ages.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0
    } else {
        f64::from(sorted[mid])
    }
}

pub fn min(ages: &[i32]) -> Option<i32> {
    ages.iter().copied().min()
}

pub fn max(ages: &[i32]) -> Option<i32> {
    ages.iter().copied().max()
}

/// Round half up to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Presentation-ready statistics for a non-empty age population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgeSummary {
    pub count: usize,
    pub average: f64,
    pub standard_deviation: f64,
    pub median: f64,
    pub min: i32,
    pub max: i32,
}

impl AgeSummary {
    /// Summarize `ages`, or `None` for an empty population.
    ///
    /// Rounding is applied to the final figures only; the standard
    /// deviation is computed from the unrounded mean.
    pub fn from_ages(ages: &[i32]) -> Option<Self> {
        let (min, max) = (min(ages)?, max(ages)?);
        let mean = average(ages);

        Some(Self {
            count: ages.len(),
            average: round2(mean),
            standard_deviation: round2(standard_deviation(ages, mean)),
            median: round2(median(ages)),
            min,
            max,
        })
    }
}
