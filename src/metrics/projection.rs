// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Age-based date projections.
//!
//! Every function takes the "as-of" date explicitly so results are
//! reproducible in tests. Year arithmetic follows calendar rules: adding
//! years to Feb 29 lands on Feb 28 when the target year is not a leap year.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

/// Age at which a client is considered retired.
pub const RETIREMENT_AGE: i32 = 65;

/// Average life expectancy in years.
pub const AVERAGE_LIFE_EXPECTANCY: i32 = 78;

/// Years granted beyond `today` once a client has outlived the average.
pub const EXTENDED_LIFE_YEARS: i32 = 5;

/// Whole years elapsed between `birth_date` and `today`.
///
/// A birthday that has not yet occurred this year does not count. A birth
/// date after `today` yields a negative age.
pub fn current_age(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    if birth_date > today {
        return -current_age(today, birth_date);
    }

    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    years
}

/// Estimated retirement date.
///
/// Clients at or past [`RETIREMENT_AGE`] are already retired, so `today` is
/// returned instead of a past date.
pub fn retirement_date(birth_date: NaiveDate, today: NaiveDate) -> NaiveDate {
    let age = current_age(birth_date, today);
    if age >= RETIREMENT_AGE {
        tracing::debug!(age, "client already reached retirement age");
        return today;
    }
    add_years(today, RETIREMENT_AGE - age)
}

/// Estimated life-expectancy date.
///
/// Clients at or past [`AVERAGE_LIFE_EXPECTANCY`] get `today` plus
/// [`EXTENDED_LIFE_YEARS`].
pub fn life_expectancy_date(birth_date: NaiveDate, today: NaiveDate) -> NaiveDate {
    let age = current_age(birth_date, today);
    if age >= AVERAGE_LIFE_EXPECTANCY {
        tracing::debug!(
            age,
            extension = EXTENDED_LIFE_YEARS,
            "client exceeded average life expectancy"
        );
        return add_years(today, EXTENDED_LIFE_YEARS);
    }
    add_years(today, AVERAGE_LIFE_EXPECTANCY - age)
}

/// Years left until [`RETIREMENT_AGE`], never negative.
pub fn years_to_retirement(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    (RETIREMENT_AGE - current_age(birth_date, today)).max(0)
}

/// Years left until [`AVERAGE_LIFE_EXPECTANCY`], never negative.
pub fn remaining_years(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    (AVERAGE_LIFE_EXPECTANCY - current_age(birth_date, today)).max(0)
}

fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    let months = Months::new(years.max(0).unsigned_abs() * 12);
    date.checked_add_months(months).unwrap_or(NaiveDate::MAX)
}

/// All projections for one client, computed against the same `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientProjection {
    pub calculated_current_age: i32,
    pub estimated_retirement_date: NaiveDate,
    pub estimated_life_expectancy: NaiveDate,
    pub years_to_retirement: i32,
    pub estimated_remaining_years: i32,
}

impl ClientProjection {
    pub fn compute(birth_date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            calculated_current_age: current_age(birth_date, today),
            estimated_retirement_date: retirement_date(birth_date, today),
            estimated_life_expectancy: life_expectancy_date(birth_date, today),
            years_to_retirement: years_to_retirement(birth_date, today),
            estimated_remaining_years: remaining_years(birth_date, today),
        }
    }
}
