// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Derived Client Metrics
//!
//! Pure calculation engines used by the client endpoints:
//!
//! - `projection` - age and future-date projections from a birth date
//! - `statistics` - aggregate statistics over the client age population
//!
//! Nothing in here reads the clock or touches storage. Callers pass the
//! "as-of" date and the raw ages explicitly.

pub mod projection;
pub mod statistics;

pub use projection::ClientProjection;
pub use statistics::AgeSummary;
