// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client Registry - client management admin backend
//!
//! JWT-authenticated REST service that registers clients, projects their
//! retirement and life-expectancy dates, and reports age statistics.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers and router (Axum)
//! - `auth` - Token codec, credential checks and request identity
//! - `metrics` - Date projections and age statistics
//! - `storage` - Users and clients in an embedded redb database
//! - `tasks` - Background jobs after registration and client creation

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod validation;
