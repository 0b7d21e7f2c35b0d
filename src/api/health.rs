// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// `"UP"` or `"DOWN"`.
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    pub database: String,
    /// Jobs waiting in the background queue are not reported; these are
    /// lifetime counters.
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_dropped: u64,
}

/// Liveness check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Returns 200 if the database answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/actuator/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Database unavailable", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let database_ok = match state.db.ping() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            false
        }
    };

    let stats = state.tasks.stats();
    let response = ReadyResponse {
        status: if database_ok { "UP" } else { "DOWN" }.to_string(),
        checks: HealthChecks {
            service: "UP".to_string(),
            database: if database_ok { "UP" } else { "DOWN" }.to_string(),
            tasks_completed: stats.completed(),
            tasks_failed: stats.failed(),
            tasks_dropped: stats.dropped(),
        },
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Always 200 while the process is running.
#[utoipa::path(
    get,
    path = "/actuator/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
    })
}
