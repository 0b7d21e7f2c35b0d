// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only account management.
//!
//! Every handler takes [`AdminOnly`], so callers without the ADMIN role get
//! `403 ACCESS_DENIED` before any storage access.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::AdminOnly,
    error::{ApiError, JsonBody, PathParam},
    models::AdminUserResponse,
    state::AppState,
};

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

/// List every registered account.
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = Vec<AdminUserResponse>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody)
    )
)]
pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminUserResponse>>, ApiError> {
    let users = state.db.users().list()?;
    Ok(Json(users.iter().map(AdminUserResponse::from).collect()))
}

/// Enable or disable an account. Disabled accounts cannot log in or refresh.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/enabled",
    tag = "Admin",
    params(("id" = u64, Path, description = "Account id")),
    request_body = SetEnabledRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = AdminUserResponse),
        (status = 400, description = "Invalid account id or self-disable", body = crate::error::ErrorBody),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
        (status = 404, description = "No such account", body = crate::error::ErrorBody)
    )
)]
pub async fn set_user_enabled(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    PathParam(id): PathParam<u64>,
    JsonBody(request): JsonBody<SetEnabledRequest>,
) -> Result<Json<AdminUserResponse>, ApiError> {
    if id == admin.user_id && !request.enabled {
        return Err(ApiError::bad_request("Administrators cannot disable their own account"));
    }

    let user = state.db.users().set_enabled(id, request.enabled)?;
    info!(user_id = id, enabled = request.enabled, by = %admin.username, "account status changed");
    Ok(Json(AdminUserResponse::from(&user)))
}
