// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `ToSchema` for OpenAPI documentation and
//! use camelCase field names on the wire.
//!
//! Request bodies default every field, so a missing field reaches validation
//! and is reported as a field error instead of a JSON parse failure.
//!
//! ## Model Categories
//!
//! - **Auth**: Login, registration and token refresh
//! - **Clients**: Client records, projections and pages
//! - **Metrics**: Age statistics across all clients
//! - **Admin**: Account listing

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::Role;
use crate::metrics::ClientProjection;
use crate::storage::{StoredClient, StoredUser};

/// Token type reported to clients.
pub const BEARER: &str = "Bearer";

// =============================================================================
// Auth Models
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    /// Username or email address.
    pub identifier: String,
    pub password: String,
    /// Accepted for client compatibility; does not change token lifetimes.
    pub remember_me: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Account summary embedded in the login response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl From<&StoredUser> for UserSummary {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserSummary,
}

/// Newly created account as returned by registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub enabled: bool,
}

impl From<&StoredUser> for RegisteredUser {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name(),
            role: user.role,
            enabled: user.enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: RegisteredUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

// =============================================================================
// Client Models
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateClientRequest {
    pub name: String,
    pub last_name: String,
    /// Reported age; must agree with `birthDate` within one year.
    pub age: Option<i32>,
    /// ISO date, `YYYY-MM-DD`.
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: u64,
    pub name: String,
    pub last_name: String,
    pub full_name: String,
    pub age: i32,
    pub birth_date: NaiveDate,
    pub creation_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
}

impl From<&StoredClient> for ClientResponse {
    fn from(client: &StoredClient) -> Self {
        Self {
            id: client.id,
            name: client.name.clone(),
            last_name: client.last_name.clone(),
            full_name: client.full_name(),
            age: client.age,
            birth_date: client.birth_date,
            creation_date: client.created_at,
            update_date: client.updated_at,
        }
    }
}

/// Client record plus projections computed for the request date.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ClientDetailResponse {
    #[serde(flatten)]
    pub client: ClientResponse,
    #[serde(flatten)]
    pub projection: ClientProjection,
}

impl ClientDetailResponse {
    pub fn build(client: &StoredClient, today: NaiveDate) -> Self {
        Self {
            client: ClientResponse::from(client),
            projection: ClientProjection::compute(client.birth_date, today),
        }
    }
}

/// Pagination parameters for `GET /client`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Zero-based page index.
    pub page: Option<u64>,
    /// Page size, 1 to 100. Defaults to 20.
    pub size: Option<u64>,
}

impl PageQuery {
    /// `true` when the caller asked for a page rather than the full list.
    pub fn is_paged(&self) -> bool {
        self.page.is_some() || self.size.is_some()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientPage {
    pub content: Vec<ClientDetailResponse>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

// =============================================================================
// Metrics Models
// =============================================================================

/// Age statistics across every client.
///
/// `minAge` and `maxAge` are `null` when there are no clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetricsResponse {
    pub total_clients: u64,
    pub average_age: f64,
    pub standard_deviation_age: f64,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub median_age: f64,
}

// =============================================================================
// Admin Models
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserResponse {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredUser> for AdminUserResponse {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name(),
            role: user.role,
            enabled: user.enabled,
            created_at: user.created_at,
        }
    }
}
