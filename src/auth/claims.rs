// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::StoredUser;

/// Which validity window a token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by every token this server issues.
///
/// The claim set is a snapshot of the user at issuance time; later changes to
/// the account are not reflected until a new token is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,

    /// Issued at, seconds since epoch
    pub iat: i64,

    /// Expiration, seconds since epoch (floor of `exp_ms`)
    pub exp: i64,

    /// Expiration, milliseconds since epoch. Expiry is checked against this.
    pub exp_ms: i64,

    /// Authority strings, e.g. `["ROLE_USER"]`
    pub authorities: Vec<String>,

    pub user_id: u64,

    /// Role name, e.g. `"ADMIN"`
    pub user_role: String,

    pub full_name: String,

    pub enabled: bool,

    pub token_type: TokenKind,
}

/// Authenticated user attached to the request by the identity middleware.
///
/// Built from the freshly loaded account, not from token claims.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: u64,

    pub username: String,

    pub email: String,

    pub full_name: String,

    pub role: Role,

    pub enabled: bool,

    pub authorities: Vec<String>,
}

impl AuthenticatedUser {
    pub fn from_stored(user: &StoredUser) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name(),
            role: user.role,
            enabled: user.enabled,
            authorities: user.role.authorities(),
        }
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }
}
