// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Prefix applied to role names to form authority strings.
pub const AUTHORITY_PREFIX: &str = "ROLE_";

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Full access, including the `/admin` endpoints
/// - `User` - Regular account, can manage and query clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Regular user (default for registrations)
    #[default]
    User,
}

impl Role {
    /// Role name as stored and carried in the `userRole` claim.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    /// Authority string used for coarse-grained access control.
    pub fn authority(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::User => "ROLE_USER",
        }
    }

    /// Authority list granted by this role.
    pub fn authorities(&self) -> Vec<String> {
        vec![self.authority().to_string()]
    }

    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::User, Role::User) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
