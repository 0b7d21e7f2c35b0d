// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! [`TokenError`] and [`CredentialError`] stay inside the auth boundary or
//! are converted to an [`ApiError`](crate::error::ApiError) by handlers.
//! [`AuthError`] is the rejection type of the authorization extractors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::storage::StorageError;

/// Why a token could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,

    #[error("token is malformed")]
    Malformed,

    #[error("token uses an unsupported algorithm or type")]
    Unsupported,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// Credential verification and registration failures.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Unknown identifier or wrong password. Deliberately indistinguishable.
    #[error("invalid username or password")]
    BadCredentials,

    #[error("account is disabled")]
    Disabled,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("no user matches identifier {0}")]
    NotFound(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Rejection produced by the `Auth` and `AdminOnly` extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No identity was attached to the request
    Unauthenticated,
    /// Identity is present but lacks the required role
    InsufficientPermissions,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "AUTHENTICATION_FAILED",
            AuthError::InsufficientPermissions => "ACCESS_DENIED",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Unauthenticated => {
                write!(f, "Full authentication is required to access this resource")
            }
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
