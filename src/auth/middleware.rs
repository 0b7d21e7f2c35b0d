// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request identity middleware.
//!
//! Runs once per request. When a valid bearer token names an existing
//! account, an [`AuthenticatedUser`] is inserted into the request extensions.
//! The middleware never rejects a request: a missing or bad token simply
//! leaves the request anonymous, and the `Auth` extractor decides whether the
//! route needs an identity.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/client", get(list_clients))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), resolve_identity))
//!     .with_state(state);
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use super::{credentials, AuthenticatedUser, TokenKind};
use crate::auth::error::CredentialError;
use crate::state::AppState;

/// Path prefixes that never carry an identity.
pub const PUBLIC_PATH_PREFIXES: &[&str] = &["/auth/", "/swagger-ui", "/api-docs/", "/actuator/"];

/// Exact paths that never carry an identity.
pub const PUBLIC_PATHS: &[&str] = &["/error"];

const BEARER_PREFIX: &str = "Bearer ";

/// `true` if `path` skips identity resolution.
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PATH_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Bearer token from the `Authorization` header, if well-formed.
pub fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

/// Attach the caller's identity to the request when the token checks out.
pub async fn resolve_identity(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    if request.extensions().get::<AuthenticatedUser>().is_some() {
        return next.run(request).await;
    }

    match identify(&state, &request) {
        Some(user) => {
            tracing::debug!(user_id = user.user_id, "request authenticated");
            request.extensions_mut().insert(user);
        }
        None => {
            request.extensions_mut().remove::<AuthenticatedUser>();
        }
    }

    next.run(request).await
}

fn identify(state: &AppState, request: &Request) -> Option<AuthenticatedUser> {
    let token = bearer_token(request)?;

    let claims = match state.tokens.parse_claims(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unusable bearer token");
            return None;
        }
    };
    if claims.sub.is_empty() {
        return None;
    }
    if claims.token_type != TokenKind::Access {
        tracing::debug!("refresh token presented as bearer credential");
        return None;
    }

    let user = match credentials::find_by_identifier(&state.db, &claims.sub) {
        Ok(user) => user,
        Err(CredentialError::NotFound(_)) => {
            tracing::debug!("token subject does not match any account");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, "identity lookup failed");
            return None;
        }
    };

    if !state.tokens.is_valid(token, &user) {
        tracing::debug!(user_id = user.id, "token does not belong to resolved account");
        return None;
    }

    Some(AuthenticatedUser::from_stored(&user))
}
