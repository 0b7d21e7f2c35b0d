// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, registration and token refresh.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::{
    auth::{
        credentials::{self, Registration},
        CredentialError, Role, TokenKind,
    },
    error::{ApiError, JsonBody},
    models::{
        LoginRequest, LoginResponse, RefreshResponse, RefreshTokenRequest, RegisterRequest, RegisterResponse,
        RegisteredUser, UserSummary, BEARER,
    },
    state::AppState,
    tasks::Job,
    validation::{validate_login, validate_refresh, validate_register},
};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, body = LoginResponse),
        (status = 401, description = "Bad credentials or disabled account", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    ApiError::check(validate_login(&request))?;

    let LoginRequest {
        identifier,
        password,
        remember_me,
    } = request;

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || credentials::authenticate(&db, &identifier, &password)).await??;
    let pair = state.tokens.issue_pair(&user)?;

    info!(user_id = user.id, remember_me, "user logged in");

    Ok(Json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: BEARER.to_string(),
        expires_in: state.tokens.access_expires_in_secs(),
        user: UserSummary::from(&user),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, body = RegisterResponse),
        (status = 409, description = "Username or email already taken", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    ApiError::check(validate_register(&request))?;

    let registration = Registration {
        username: request.username,
        email: request.email,
        password: request.password,
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        role: Role::User,
    };

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || credentials::register(&db, registration)).await??;

    state.tasks.enqueue(Job::WelcomeUser {
        user_id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
    });

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: RegisteredUser::from(&user),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshTokenRequest,
    tag = "Auth",
    responses(
        (status = 200, body = RefreshResponse),
        (status = 401, description = "Refresh token invalid or expired", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RefreshTokenRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    ApiError::check(validate_refresh(&request))?;
    let token = request.refresh_token.trim();

    let claims = state.tokens.parse_claims(token)?;
    if claims.token_type != TokenKind::Refresh {
        return Err(ApiError::invalid_token("Invalid token: a refresh token is required"));
    }

    let user = match credentials::find_by_identifier(&state.db, &claims.sub) {
        Ok(user) => user,
        Err(CredentialError::NotFound(_)) => {
            return Err(ApiError::invalid_token("Invalid token: account no longer exists"));
        }
        Err(e) => return Err(e.into()),
    };
    if !state.tokens.is_valid(token, &user) {
        return Err(ApiError::invalid_token("Invalid token"));
    }
    if !user.enabled {
        return Err(CredentialError::Disabled.into());
    }

    let pair = state.tokens.issue_pair(&user)?;
    info!(user_id = user.id, "tokens refreshed");

    Ok(Json(RefreshResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: BEARER.to_string(),
        expires_in: state.tokens.access_expires_in_secs(),
    }))
}
