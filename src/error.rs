// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error responses.
//!
//! Every failure leaving a handler is an [`ApiError`]. Its body carries the
//! request path, which the handler does not know; [`stamp_error_path`] fills
//! it in on the way out.

use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AuthError, CredentialError, TokenError};
use crate::storage::StorageError;
use crate::validation::FieldError;

pub const AUTHENTICATION_FAILED: &str = "AUTHENTICATION_FAILED";
pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const RESOURCE_CONFLICT: &str = "RESOURCE_CONFLICT";
pub const RESOURCE_NOT_FOUND: &str = "RESOURCE_NOT_FOUND";
pub const ACCESS_DENIED: &str = "ACCESS_DENIED";
pub const BAD_REQUEST: &str = "BAD_REQUEST";
pub const METHOD_NOT_ALLOWED: &str = "METHOD_NOT_ALLOWED";
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub field_errors: Vec<FieldError>,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: u16,
    /// Stable error code, e.g. `VALIDATION_ERROR`.
    pub error: String,
    pub message: String,
    pub path: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            field_errors: Vec::new(),
        }
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, AUTHENTICATION_FAILED, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, INVALID_TOKEN, message)
    }

    pub fn validation(field_errors: Vec<FieldError>) -> Self {
        Self {
            field_errors,
            ..Self::new(StatusCode::UNPROCESSABLE_ENTITY, VALIDATION_ERROR, "Validation failed")
        }
    }

    /// Validation failure with a specific message.
    pub fn unprocessable(message: impl Into<String>, field_errors: Vec<FieldError>) -> Self {
        Self {
            field_errors,
            ..Self::new(StatusCode::UNPROCESSABLE_ENTITY, VALIDATION_ERROR, message)
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, RESOURCE_CONFLICT, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, RESOURCE_NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ACCESS_DENIED, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, BAD_REQUEST, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            METHOD_NOT_ALLOWED,
            "Request method is not supported for this path",
        )
    }

    /// Unexpected failure. `detail` is logged, never returned.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "unexpected error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_SERVER_ERROR,
            "An unexpected error occurred",
        )
    }

    /// Reject with [`ApiError::validation`] unless `field_errors` is empty.
    pub fn check(field_errors: Vec<FieldError>) -> Result<(), ApiError> {
        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(Self::validation(field_errors))
        }
    }

    fn body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status.as_u16(),
            error: self.code.to_string(),
            message: self.message.clone(),
            path: String::new(),
            timestamp: Utc::now(),
            field_errors: self.field_errors.clone(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.body();
        let mut response = (self.status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(detail) => Self::internal(detail),
            other => Self::invalid_token(format!("Invalid token: {other}")),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::BadCredentials => Self::authentication_failed("Invalid username or password"),
            CredentialError::Disabled => Self::authentication_failed("Account is disabled"),
            CredentialError::DuplicateUsername | CredentialError::DuplicateEmail => {
                Self::conflict(err.to_string())
            }
            CredentialError::NotFound(_) => Self::not_found("User not found"),
            CredentialError::Hashing(detail) => Self::internal(detail),
            CredentialError::Storage(e) => e.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::not_found(format!("{what} not found")),
            StorageError::AlreadyExists(what) => Self::conflict(format!("{what} already exists")),
            other => Self::internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Malformed request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(e) => {
                Self::bad_request(format!("Invalid path parameter: {}", e.body_text()))
            }
            other => Self::internal(other.body_text()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(err)
    }
}

/// JSON body extractor whose rejection is an [`ApiError`].
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Query string extractor whose rejection is an [`ApiError`].
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// Path parameter extractor whose rejection is an [`ApiError`].
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

/// Middleware that writes the request path into error bodies.
pub async fn stamp_error_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let Some(body) = response.extensions().get::<ErrorBody>().cloned() else {
        return response;
    };
    let stamped = ErrorBody { path, ..body };
    let Ok(bytes) = serde_json::to_vec(&stamped) else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.extensions.insert(stamped);
    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn constructors_set_status_and_code() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.code, RESOURCE_NOT_FOUND);
        assert_eq!(nf.message, "missing");

        assert_eq!(ApiError::bad_request("bad").status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("dup").status, StatusCode::CONFLICT);
        assert_eq!(ApiError::forbidden("no").code, ACCESS_DENIED);
        assert_eq!(ApiError::invalid_token("x").code, INVALID_TOKEN);
        assert_eq!(ApiError::authentication_failed("x").status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_hides_detail() {
        let err = ApiError::internal("disk on fire");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn credential_errors_map_to_statuses() {
        assert_eq!(ApiError::from(CredentialError::BadCredentials).status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(CredentialError::Disabled).status, StatusCode::UNAUTHORIZED);
        let dup = ApiError::from(CredentialError::DuplicateEmail);
        assert_eq!(dup.status, StatusCode::CONFLICT);
        assert_eq!(dup.message, "Email already exists");
    }

    #[test]
    fn token_errors_are_invalid_token() {
        let err = ApiError::from(TokenError::Expired);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code, INVALID_TOKEN);
    }

    #[test]
    fn check_passes_only_without_errors() {
        assert!(ApiError::check(Vec::new()).is_ok());
        let err = ApiError::check(vec![FieldError::new("age", 3, "too young")]).unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.field_errors.len(), 1);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::validation(vec![FieldError::new("name", "", "Name is required")]).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["status"], 422);
        assert_eq!(body["error"], VALIDATION_ERROR);
        assert_eq!(body["fieldErrors"][0]["field"], "name");
        assert_eq!(body["fieldErrors"][0]["rejectedValue"], "");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn field_errors_omitted_when_empty() {
        let body = body_json(ApiError::not_found("gone").into_response()).await;
        assert!(body.get("fieldErrors").is_none());
    }

    #[tokio::test]
    async fn stamp_error_path_fills_in_path() {
        async fn failing() -> Result<String, ApiError> {
            Err(ApiError::conflict("taken"))
        }
        async fn fine() -> &'static str {
            "ok"
        }

        let app = Router::new()
            .route("/things/{id}", get(failing))
            .route("/ok", get(fine))
            .layer(middleware::from_fn(stamp_error_path));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/things/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["path"], "/things/7");
        assert_eq!(body["message"], "taken");

        let response = app
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        async fn echo(JsonBody(value): JsonBody<serde_json::Value>) -> Json<serde_json::Value> {
            Json(value)
        }
        let app = Router::new()
            .route("/echo", axum::routing::post(echo))
            .layer(middleware::from_fn(stamp_error_path));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], BAD_REQUEST);
        assert_eq!(body["path"], "/echo");
    }

    #[tokio::test]
    async fn unparseable_path_param_is_bad_request() {
        async fn show(PathParam(id): PathParam<u64>) -> String {
            id.to_string()
        }
        let app = Router::new()
            .route("/things/{id}", get(show))
            .layer(middleware::from_fn(stamp_error_path));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/things/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], BAD_REQUEST);
        assert_eq!(body["path"], "/things/abc");
        assert!(body["message"].as_str().unwrap().starts_with("Invalid path parameter"));

        let response = app
            .oneshot(Request::builder().uri("/things/12").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"12");
    }
}
