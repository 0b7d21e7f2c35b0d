// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header, HeaderName},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{middleware::resolve_identity, AuthenticatedUser, Role},
    error::{stamp_error_path, ApiError, ErrorBody},
    metrics::ClientProjection,
    models::{
        AdminUserResponse, ClientDetailResponse, ClientMetricsResponse, ClientPage, ClientResponse,
        CreateClientRequest, LoginRequest, LoginResponse, RefreshResponse, RefreshTokenRequest, RegisterRequest,
        RegisterResponse, RegisteredUser, UserSummary,
    },
    state::AppState,
    validation::FieldError,
};

pub mod admin;
pub mod auth;
pub mod clients;
pub mod health;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/refresh", post(auth::refresh))
        .route("/client", get(clients::list_clients).post(clients::create_client))
        .route("/client/metrics", get(clients::client_metrics))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}/enabled", put(admin::set_user_enabled))
        .route("/actuator/health", get(health::health))
        .route("/actuator/health/live", get(health::liveness))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(fallback)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_identity))
        .with_state(state)
        .layer(middleware::from_fn(stamp_error_path))
        .layer(CorsLayer::permissive());

    with_observability(routes)
}

/// Request ids, redacted credentials and request tracing.
///
/// Outermost first: the id is assigned and `Authorization` redacted before
/// the trace span records the request.
fn with_observability(router: Router) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(SetSensitiveRequestHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id));
    router.layer(layers)
}

async fn fallback() -> ApiError {
    ApiError::not_found("No handler for this path")
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::builder().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Client Registry API",
        description = "Client registration with age projections and statistics, behind JWT authentication."
    ),
    paths(
        auth::login,
        auth::register,
        auth::refresh,
        clients::create_client,
        clients::list_clients,
        clients::client_metrics,
        admin::list_users,
        admin::set_user_enabled,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            RegisterRequest,
            RegisterResponse,
            RegisteredUser,
            RefreshTokenRequest,
            RefreshResponse,
            UserSummary,
            CreateClientRequest,
            ClientResponse,
            ClientDetailResponse,
            ClientProjection,
            ClientPage,
            clients::ClientListing,
            ClientMetricsResponse,
            AdminUserResponse,
            admin::SetEnabledRequest,
            AuthenticatedUser,
            Role,
            ErrorBody,
            FieldError,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Auth", description = "Login, registration and token refresh"),
        (name = "Clients", description = "Client registration, listing and age metrics"),
        (name = "Admin", description = "Account management (ADMIN role)"),
        (name = "Health", description = "Liveness and health checks")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials;
    use crate::error::{
        ACCESS_DENIED, AUTHENTICATION_FAILED, BAD_REQUEST, METHOD_NOT_ALLOWED, RESOURCE_NOT_FOUND, VALIDATION_ERROR,
    };
    use crate::state::tests::test_state;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        state: AppState,
    }

    impl TestApp {
        fn new() -> Self {
            let (state, _clock) = test_state();
            Self {
                app: router(state.clone()),
                state,
            }
        }

        async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(json) => {
                    request = request.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };
            self.app.clone().oneshot(request.body(body).unwrap()).await.unwrap()
        }

        async fn register(&self, username: &str) {
            let response = self
                .send(
                    Method::POST,
                    "/auth/register",
                    None,
                    Some(json!({
                        "username": username,
                        "email": format!("{username}@example.com"),
                        "password": "password1",
                        "confirmPassword": "password1",
                        "firstName": "Jane",
                        "lastName": "Roe"
                    })),
                )
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        async fn login(&self, identifier: &str, password: &str) -> Value {
            let response = self
                .send(
                    Method::POST,
                    "/auth/login",
                    None,
                    Some(json!({ "identifier": identifier, "password": password })),
                )
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            body_json(response).await
        }

        async fn user_token(&self) -> String {
            self.register("jroe").await;
            let session = self.login("jroe", "password1").await;
            session["accessToken"].as_str().unwrap().to_string()
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_login_and_list_clients() {
        let app = TestApp::new();
        let token = app.user_token().await;

        let response = app.send(Method::GET, "/client", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = TestApp::new();
        let response = app.send(Method::GET, "/client", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"], AUTHENTICATION_FAILED);
        assert_eq!(body["path"], "/client");
    }

    #[tokio::test]
    async fn tampered_token_is_anonymous() {
        let app = TestApp::new();
        let token = app.user_token().await;
        let signature_start = token.rfind('.').unwrap() + 1;
        let at = signature_start + 10;
        let replacement = if &token[at..=at] == "A" { "B" } else { "A" };
        let mut tampered = token.clone();
        tampered.replace_range(at..=at, replacement);

        let response = app.send(Method::GET, "/client/metrics", Some(&tampered), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_client_then_list_with_projection() {
        let app = TestApp::new();
        let token = app.user_token().await;

        let response = app
            .send(
                Method::POST,
                "/client",
                Some(&token),
                Some(json!({ "name": "Maria", "lastName": "Lopez", "age": 40, "birthDate": "1986-10-19" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["fullName"], "Maria Lopez");
        assert!(created.get("calculatedCurrentAge").is_none());

        let listing = body_json(app.send(Method::GET, "/client", Some(&token), None).await).await;
        assert_eq!(listing[0]["calculatedCurrentAge"], 40);
        assert_eq!(listing[0]["estimatedRetirementDate"], "2051-10-19");

        let page = body_json(app.send(Method::GET, "/client?page=0&size=10", Some(&token), None).await).await;
        assert_eq!(page["totalElements"], 1);
        assert_eq!(page["totalPages"], 1);
        assert_eq!(page["content"][0]["id"], created["id"]);
    }

    #[tokio::test]
    async fn inconsistent_age_is_422_with_path() {
        let app = TestApp::new();
        let token = app.user_token().await;

        let response = app
            .send(
                Method::POST,
                "/client",
                Some(&token),
                Some(json!({ "name": "Maria", "lastName": "Lopez", "age": 25, "birthDate": "1986-10-19" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["error"], VALIDATION_ERROR);
        assert_eq!(body["path"], "/client");
        assert_eq!(body["fieldErrors"][0]["field"], "age");
        assert_eq!(body["fieldErrors"][0]["rejectedValue"], 25);
    }

    #[tokio::test]
    async fn malformed_body_and_query_are_400() {
        let app = TestApp::new();
        let token = app.user_token().await;

        let response = app
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/client")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"name\":"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], BAD_REQUEST);

        let response = app.send(Method::GET, "/client?page=first", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_of_empty_registry() {
        let app = TestApp::new();
        let token = app.user_token().await;

        let body = body_json(app.send(Method::GET, "/client/metrics", Some(&token), None).await).await;
        assert_eq!(body["totalClients"], 0);
        assert!(body["minAge"].is_null());
        assert!(body["maxAge"].is_null());
    }

    #[tokio::test]
    async fn admin_routes_require_admin_role() {
        let app = TestApp::new();
        let user_token = app.user_token().await;

        let response = app.send(Method::GET, "/admin/users", Some(&user_token), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], ACCESS_DENIED);

        credentials::ensure_admin(&app.state.db, "root", "root@example.com", "rootpass1").unwrap();
        let session = app.login("root", "rootpass1").await;
        let admin_token = session["accessToken"].as_str().unwrap();

        let response = app.send(Method::GET, "/admin/users", Some(admin_token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let users = body_json(response).await;
        assert_eq!(users.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn bad_path_param_is_json_400() {
        let app = TestApp::new();
        credentials::ensure_admin(&app.state.db, "root", "root@example.com", "rootpass1").unwrap();
        let session = app.login("root", "rootpass1").await;
        let admin_token = session["accessToken"].as_str().unwrap();

        let response = app
            .send(
                Method::PUT,
                "/admin/users/abc/enabled",
                Some(admin_token),
                Some(json!({ "enabled": false })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = body_json(response).await;
        assert_eq!(body["error"], BAD_REQUEST);
        assert_eq!(body["path"], "/admin/users/abc/enabled");
    }

    #[tokio::test]
    async fn unsupported_method_is_json_405() {
        let app = TestApp::new();
        let token = app.user_token().await;

        let response = app.send(Method::DELETE, "/client", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = body_json(response).await;
        assert_eq!(body["error"], METHOD_NOT_ALLOWED);
        assert_eq!(body["status"], 405);
        assert_eq!(body["path"], "/client");
    }

    #[tokio::test]
    async fn refresh_round_trip() {
        let app = TestApp::new();
        app.register("jroe").await;
        let session = app.login("jroe", "password1").await;

        let response = app
            .send(
                Method::POST,
                "/auth/refresh",
                None,
                Some(json!({ "refreshToken": session["refreshToken"] })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let refreshed = body_json(response).await;
        assert_eq!(refreshed["tokenType"], "Bearer");

        let token = refreshed["accessToken"].as_str().unwrap();
        let response = app.send(Method::GET, "/client", Some(token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_register_fields_are_reported() {
        let app = TestApp::new();
        let response = app
            .send(Method::POST, "/auth/register", None, Some(json!({ "username": "jroe" })))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        let fields: Vec<_> = body["fieldErrors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap().to_string())
            .collect();
        assert!(fields.contains(&"email".to_string()));
        assert!(fields.contains(&"password".to_string()));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = TestApp::new();
        let response = app.send(Method::GET, "/nope", None, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"], RESOURCE_NOT_FOUND);
        assert_eq!(body["path"], "/nope");
    }

    #[tokio::test]
    async fn health_and_docs_are_public() {
        let app = TestApp::new();

        let response = app.send(Method::GET, "/actuator/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "UP");

        let response = app.send(Method::GET, "/api-docs/openapi.json", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"]["/client"].is_object());
        assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let app = TestApp::new();
        let response = app.send(Method::GET, "/actuator/health/live", None, None).await;
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let response = app
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/actuator/health/live")
                    .header(REQUEST_ID_HEADER, "trace-me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-me");
    }
}
