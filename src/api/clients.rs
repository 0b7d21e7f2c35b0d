// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client registration, listing and age metrics.
//!
//! Listings carry projections computed for the current date, so cached pages
//! are keyed by that date and the cache is cleared whenever a client is added.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    error::{ApiError, JsonBody, QueryParams},
    metrics::AgeSummary,
    models::{ClientDetailResponse, ClientMetricsResponse, ClientPage, ClientResponse, CreateClientRequest, PageQuery},
    state::AppState,
    storage::NewClient,
    tasks::Job,
    validation::{check_age_consistency, validate_client, FieldError},
};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// `GET /client` body: the full list, or one page when `page`/`size` is given.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ClientListing {
    All(Vec<ClientDetailResponse>),
    Page(ClientPage),
}

#[utoipa::path(
    post,
    path = "/client",
    request_body = CreateClientRequest,
    tag = "Clients",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = ClientResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid client or inconsistent age", body = crate::error::ErrorBody)
    )
)]
pub async fn create_client(
    Auth(user): Auth,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), ApiError> {
    let today = state.clock.today();
    ApiError::check(validate_client(&request, today))?;

    let (Some(age), Some(birth_date)) = (request.age, request.birth_date) else {
        return Err(ApiError::validation(Vec::new()));
    };
    check_age_consistency(age, birth_date, today)
        .map_err(|mismatch| ApiError::unprocessable(mismatch.to_string(), vec![mismatch.field_error()]))?;

    let client = state.db.clients().create(NewClient {
        name: request.name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        age,
        birth_date,
    })?;
    state.page_cache.clear();

    info!(client_id = client.id, created_by = %user.username, "client created");
    state.tasks.enqueue(Job::ProcessNewClient { client_id: client.id });

    Ok((StatusCode::CREATED, Json(ClientResponse::from(&client))))
}

#[utoipa::path(
    get,
    path = "/client",
    params(PageQuery),
    tag = "Clients",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ClientListing),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid page size", body = crate::error::ErrorBody)
    )
)]
pub async fn list_clients(
    Auth(_user): Auth,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<ClientListing>, ApiError> {
    let today = state.clock.today();

    if !query.is_paged() {
        let key = (today, None);
        if let Some(cached) = state.page_cache.get(&key) {
            debug!("client listing served from cache");
            return Ok(Json(ClientListing::All(cached.content)));
        }

        let generation = state.page_cache.generation();
        let content: Vec<_> = state
            .db
            .clients()
            .list()?
            .iter()
            .map(|client| ClientDetailResponse::build(client, today))
            .collect();
        let total = content.len() as u64;
        state.page_cache.put(
            key,
            ClientPage {
                content: content.clone(),
                page: 0,
                size: total,
                total_elements: total,
                total_pages: u64::from(total > 0),
            },
            generation,
        );
        return Ok(Json(ClientListing::All(content)));
    }

    let page = query.page.unwrap_or(0);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&size) {
        return Err(ApiError::validation(vec![FieldError::new(
            "size",
            size,
            "Page size must be between 1 and 100",
        )]));
    }

    let key = (today, Some((page, size)));
    if let Some(cached) = state.page_cache.get(&key) {
        debug!(page, size, "client page served from cache");
        return Ok(Json(ClientListing::Page(cached)));
    }

    let generation = state.page_cache.generation();
    let (clients, total) = state.db.clients().list_page(page, size)?;
    let listing = ClientPage {
        content: clients
            .iter()
            .map(|client| ClientDetailResponse::build(client, today))
            .collect(),
        page,
        size,
        total_elements: total,
        total_pages: total.div_ceil(size),
    };
    state.page_cache.put(key, listing.clone(), generation);
    Ok(Json(ClientListing::Page(listing)))
}

#[utoipa::path(
    get,
    path = "/client/metrics",
    tag = "Clients",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ClientMetricsResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody)
    )
)]
pub async fn client_metrics(
    Auth(_user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ClientMetricsResponse>, ApiError> {
    let ages = state.db.clients().all_ages_sorted()?;

    let metrics = match AgeSummary::from_ages(&ages) {
        Some(summary) => ClientMetricsResponse {
            total_clients: summary.count as u64,
            average_age: summary.average,
            standard_deviation_age: summary.standard_deviation,
            min_age: Some(summary.min),
            max_age: Some(summary.max),
            median_age: summary.median,
        },
        None => ClientMetricsResponse {
            total_clients: 0,
            average_age: 0.0,
            standard_deviation_age: 0.0,
            min_age: None,
            max_age: None,
            median_age: 0.0,
        },
    };
    Ok(Json(metrics))
}
