// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use super::extract::JsonBody;
use crate::{
    attestation::{AttestedFetch, FetchError, Report},
    auth::Auth,
    error::ApiError,
    models::FetchRequest,
    state::AppState,
    stats::Counter,
};

/// Fetch an HTTPS URL from inside the enclave and attest the response.
#[utoipa::path(
    post,
    path = "/fetch",
    request_body = FetchRequest,
    tag = "Attestation",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Attested response", body = AttestedFetch),
        (status = 400, description = "URL is not https"),
        (status = 401, description = "Missing or invalid token"),
        (status = 502, description = "Upstream or TEE backend failed")
    )
)]
pub async fn fetch(
    Auth(user): Auth,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<FetchRequest>,
) -> Result<Json<AttestedFetch>, ApiError> {
    let result = state.fetcher.fetch(&request.url, &state.attester).await;
    if !matches!(result, Err(FetchError::InvalidUrl)) {
        state.stats.record(Counter::FetchRequests);
    }
    tracing::debug!(subject = %user.subject, url = %request.url, "Fetch requested");
    Ok(Json(result?))
}

/// Quote-backed, signed report over the current counters.
#[utoipa::path(
    get,
    path = "/report",
    tag = "Attestation",
    responses(
        (status = 200, description = "Exit report", body = Report),
        (status = 502, description = "TEE backend unavailable")
    )
)]
pub async fn report(State(state): State<AppState>) -> Result<Json<Report>, ApiError> {
    let kv_entries = match &state.local_store {
        Some(store) => store.len().await,
        None => 0,
    };
    let report = state.attester.report(&state.stats, kv_entries).await?;
    Ok(Json(report))
}
