// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::models::{HealthResponse, KeyResponse, StatsResponse};
use crate::state::AppState;
use crate::stats::format_time;

/// Liveness endpoint.
///
/// Always 200 while the process runs, including in degraded mode; the
/// `degraded` list names what failed at startup.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Service",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        backend: state.attester.backend().kind().to_string(),
        degraded: state.degraded.to_vec(),
    })
}

/// Process counters, plus record totals when the record store is up.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "Service",
    responses(
        (status = 200, description = "Current counters", body = StatsResponse)
    )
)]
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let mut response = StatsResponse {
        start_time: format_time(state.stats.start_time()),
        uptime: state.stats.uptime(),
        requests: state.stats.snapshot(),
        total_users: None,
        total_records: None,
    };

    if let Some(records) = &state.records {
        match records.totals() {
            Ok(totals) => {
                response.total_users = Some(totals.users);
                response.total_records = Some(totals.records);
            }
            Err(e) => tracing::warn!(error = %e, "Record totals unavailable"),
        }
    }

    Json(response)
}

/// Public key and signature chain of the oracle.
#[utoipa::path(
    get,
    path = "/key",
    tag = "Service",
    responses(
        (status = 200, description = "Public identity", body = KeyResponse),
        (status = 503, description = "TEE backend unavailable")
    )
)]
pub async fn key(State(state): State<AppState>) -> Result<Json<KeyResponse>, ApiError> {
    let key = state.attester.key().await?;
    Ok(Json(KeyResponse {
        public_key: key.public_key_hex(),
        signature_chain: key.signature_chain().to_vec(),
    }))
}
