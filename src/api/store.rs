// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};

use super::extract::{require_non_empty, JsonBody};
use crate::{
    auth::Auth,
    error::ApiError,
    models::{PutStoreRequest, StoreKeysResponse, StoreValueResponse, WriteResponse},
    state::AppState,
    stats::Counter,
};

#[utoipa::path(
    post,
    path = "/store",
    request_body = PutStoreRequest,
    tag = "Store",
    security(("bearer" = [])),
    responses(
        (status = 200, body = WriteResponse),
        (status = 400, description = "Missing key or value"),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Local store unavailable")
    )
)]
pub async fn put_value(
    Auth(_user): Auth,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PutStoreRequest>,
) -> Result<Json<WriteResponse>, ApiError> {
    require_non_empty("key", &request.key)?;
    let value = request
        .value
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::bad_request("value required"))?;

    let store = state.local_store()?;
    store.put(request.key.clone(), value).await?;
    state.stats.record(Counter::StoreWrites);

    tracing::info!(key = %request.key, "Stored value");
    Ok(Json(WriteResponse {
        ok: true,
        key: request.key,
    }))
}

/// List keys only; values are never listed.
#[utoipa::path(
    get,
    path = "/store",
    tag = "Store",
    security(("bearer" = [])),
    responses(
        (status = 200, body = StoreKeysResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Local store unavailable")
    )
)]
pub async fn list_keys(
    Auth(_user): Auth,
    State(state): State<AppState>,
) -> Result<Json<StoreKeysResponse>, ApiError> {
    let store = state.local_store()?;
    state.stats.record(Counter::StoreReads);
    let keys = store.list().await;
    Ok(Json(StoreKeysResponse {
        count: keys.len(),
        keys,
    }))
}

#[utoipa::path(
    get,
    path = "/store/{key}",
    params(
        ("key" = String, Path, description = "Store key")
    ),
    tag = "Store",
    security(("bearer" = [])),
    responses(
        (status = 200, body = StoreValueResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Key not found"),
        (status = 503, description = "Local store unavailable")
    )
)]
pub async fn get_value(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<StoreValueResponse>, ApiError> {
    let store = state.local_store()?;
    state.stats.record(Counter::StoreReads);
    let value = store.get(&key).await?;
    Ok(Json(StoreValueResponse { key, value }))
}
