// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use super::extract::{require_non_empty, JsonBody, QueryParams};
use crate::{
    auth::Auth,
    error::ApiError,
    models::{PutRecordRequest, RecordListResponse, RecordQuery, RecordValueResponse, WriteResponse},
    state::AppState,
    stats::Counter,
};

/// Plaintext stored for a record value.
fn record_plaintext(value: Option<Value>) -> Result<String, ApiError> {
    match value {
        None | Some(Value::Null) => Err(ApiError::bad_request("value required")),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Ok(other.to_string()),
    }
}

#[utoipa::path(
    post,
    path = "/records",
    request_body = PutRecordRequest,
    tag = "Records",
    security(("bearer" = [])),
    responses(
        (status = 200, body = WriteResponse),
        (status = 400, description = "Missing userId, key or value"),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Record store unavailable")
    )
)]
pub async fn put_record(
    Auth(_user): Auth,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PutRecordRequest>,
) -> Result<Json<WriteResponse>, ApiError> {
    require_non_empty("userId", &request.user_id)?;
    require_non_empty("key", &request.key)?;
    let plaintext = record_plaintext(request.value)?;

    let records = state.records()?;
    records.put_record(&request.user_id, &request.key, &plaintext)?;
    state.stats.record(Counter::RecordWrites);

    tracing::info!(user_id = %request.user_id, key = %request.key, "Stored record");
    Ok(Json(WriteResponse {
        ok: true,
        key: request.key,
    }))
}

/// One record unsealed (`key` given) or all records of a user still sealed.
#[utoipa::path(
    get,
    path = "/records",
    params(RecordQuery),
    tag = "Records",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "`{key, value}` with `key`, otherwise `{records}`", body = RecordListResponse),
        (status = 400, description = "Missing userId"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Stored record failed authentication"),
        (status = 503, description = "Record store unavailable")
    )
)]
pub async fn get_records(
    Auth(_user): Auth,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<RecordQuery>,
) -> Result<Response, ApiError> {
    require_non_empty("userId", &query.user_id)?;
    let records = state.records()?;
    state.stats.record(Counter::RecordReads);

    match query.key.filter(|k| !k.is_empty()) {
        Some(key) => {
            let value = records.get_record(&query.user_id, &key)?;
            Ok(Json(RecordValueResponse { key, value }).into_response())
        }
        None => {
            let listed = records.list_records(&query.user_id)?;
            Ok(Json(RecordListResponse { records: listed }).into_response())
        }
    }
}
