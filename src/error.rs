// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::attestation::{FetchError, ReportError};
use crate::auth::AuthError;
use crate::storage::StoreError;
use crate::tee::TeeError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// The derived key is missing or the backend cannot provide it.
    pub fn key_unavailable() -> Self {
        Self::service_unavailable("key unavailable")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            StoreError::AuthenticationFailed => {
                tracing::error!("Sealed data failed authentication");
                ApiError::internal("sealed data failed authentication")
            }
            StoreError::Unavailable(reason) => {
                tracing::warn!(reason = %reason, "Store unavailable");
                ApiError::service_unavailable("store unavailable")
            }
            other => {
                tracing::error!(error = %other, "Store operation failed");
                ApiError::internal("store operation failed")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::new(e.status_code(), e.to_string())
    }
}

impl From<TeeError> for ApiError {
    fn from(e: TeeError) -> Self {
        tracing::warn!(error = %e, "TEE backend call failed");
        ApiError::key_unavailable()
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        tracing::warn!(error = %e, "Report generation failed");
        ApiError::bad_gateway("attestation unavailable")
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::InvalidUrl => ApiError::bad_request("url must start with https://"),
            FetchError::Upstream(err) => {
                tracing::warn!(error = %err, "Upstream fetch failed");
                ApiError::bad_gateway("upstream request failed")
            }
            FetchError::Attestation(err) => {
                tracing::warn!(error = %err, "Fetch attestation failed");
                ApiError::bad_gateway("attestation unavailable")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        assert_eq!(ApiError::key_unavailable().status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::bad_gateway("x").status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn store_errors_map_to_distinct_statuses() {
        assert_eq!(
            ApiError::from(StoreError::NotFound("record".into())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::AuthenticationFailed).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(StoreError::Unavailable("db".into())).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn attestation_errors_are_bad_gateway() {
        let err = ApiError::from(ReportError::Backend(TeeError::Unavailable));
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::from(FetchError::InvalidUrl).status,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
