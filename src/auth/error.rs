// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Every rejection is decided before any store is consulted, so these
/// errors never reveal whether a key or record exists.
#[derive(Debug)]
pub enum AuthError {
    /// No `Authorization` header, or not a `Bearer` credential
    MissingToken,
    /// Token does not decode as `header.payload.signature`
    MalformedToken,
    /// Token signature does not verify under the shared secret
    BadSignature,
    /// Token has no `exp`, or `exp` is not in the future
    Expired,
    /// Token could not be minted
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "token_expired",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::MalformedToken
            | AuthError::BadSignature
            | AuthError::Expired => StatusCode::UNAUTHORIZED,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => {
                write!(f, "Authorization header is required (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::BadSignature => write!(f, "Token signature is invalid"),
            AuthError::Expired => write!(f, "Token has expired"),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
