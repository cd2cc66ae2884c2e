// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated callers.
//!
//! Use the `Auth` extractor in handlers to require a token. Put it first in
//! the argument list so the token is checked before the body is read or any
//! store is touched:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth, State(state): State<AppState>) -> impl IntoResponse {
//!     // user.subject is the token subject
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Extractor for authenticated callers.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A non-UTF-8 header cannot hold a bearer token.
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::MissingToken)?),
            None => None,
        };

        let user = state.gate.authorize(header).map_err(|e| {
            tracing::debug!(error_code = e.error_code(), "Rejected request token");
            e
        })?;

        Ok(Auth(user))
    }
}
