// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{body::Bytes, extract::State, Json};

use crate::{
    auth::MintedToken,
    error::ApiError,
    models::{TokenKind, TokenRequest},
    state::AppState,
};

/// Mint a token. Answers 404 unless `DEMO_TOKENS=true`.
///
/// The body is optional; without one a demo token is minted.
#[utoipa::path(
    post,
    path = "/token",
    request_body(content = TokenRequest, description = "Optional, defaults to a demo token"),
    tag = "Tokens",
    responses(
        (status = 200, body = MintedToken),
        (status = 400, description = "Malformed body"),
        (status = 404, description = "Token minting disabled")
    )
)]
pub async fn mint_token(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MintedToken>, ApiError> {
    let issuer = state
        .issuer
        .as_deref()
        .ok_or_else(|| ApiError::not_found("not found"))?;

    let request: TokenRequest = if body.iter().all(u8::is_ascii_whitespace) {
        TokenRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?
    };

    let minted = match request.kind {
        TokenKind::Demo => issuer.mint_demo_token()?,
        TokenKind::Service => issuer.mint_service_token()?,
    };

    tracing::info!(subject = %minted.subject, "Minted token");
    Ok(Json(minted))
}
