// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token minting.
//!
//! Two kinds of tokens are minted with the same shared secret the gate
//! verifies with:
//!
//! - **service** tokens (subject [`SERVICE_SUBJECT`], 60 s) for a trusted
//!   proxy calling the oracle on a user's behalf
//! - **demo** tokens (subject `demo-user-<hex>`, 1 h) for local exploration

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;
use utoipa::ToSchema;

use super::{AuthError, TokenClaims};

/// Subject of service tokens.
pub const SERVICE_SUBJECT: &str = "service-proxy";

/// Lifetime of service tokens.
pub const SERVICE_TOKEN_TTL: Duration = Duration::from_secs(60);

/// Lifetime of demo tokens.
pub const DEMO_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// A freshly minted token.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MintedToken {
    pub token: String,
    pub subject: String,
    /// Expiration timestamp (seconds since epoch)
    pub expires_at: i64,
}

/// Mints HS256 tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    rng: SystemRandom,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            rng: SystemRandom::new(),
        }
    }

    /// Mint a token for `subject` valid for `ttl`.
    pub fn mint(&self, subject: &str, ttl: Duration) -> Result<MintedToken, AuthError> {
        let iat = Utc::now().timestamp();
        let exp = iat + ttl.as_secs() as i64;
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat,
            exp: Some(exp),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        Ok(MintedToken {
            token,
            subject: claims.sub,
            expires_at: exp,
        })
    }

    pub fn mint_service_token(&self) -> Result<MintedToken, AuthError> {
        self.mint(SERVICE_SUBJECT, SERVICE_TOKEN_TTL)
    }

    /// Mint a demo token for a random `demo-user-<hex>` subject.
    pub fn mint_demo_token(&self) -> Result<MintedToken, AuthError> {
        let mut suffix = [0u8; 4];
        self.rng
            .fill(&mut suffix)
            .map_err(|_| AuthError::InternalError("random generator failed".into()))?;
        self.mint(&format!("demo-user-{}", hex::encode(suffix)), DEMO_TOKEN_TTL)
    }
}
