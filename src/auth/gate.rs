// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! Tokens are HS256 JWTs (`base64url(header).base64url(payload).base64url(mac)`)
//! signed with the shared `JWT_SECRET`. `jsonwebtoken` recomputes the MAC and
//! compares it in constant time.
//!
//! ## States
//!
//! | Input | Result |
//! |-------|--------|
//! | no header, or not `Bearer <token>` | `MissingToken` |
//! | not three base64url segments of JSON | `MalformedToken` |
//! | MAC mismatch | `BadSignature` |
//! | `exp` missing or `exp <= now` | `Expired` |
//! | otherwise | authorized, subject returned |

use chrono::Utc;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use super::{AuthError, AuthenticatedUser, TokenClaims};

/// Verifies bearer tokens against the shared secret.
#[derive(Clone)]
pub struct TokenGate {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGate").finish_non_exhaustive()
    }
}

impl TokenGate {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below so that a missing `exp` maps to Expired
        // and there is no leeway.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Authorize a raw `Authorization` header value.
    pub fn authorize(&self, header: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        let token = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.verify(token)
    }

    /// Verify a bare token.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                _ => AuthError::MalformedToken,
            }
        })?;

        let claims = data.claims;
        let exp = claims.exp.ok_or(AuthError::Expired)?;
        if exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(AuthenticatedUser {
            subject: claims.sub,
            expires_at: exp,
        })
    }
}
