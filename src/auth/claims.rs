// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated caller.

use serde::{Deserialize, Serialize};

/// Claims carried by an oracle bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (caller identity)
    pub sub: String,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    /// Expiration timestamp. A token without one is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Caller identity after a token passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The token subject
    pub subject: String,
    /// Expiration timestamp (seconds since epoch)
    pub expires_at: i64,
}
