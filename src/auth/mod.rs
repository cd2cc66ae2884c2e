// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authorization for the oracle's mutating and user-scoped
//! endpoints.
//!
//! ## Auth Flow
//!
//! 1. A trusted proxy (or a demo client) obtains an HS256 token signed with
//!    the shared `JWT_SECRET`
//! 2. It sends `Authorization: Bearer <token>`
//! 3. The oracle:
//!    - Recomputes the MAC and compares it in constant time
//!    - Requires `exp` to be present and in the future
//!    - Extracts `sub` as the caller identity
//!
//! ## Security
//!
//! - `/store`, `/records` and `/fetch` require a token
//! - Authorization runs before any store lookup
//! - No clock skew tolerance

pub mod claims;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod issuer;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use error::AuthError;
pub use extractor::Auth;
pub use gate::TokenGate;
pub use issuer::{MintedToken, TokenIssuer};
