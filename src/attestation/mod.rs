// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Attestation
//!
//! Everything the oracle says about itself is bound to a hardware quote:
//!
//! - [`report`]: signed snapshot of the process counters
//! - [`fetch`]: HTTPS responses pinned to the server certificate
//!
//! Both hash their payload, ask the TEE for a quote over the hex digest and
//! attach the derived public key with its signature chain, so a verifier can
//! check quote, key and payload together.

pub mod fetch;
pub mod report;

use sha2::{Digest, Sha256};

use crate::tee::{derive_key, DerivedKey, TeeBackend, TeeError};

pub use fetch::{AttestedFetch, AttestedFetcher, FetchError};
pub use report::{canonical_json, Report, ReportError, ReportStats, REPORT_TYPE};

/// Quote plus the key material a verifier needs alongside it.
#[derive(Debug)]
pub struct Attestation {
    pub quote: String,
    pub key: DerivedKey,
}

/// Talks to the TEE on behalf of reports and fetches.
#[derive(Debug, Clone)]
pub struct Attester {
    tee: TeeBackend,
    key_path: String,
    key_purpose: String,
}

impl Attester {
    pub fn new(tee: TeeBackend, key_path: impl Into<String>, key_purpose: impl Into<String>) -> Self {
        Self {
            tee,
            key_path: key_path.into(),
            key_purpose: key_purpose.into(),
        }
    }

    pub fn backend(&self) -> &TeeBackend {
        &self.tee
    }

    /// Re-derive the signing key. Deterministic for a given enclave identity.
    pub async fn key(&self) -> Result<DerivedKey, TeeError> {
        derive_key(&self.tee, &self.key_path, &self.key_purpose).await
    }

    /// Quote over `report_data` (hex), then fetch the key it is presented with.
    pub async fn attest(&self, report_data: &str) -> Result<Attestation, TeeError> {
        let quote = self.tee.get_quote(report_data).await?;
        let key = self.key().await?;
        Ok(Attestation {
            quote: quote.quote,
            key,
        })
    }
}

/// Lower-case hex SHA-256.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
