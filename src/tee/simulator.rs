// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local stand-in for the TEE backend.
//!
//! Keys are `sha256(seed || path || purpose)`, so the same seed, path and
//! purpose always give the same key, like a real enclave identity would.
//! Quotes are NOT hardware-backed and must never be trusted by a verifier.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::{GetKeyResponse, GetQuoteResponse, TeeError};

/// Prefix marking a simulated quote.
pub const SIMULATED_QUOTE_PREFIX: &str = "73696d756c61746564"; // "simulated"

/// Deterministic in-process TEE backend.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    seed: Vec<u8>,
    available: Arc<AtomicBool>,
}

impl SimulatedBackend {
    pub fn new(seed: impl AsRef<[u8]>) -> Self {
        Self {
            seed: seed.as_ref().to_vec(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Switch the backend on or off; while off every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), TeeError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TeeError::Unavailable)
        }
    }

    pub fn get_key(&self, path: &str, purpose: &str) -> Result<GetKeyResponse, TeeError> {
        self.ensure_available()?;

        let key = Sha256::new()
            .chain_update(&self.seed)
            .chain_update(path.as_bytes())
            .chain_update([0u8])
            .chain_update(purpose.as_bytes())
            .finalize();

        let app_signature = Sha256::new()
            .chain_update(b"app-signature")
            .chain_update(key)
            .finalize();
        let kms_signature = Sha256::new()
            .chain_update(b"kms-signature")
            .chain_update(app_signature)
            .finalize();

        Ok(GetKeyResponse {
            key: hex::encode(key),
            signature_chain: vec![hex::encode(app_signature), hex::encode(kms_signature)],
        })
    }

    pub fn get_quote(&self, report_data: &str) -> Result<GetQuoteResponse, TeeError> {
        self.ensure_available()?;
        if hex::decode(report_data).is_err() {
            return Err(TeeError::Malformed("report_data is not hex".to_string()));
        }
        Ok(GetQuoteResponse {
            quote: format!("{SIMULATED_QUOTE_PREFIX}{report_data}"),
            event_log: None,
        })
    }
}
