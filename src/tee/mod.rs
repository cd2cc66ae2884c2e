// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # TEE Backend
//!
//! Client side of the enclave's key management and quoting service.
//!
//! ## Calls
//!
//! | Call | Request | Response |
//! |------|---------|----------|
//! | `GetKey` | `{path, purpose}` | `{key: hex, signature_chain: [hex, hex]}` |
//! | `GetQuote` | `{report_data: hex}` | `{quote: hex}` |
//!
//! Two backends exist: [`DstackClient`] talks to the dstack guest agent over
//! HTTP, [`SimulatedBackend`] answers locally and deterministically for
//! development runs and tests.

pub mod dstack;
pub mod key;
pub mod simulator;

use serde::{Deserialize, Serialize};

pub use dstack::DstackClient;
pub use key::{derive_key, DerivedKey};
pub use simulator::SimulatedBackend;

/// Errors returned by a TEE backend call.
#[derive(Debug, thiserror::Error)]
pub enum TeeError {
    /// Transport failure (connection refused, timeout, TLS).
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered but the payload is unusable.
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// The backend is switched off (simulator only).
    #[error("backend unavailable")]
    Unavailable,
}

/// Response of `GetKey`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetKeyResponse {
    /// Hex-encoded derived key (at least 64 hex chars).
    pub key: String,
    /// Signature chain endorsing the derived key (app signature, KMS signature).
    #[serde(default)]
    pub signature_chain: Vec<String>,
}

/// Response of `GetQuote`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetQuoteResponse {
    /// Hex-encoded hardware quote.
    pub quote: String,
    /// Event log accompanying the quote, when the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log: Option<String>,
}

/// The TEE backend in use by this process.
#[derive(Debug, Clone)]
pub enum TeeBackend {
    Dstack(DstackClient),
    Simulated(SimulatedBackend),
}

impl TeeBackend {
    /// Derive a key for `(path, purpose)`.
    pub async fn get_key(&self, path: &str, purpose: &str) -> Result<GetKeyResponse, TeeError> {
        match self {
            TeeBackend::Dstack(client) => client.get_key(path, purpose).await,
            TeeBackend::Simulated(sim) => sim.get_key(path, purpose),
        }
    }

    /// Request a hardware quote over `report_data` (hex).
    pub async fn get_quote(&self, report_data: &str) -> Result<GetQuoteResponse, TeeError> {
        match self {
            TeeBackend::Dstack(client) => client.get_quote(report_data).await,
            TeeBackend::Simulated(sim) => sim.get_quote(report_data),
        }
    }

    /// Short name for logs and health output.
    pub fn kind(&self) -> &'static str {
        match self {
            TeeBackend::Dstack(_) => "dstack",
            TeeBackend::Simulated(_) => "simulator",
        }
    }
}
