// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors shared by the sealed stores.

use std::io;

use crate::crypto::SealError;

use super::record_db::RecordDbError;

/// Error type for sealed store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Absent key or record. Not sensitive.
    #[error("{0} not found")]
    NotFound(String),

    /// A stored ciphertext failed tag or context verification: tampering,
    /// relabelling, or a different enclave key.
    #[error("sealed data failed authentication")]
    AuthenticationFailed,

    /// The store cannot serve requests (not configured, failed to load,
    /// backing table unreachable).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Sealing failed for a reason other than authentication.
    #[error("sealing error: {0}")]
    Seal(SealError),

    /// Filesystem error while persisting the local store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Plaintext (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SealError> for StoreError {
    fn from(e: SealError) -> Self {
        match e {
            SealError::AuthenticationFailed => StoreError::AuthenticationFailed,
            other => StoreError::Seal(other),
        }
    }
}

impl From<RecordDbError> for StoreError {
    fn from(e: RecordDbError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
