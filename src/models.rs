// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Field names are camelCase
//! on the wire.
//!
//! ## Model Categories
//!
//! - **Service**: health, stats, public key
//! - **Store**: flat sealed key/value store
//! - **Records**: per-user sealed records
//! - **Tokens**: demo token minting

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::stats::StatsSnapshot;
use crate::storage::SealedRecordEntry;

// =============================================================================
// Service
// =============================================================================

/// Liveness answer. `ok` is always true while the process serves requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    /// TEE backend in use (`dstack` or `simulator`)
    pub backend: String,
    /// Components that failed at startup, with the reason
    pub degraded: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub start_time: String,
    pub uptime: String,
    pub requests: StatsSnapshot,
    /// Distinct users with records (when the record store is available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_users: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
}

/// Public identity of the oracle. The secret key is never returned.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyResponse {
    /// Compressed secp256k1 public key, `0x`-prefixed hex
    pub public_key: String,
    pub signature_chain: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FetchRequest {
    /// Must start with `https://`
    pub url: String,
}

/// Acknowledgement of a write.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WriteResponse {
    pub ok: bool,
    pub key: String,
}

// =============================================================================
// Store
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PutStoreRequest {
    pub key: String,
    /// Any JSON value except `null`
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoreKeysResponse {
    pub keys: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoreValueResponse {
    pub key: String,
    pub value: Value,
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PutRecordRequest {
    pub user_id: String,
    pub key: String,
    /// Strings are stored as-is, other JSON values as their JSON text
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RecordQuery {
    /// Owner of the records
    #[serde(default)]
    #[param(required = true)]
    pub user_id: String,
    /// Single record to unseal; omit to list all records still sealed
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordValueResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordListResponse {
    pub records: Vec<SealedRecordEntry>,
}

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// `demo-user-<hex>`, valid for one hour
    #[default]
    Demo,
    /// Proxy identity, valid for 60 seconds
    Service,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TokenRequest {
    #[serde(default)]
    pub kind: TokenKind,
}
