// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Exit reports: a quote-backed, signed snapshot of the process counters.
//!
//! ## Verification
//!
//! 1. Re-serialize `stats` canonically (object keys sorted, compact) and
//!    check `sha256 == hash`
//! 2. Check that `quote` carries `hash` as its report data
//! 3. Check `signature` over the same canonical bytes under `publicKey`
//! 4. Check `signatureChain` endorses `publicKey`

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::{sha256_hex, Attester};
use crate::stats::{format_time, Stats, StatsSnapshot};
use crate::tee::TeeError;

/// Value of the report `type` field.
pub const REPORT_TYPE: &str = "tee-exit-report";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Quote or key could not be obtained. No partial report is produced.
    #[error("attestation unavailable: {0}")]
    Backend(#[from] TeeError),

    #[error("report encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// The signed part of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    /// Entries in the local store at report time
    pub kv_entries: u64,
    /// Whole seconds since start, `"<n>s"`
    pub uptime: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Always `tee-exit-report`
    #[serde(rename = "type")]
    pub report_type: String,
    pub generated: String,
    pub stats: ReportStats,
    /// Hex SHA-256 of the canonical `stats` bytes
    pub hash: String,
    pub public_key: String,
    pub signature_chain: Vec<String>,
    pub quote: String,
    /// ECDSA secp256k1 signature over the canonical `stats` bytes
    pub signature: String,
}

/// Compact JSON with object keys sorted at every level.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&sort_keys(serde_json::to_value(value)?))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

impl Attester {
    /// Build an exit report over the current counters.
    pub async fn report(&self, stats: &Stats, kv_entries: usize) -> Result<Report, ReportError> {
        let report_stats = ReportStats {
            counters: stats.snapshot(),
            kv_entries: kv_entries as u64,
            uptime: stats.uptime(),
        };

        let canonical = canonical_json(&report_stats)?;
        let hash = sha256_hex(&canonical);

        let attestation = self.attest(&hash).await?;
        let signature = attestation.key.sign(&canonical);

        tracing::info!(hash = %hash, backend = self.backend().kind(), "Generated exit report");

        Ok(Report {
            report_type: REPORT_TYPE.to_string(),
            generated: format_time(chrono::Utc::now()),
            stats: report_stats,
            hash,
            public_key: attestation.key.public_key_hex(),
            signature_chain: attestation.key.signature_chain().to_vec(),
            quote: attestation.quote,
            signature,
        })
    }
}
