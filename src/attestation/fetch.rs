// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Attested HTTPS fetch.
//!
//! The oracle fetches a URL from inside the enclave and binds what it saw to
//! a quote: `hash = sha256(url || body || tlsFingerprint || timestamp)`.
//! `tlsFingerprint` is the SHA-256 of the server's leaf certificate (DER),
//! colon-separated upper-case hex, or empty when the TLS stack reports none.

use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use url::Url;
use utoipa::ToSchema;

use super::{sha256_hex, Attester};
use crate::stats::format_time;
use crate::tee::TeeError;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("url must start with https://")]
    InvalidUrl,

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("attestation unavailable: {0}")]
    Attestation(#[from] TeeError),
}

/// Result of an attested fetch.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttestedFetch {
    pub url: String,
    /// Response body as text
    pub body: String,
    pub tls_fingerprint: Option<String>,
    pub timestamp: String,
    pub hash: String,
    pub public_key: String,
    pub signature_chain: Vec<String>,
    pub quote: String,
}

/// HTTPS client that records the peer certificate.
#[derive(Debug, Clone)]
pub struct AttestedFetcher {
    client: reqwest::Client,
}

impl AttestedFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .https_only(true)
            .tls_info(true)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch `url` and attest the response.
    pub async fn fetch(&self, url: &str, attester: &Attester) -> Result<AttestedFetch, FetchError> {
        let parsed = parse_https_url(url)?;

        let response = self.client.get(parsed).send().await?;
        let tls_fingerprint = response
            .extensions()
            .get::<reqwest::tls::TlsInfo>()
            .and_then(|info| info.peer_certificate())
            .map(certificate_fingerprint);
        let body = response.text().await?;

        let timestamp = format_time(chrono::Utc::now());
        let hash = fetch_hash(url, &body, tls_fingerprint.as_deref(), &timestamp);
        let attestation = attester.attest(&hash).await?;

        tracing::info!(
            url = %url,
            bytes = body.len(),
            pinned = tls_fingerprint.is_some(),
            "Attested fetch"
        );

        Ok(AttestedFetch {
            url: url.to_string(),
            body,
            tls_fingerprint,
            timestamp,
            hash,
            public_key: attestation.key.public_key_hex(),
            signature_chain: attestation.key.signature_chain().to_vec(),
            quote: attestation.quote,
        })
    }
}

fn parse_https_url(url: &str) -> Result<Url, FetchError> {
    if !url.starts_with("https://") {
        return Err(FetchError::InvalidUrl);
    }
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl)?;
    if parsed.scheme() != "https" || parsed.host().is_none() {
        return Err(FetchError::InvalidUrl);
    }
    Ok(parsed)
}

/// SHA-256 of a DER certificate as `AB:CD:...`.
pub fn certificate_fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Digest binding a fetched response to its origin and time.
pub fn fetch_hash(url: &str, body: &str, tls_fingerprint: Option<&str>, timestamp: &str) -> String {
    let mut preimage = String::with_capacity(url.len() + body.len() + 128);
    preimage.push_str(url);
    preimage.push_str(body);
    preimage.push_str(tls_fingerprint.unwrap_or(""));
    preimage.push_str(timestamp);
    sha256_hex(preimage.as_bytes())
}
