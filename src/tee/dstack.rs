// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the dstack guest agent.

use std::time::Duration;

use serde::Serialize;

use super::{GetKeyResponse, GetQuoteResponse, TeeError};

#[derive(Serialize)]
struct GetKeyRequest<'a> {
    path: &'a str,
    purpose: &'a str,
}

#[derive(Serialize)]
struct GetQuoteRequest<'a> {
    report_data: &'a str,
}

/// dstack guest agent client.
///
/// Every call carries the configured timeout; a hung agent surfaces as
/// [`TeeError::Transport`] instead of blocking the request forever.
#[derive(Debug, Clone)]
pub struct DstackClient {
    endpoint: String,
    client: reqwest::Client,
}

impl DstackClient {
    /// Create a client for `endpoint` (e.g. `http://127.0.0.1:8090`).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TeeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn get_key(&self, path: &str, purpose: &str) -> Result<GetKeyResponse, TeeError> {
        self.call("/GetKey", &GetKeyRequest { path, purpose }).await
    }

    pub async fn get_quote(&self, report_data: &str) -> Result<GetQuoteResponse, TeeError> {
        self.call("/GetQuote", &GetQuoteRequest { report_data }).await
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TeeError>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{method}", self.endpoint))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TeeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TeeError::Malformed(e.to_string()))
    }
}
