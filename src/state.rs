// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state and startup wiring.
//!
//! Startup never aborts on a TEE or storage failure: the failing component
//! is left out, the reason is recorded, and the process serves whatever does
//! not depend on it (`/health`, `/stats`, and so on).

use std::sync::Arc;

use crate::attestation::{AttestedFetcher, Attester, FetchError};
use crate::auth::{TokenGate, TokenIssuer};
use crate::config::{OracleConfig, TeeBackendKind};
use crate::stats::Stats;
use crate::storage::{LocalStore, RecordDatabase, RecordStore, StoreError, StoreResult};
use crate::tee::{derive_key, DstackClient, SimulatedBackend, TeeBackend, TeeError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to build TEE client: {0}")]
    Tee(#[from] TeeError),

    #[error("failed to build HTTPS client: {0}")]
    Fetch(#[from] FetchError),
}

#[derive(Clone)]
pub struct AppState {
    pub attester: Attester,
    pub fetcher: AttestedFetcher,
    pub gate: Arc<TokenGate>,
    /// Present only when demo token minting is enabled.
    pub issuer: Option<Arc<TokenIssuer>>,
    pub stats: Arc<Stats>,
    pub local_store: Option<Arc<LocalStore>>,
    pub records: Option<Arc<RecordStore>>,
    /// Why components are missing, for `/health`.
    pub degraded: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(attester: Attester, fetcher: AttestedFetcher, gate: TokenGate) -> Self {
        Self {
            attester,
            fetcher,
            gate: Arc::new(gate),
            issuer: None,
            stats: Arc::new(Stats::new()),
            local_store: None,
            records: None,
            degraded: Arc::new(Vec::new()),
        }
    }

    pub fn with_issuer(mut self, issuer: TokenIssuer) -> Self {
        self.issuer = Some(Arc::new(issuer));
        self
    }

    pub fn with_local_store(mut self, store: LocalStore) -> Self {
        self.local_store = Some(Arc::new(store));
        self
    }

    pub fn with_records(mut self, records: RecordStore) -> Self {
        self.records = Some(Arc::new(records));
        self
    }

    pub fn with_degraded(mut self, reason: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.degraded).push(reason.into());
        self
    }

    /// Wire up every component from configuration.
    ///
    /// Only client construction errors are returned; key, store and record
    /// failures degrade the state instead.
    pub async fn bootstrap(config: &OracleConfig) -> Result<Self, StartupError> {
        let tee = match config.tee_backend {
            TeeBackendKind::Dstack => TeeBackend::Dstack(DstackClient::new(
                config.dstack_endpoint.clone(),
                config.tee_timeout,
            )?),
            TeeBackendKind::Simulator => {
                tracing::warn!("Using the simulated TEE backend: quotes are NOT hardware-backed");
                TeeBackend::Simulated(SimulatedBackend::new(&config.simulator_seed))
            }
        };

        let attester = Attester::new(tee.clone(), &config.key_path, &config.key_purpose);
        let fetcher = AttestedFetcher::new(config.tee_timeout)?;
        let mut state = AppState::new(attester, fetcher, TokenGate::new(config.jwt_secret.as_bytes()));

        if config.demo_tokens {
            tracing::warn!("Demo token minting enabled (POST /token)");
            state = state.with_issuer(TokenIssuer::new(config.jwt_secret.as_bytes()));
        }

        let key = match derive_key(&tee, &config.key_path, &config.key_purpose).await {
            Ok(key) => {
                tracing::info!(
                    backend = tee.kind(),
                    public_key = %key.public_key_hex(),
                    "Derived enclave key"
                );
                key
            }
            Err(e) => {
                tracing::error!(
                    backend = tee.kind(),
                    error = %e,
                    "Key derivation failed, sealed storage disabled"
                );
                return Ok(state.with_degraded(format!("key unavailable: {e}")));
            }
        };

        match LocalStore::open(&config.store_path, key.root().clone()) {
            Ok(store) => state = state.with_local_store(store),
            Err(e) => {
                tracing::error!(
                    path = %config.store_path.display(),
                    error = %e,
                    "Local store failed to load"
                );
                state = state.with_degraded(format!("local store unavailable: {e}"));
            }
        }

        match &config.records_db_path {
            Some(path) => match RecordDatabase::open(path) {
                Ok(db) => {
                    tracing::info!(path = %path.display(), "Record table ready");
                    state = state.with_records(RecordStore::new(key.root().clone(), db));
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Record table failed to open");
                    state = state.with_degraded(format!("record store unavailable: {e}"));
                }
            },
            None => tracing::info!("RECORDS_DB_PATH not set, record store disabled"),
        }

        Ok(state)
    }

    pub fn local_store(&self) -> StoreResult<&LocalStore> {
        self.local_store
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("local store not loaded".to_string()))
    }

    pub fn records(&self) -> StoreResult<&RecordStore> {
        self.records
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("record store not configured".to_string()))
    }
}
