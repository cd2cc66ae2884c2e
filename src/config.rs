// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | Shared HS256 secret for bearer tokens | Required (`dev` feature: demo secret) |
//! | `TEE_BACKEND` | `dstack` or `simulator` | `dstack` |
//! | `DSTACK_ENDPOINT` | Base URL of the dstack guest agent | `http://127.0.0.1:8090` |
//! | `TEE_SIMULATOR_SEED` | Identity of the simulated enclave | `attestation-oracle-dev` |
//! | `TEE_TIMEOUT_SECS` | Timeout for backend and fetch calls | `30` |
//! | `KEY_PATH` | Key derivation path | `/oracle` |
//! | `KEY_PURPOSE` | Key derivation purpose | `signing` |
//! | `STORE_PATH` | Sealed local store file | `/data/store.enc` |
//! | `RECORDS_DB_PATH` | Record table file | Unset (records disabled) |
//! | `DEMO_TOKENS` | Enable `POST /token` | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the shared token secret.
///
/// Never logged. Startup fails without it unless built with the `dev`
/// feature.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

pub const TEE_BACKEND_ENV: &str = "TEE_BACKEND";
pub const DSTACK_ENDPOINT_ENV: &str = "DSTACK_ENDPOINT";
pub const TEE_SIMULATOR_SEED_ENV: &str = "TEE_SIMULATOR_SEED";
pub const TEE_TIMEOUT_SECS_ENV: &str = "TEE_TIMEOUT_SECS";
pub const KEY_PATH_ENV: &str = "KEY_PATH";
pub const KEY_PURPOSE_ENV: &str = "KEY_PURPOSE";

/// Environment variable name for the sealed local store file.
///
/// The file holds one sealed blob; it is only readable under the key the
/// same enclave identity derives.
pub const STORE_PATH_ENV: &str = "STORE_PATH";

/// Environment variable name for the record table file. Unset disables the
/// record endpoints (503).
pub const RECORDS_DB_PATH_ENV: &str = "RECORDS_DB_PATH";

pub const DEMO_TOKENS_ENV: &str = "DEMO_TOKENS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DSTACK_ENDPOINT: &str = "http://127.0.0.1:8090";
pub const DEFAULT_SIMULATOR_SEED: &str = "attestation-oracle-dev";
pub const DEFAULT_TEE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_KEY_PATH: &str = "/oracle";
pub const DEFAULT_KEY_PURPOSE: &str = "signing";
pub const DEFAULT_STORE_PATH: &str = "/data/store.enc";

/// Secret used when `JWT_SECRET` is unset in `dev` builds.
#[cfg(feature = "dev")]
pub const DEV_JWT_SECRET: &str = "attestation-oracle-dev-secret";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Which TEE backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeeBackendKind {
    Dstack,
    Simulator,
}

/// Process configuration, read once at startup.
#[derive(Clone)]
pub struct OracleConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub tee_backend: TeeBackendKind,
    pub dstack_endpoint: String,
    pub simulator_seed: String,
    pub tee_timeout: Duration,
    pub key_path: String,
    pub key_purpose: String,
    pub store_path: PathBuf,
    pub records_db_path: Option<PathBuf>,
    pub demo_tokens: bool,
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tee_backend", &self.tee_backend)
            .field("dstack_endpoint", &self.dstack_endpoint)
            .field("tee_timeout", &self.tee_timeout)
            .field("key_path", &self.key_path)
            .field("key_purpose", &self.key_purpose)
            .field("store_path", &self.store_path)
            .field("records_db_path", &self.records_db_path)
            .field("demo_tokens", &self.demo_tokens)
            .finish_non_exhaustive()
    }
}

impl OracleConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: PORT_ENV,
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let tee_backend = match get(TEE_BACKEND_ENV).as_deref() {
            None | Some("dstack") => TeeBackendKind::Dstack,
            Some("simulator") => TeeBackendKind::Simulator,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: TEE_BACKEND_ENV,
                    value: other.to_string(),
                })
            }
        };

        let tee_timeout = match get(TEE_TIMEOUT_SECS_ENV) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: TEE_TIMEOUT_SECS_ENV,
                        value: raw,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_TEE_TIMEOUT_SECS),
        };

        let demo_tokens = match get(DEMO_TOKENS_ENV).as_deref() {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: DEMO_TOKENS_ENV,
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            jwt_secret: jwt_secret(get(JWT_SECRET_ENV))?,
            tee_backend,
            dstack_endpoint: get(DSTACK_ENDPOINT_ENV)
                .unwrap_or_else(|| DEFAULT_DSTACK_ENDPOINT.to_string()),
            simulator_seed: get(TEE_SIMULATOR_SEED_ENV)
                .unwrap_or_else(|| DEFAULT_SIMULATOR_SEED.to_string()),
            tee_timeout,
            key_path: get(KEY_PATH_ENV).unwrap_or_else(|| DEFAULT_KEY_PATH.to_string()),
            key_purpose: get(KEY_PURPOSE_ENV).unwrap_or_else(|| DEFAULT_KEY_PURPOSE.to_string()),
            store_path: get(STORE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
            records_db_path: get(RECORDS_DB_PATH_ENV).map(PathBuf::from),
            demo_tokens,
        })
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(not(feature = "dev"))]
fn jwt_secret(value: Option<String>) -> Result<String, ConfigError> {
    value.ok_or(ConfigError::Missing(JWT_SECRET_ENV))
}

#[cfg(feature = "dev")]
fn jwt_secret(value: Option<String>) -> Result<String, ConfigError> {
    Ok(value.unwrap_or_else(|| {
        tracing::warn!("JWT_SECRET not set, using the built-in development secret");
        DEV_JWT_SECRET.to_string()
    }))
}
