// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Attestation Oracle - sealed storage and quote-backed reports from a TEE
//!
//! The oracle derives its root key from the TEE key management service at
//! startup, seals everything it stores with that key, and produces reports
//! bound to hardware quotes so a verifier can check that data and counters
//! came from code running inside the enclave.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `attestation` - Exit reports and attested HTTPS fetches
//! - `auth` - Bearer token verification and minting (HS256)
//! - `crypto` - AES-256-GCM sealing
//! - `storage` - Sealed local store and per-user records
//! - `tee` - TEE backend clients and key derivation

pub mod api;
pub mod attestation;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
pub mod tee;
