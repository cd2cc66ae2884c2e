// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sealed Storage Module
//!
//! Two stores, both sealed with the root key derived from the TEE:
//!
//! - [`LocalStore`]: flat key → JSON value map persisted as a single sealed
//!   file (default `/data/store.enc`)
//! - [`RecordStore`]: per-user `(user_id, key) → value` records, each sealed
//!   with its own context, in an embedded redb table
//!
//! ## Security Model
//!
//! - Plaintext never touches disk
//! - Files and rows only open under the same enclave key
//! - Any modification outside the enclave causes an authentication failure,
//!   never a silent default

pub mod error;
pub mod local_store;
pub mod record_db;
pub mod records;

pub use error::{StoreError, StoreResult};
pub use local_store::LocalStore;
pub use record_db::{RecordDatabase, RecordDbError, RecordTotals, StoredRecord};
pub use records::{record_aad, RecordStore, SealedRecordEntry};
