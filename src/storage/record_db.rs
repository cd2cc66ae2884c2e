// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded record table backed by redb (pure Rust, ACID).
//!
//! This table only ever sees ciphertext; sealing happens in
//! [`super::records`].
//!
//! ## Table Layout
//!
//! - `records`: composite key (`len(user_id)` as u32 BE | user_id | key) →
//!   serialized [`StoredRecord`]
//! - `record_meta`: key → value (insertion sequence counter)

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: composite (user_id, key) → StoredRecord (JSON bytes).
const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");

/// Metadata: name → u64 big-endian.
const RECORD_META: TableDefinition<&str, &[u8]> = TableDefinition::new("record_meta");

const NEXT_SEQ: &str = "next_seq";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RecordDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type RecordDbResult<T> = Result<T, RecordDbError>;

/// One row of the record table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub user_id: String,
    pub key: String,
    /// Sealed value as its JSON envelope.
    pub ciphertext: String,
    /// First insertion time; kept when the row is overwritten.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Insertion order, breaks ties between equal `created_at`.
    pub seq: u64,
}

/// Distinct users and total rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordTotals {
    pub users: u64,
    pub records: u64,
}

// =============================================================================
// Key Helpers
// =============================================================================

/// Prefix shared by every row of `user_id`.
///
/// The length prefix keeps `("a", "\0b")` and `("a\0", "b")` apart.
fn user_prefix(user_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + user_id.len());
    prefix.extend_from_slice(&(user_id.len() as u32).to_be_bytes());
    prefix.extend_from_slice(user_id.as_bytes());
    prefix
}

fn record_key(user_id: &str, key: &str) -> Vec<u8> {
    let mut composite = user_prefix(user_id);
    composite.extend_from_slice(key.as_bytes());
    composite
}

// =============================================================================
// RecordDatabase
// =============================================================================

/// Durable `(user_id, key) -> ciphertext` table.
pub struct RecordDatabase {
    db: Database,
}

impl std::fmt::Debug for RecordDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordDatabase").finish_non_exhaustive()
    }
}

impl RecordDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> RecordDbResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS)?;
            let _ = write_txn.open_table(RECORD_META)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert a new row or replace the ciphertext of an existing one.
    ///
    /// Last writer wins; `created_at` and `seq` of an existing row are kept.
    pub fn upsert(&self, user_id: &str, key: &str, ciphertext: &str) -> RecordDbResult<()> {
        let composite = record_key(user_id, key);
        let now = Utc::now();

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;

            let existing: Option<StoredRecord> = match table.get(composite.as_slice())? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            let record = match existing {
                Some(mut record) => {
                    record.ciphertext = ciphertext.to_string();
                    record.updated_at = now;
                    record
                }
                None => {
                    let mut meta = write_txn.open_table(RECORD_META)?;
                    let seq = match meta.get(NEXT_SEQ)? {
                        Some(v) => decode_u64(v.value()),
                        None => 0,
                    };
                    meta.insert(NEXT_SEQ, (seq + 1).to_be_bytes().as_slice())?;

                    StoredRecord {
                        user_id: user_id.to_string(),
                        key: key.to_string(),
                        ciphertext: ciphertext.to_string(),
                        created_at: now,
                        updated_at: now,
                        seq,
                    }
                }
            };

            let json = serde_json::to_vec(&record)?;
            table.insert(composite.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a single row.
    pub fn get(&self, user_id: &str, key: &str) -> RecordDbResult<Option<StoredRecord>> {
        let composite = record_key(user_id, key);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        match table.get(composite.as_slice())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All rows of `user_id`, oldest first.
    pub fn list_by_user(&self, user_id: &str) -> RecordDbResult<Vec<StoredRecord>> {
        let prefix = user_prefix(user_id);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;

        let mut records = Vec::new();
        for entry in table.range(prefix.as_slice()..)? {
            let (key, value) = entry?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            records.push(serde_json::from_slice::<StoredRecord>(value.value())?);
        }

        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
        Ok(records)
    }

    /// Count distinct users and rows.
    pub fn totals(&self) -> RecordDbResult<RecordTotals> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;

        let mut users = HashSet::new();
        let mut records = 0u64;
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: StoredRecord = serde_json::from_slice(value.value())?;
            users.insert(record.user_id);
            records += 1;
        }

        Ok(RecordTotals {
            users: users.len() as u64,
            records,
        })
    }
}

fn decode_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_be_bytes(buf)
}

// =============================================================================
// Tests
// =============================================================================
