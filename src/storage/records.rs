// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-user sealed records.
//!
//! Every value is sealed with associated data `"<user_id>:<key>"`, so a
//! ciphertext copied to another user or another key no longer
//! authenticates, even though all records share one root key.

use serde::Serialize;
use utoipa::ToSchema;

use super::record_db::{RecordDatabase, RecordTotals};
use super::{StoreError, StoreResult};
use crate::crypto::{seal, unseal, RootKey, SealedBlob};

/// A record as returned by [`RecordStore::list_records`]: still sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SealedRecordEntry {
    pub key: String,
    /// JSON envelope `{iv, data, tag}`; unseal with AAD `"<userId>:<key>"`.
    pub ciphertext: String,
}

/// Sealing layer over the record table.
#[derive(Debug)]
pub struct RecordStore {
    key: RootKey,
    db: RecordDatabase,
}

/// Associated data binding a ciphertext to its row.
pub fn record_aad(user_id: &str, key: &str) -> Vec<u8> {
    format!("{user_id}:{key}").into_bytes()
}

impl RecordStore {
    pub fn new(key: RootKey, db: RecordDatabase) -> Self {
        Self { key, db }
    }

    /// Seal `value` for `(user_id, key)` and upsert it.
    pub fn put_record(&self, user_id: &str, key: &str, value: &str) -> StoreResult<()> {
        let blob = seal(&self.key, value.as_bytes(), &record_aad(user_id, key))?;
        self.db.upsert(user_id, key, &blob.to_json()?)?;
        Ok(())
    }

    /// Fetch and unseal one record.
    ///
    /// A missing row is [`StoreError::NotFound`]; a row that does not
    /// authenticate for this `(user_id, key)` is
    /// [`StoreError::AuthenticationFailed`].
    pub fn get_record(&self, user_id: &str, key: &str) -> StoreResult<String> {
        let row = self
            .db
            .get(user_id, key)?
            .ok_or_else(|| StoreError::NotFound("record".to_string()))?;

        let blob = SealedBlob::from_json(&row.ciphertext)?;
        let plaintext = unseal(&self.key, &blob, &record_aad(user_id, key))?;
        String::from_utf8(plaintext).map_err(|_| StoreError::AuthenticationFailed)
    }

    /// All records of `user_id`, oldest first, values still sealed.
    pub fn list_records(&self, user_id: &str) -> StoreResult<Vec<SealedRecordEntry>> {
        Ok(self
            .db
            .list_by_user(user_id)?
            .into_iter()
            .map(|row| SealedRecordEntry {
                key: row.key,
                ciphertext: row.ciphertext,
            })
            .collect())
    }

    pub fn totals(&self) -> StoreResult<RecordTotals> {
        Ok(self.db.totals()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ROOT_KEY_LEN;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> RecordStore {
        let db = RecordDatabase::open(&dir.path().join("records.redb")).unwrap();
        RecordStore::new(RootKey::from_bytes([3; ROOT_KEY_LEN]), db)
    }

    #[test]
    fn put_then_get_returns_plaintext() {
        let dir = TempDir::new().unwrap();
        let records = store(&dir);
        records.put_record("alice", "color", "blue").unwrap();
        assert_eq!(records.get_record("alice", "color").unwrap(), "blue");
    }

    #[test]
    fn other_user_sees_not_found() {
        let dir = TempDir::new().unwrap();
        let records = store(&dir);
        records.put_record("alice", "color", "blue").unwrap();
        assert!(matches!(
            records.get_record("bob", "color"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_returns_sealed_values() {
        let dir = TempDir::new().unwrap();
        let records = store(&dir);
        records.put_record("alice", "color", "blue").unwrap();

        let listed = records.list_records("alice").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "color");
        assert!(!listed[0].ciphertext.contains("blue"));

        let blob = SealedBlob::from_json(&listed[0].ciphertext).unwrap();
        let key = RootKey::from_bytes([3; ROOT_KEY_LEN]);
        assert_eq!(unseal(&key, &blob, &record_aad("alice", "color")).unwrap(), b"blue");
    }

    #[test]
    fn sealed_value_is_bound_to_user_and_key() {
        let key = RootKey::from_bytes([3; ROOT_KEY_LEN]);
        let blob = seal(&key, b"secret", &record_aad("userA", "k")).unwrap();

        assert!(unseal(&key, &blob, &record_aad("userB", "k")).is_err());
        assert!(unseal(&key, &blob, &record_aad("userA", "k2")).is_err());
        assert_eq!(unseal(&key, &blob, &record_aad("userA", "k")).unwrap(), b"secret");
    }

    #[test]
    fn relabelled_row_fails_authentication() {
        let dir = TempDir::new().unwrap();
        let db = RecordDatabase::open(&dir.path().join("records.redb")).unwrap();
        let key = RootKey::from_bytes([3; ROOT_KEY_LEN]);

        // Attacker with table access copies alice's ciphertext into bob's row.
        let alice = seal(&key, b"blue", &record_aad("alice", "color")).unwrap();
        db.upsert("bob", "color", &alice.to_json().unwrap()).unwrap();

        let records = RecordStore::new(key, db);
        assert!(matches!(
            records.get_record("bob", "color"),
            Err(StoreError::AuthenticationFailed)
        ));
    }

    #[test]
    fn garbage_ciphertext_fails_authentication() {
        let dir = TempDir::new().unwrap();
        let db = RecordDatabase::open(&dir.path().join("records.redb")).unwrap();
        db.upsert("alice", "color", "not-json").unwrap();

        let records = RecordStore::new(RootKey::from_bytes([3; ROOT_KEY_LEN]), db);
        assert!(matches!(
            records.get_record("alice", "color"),
            Err(StoreError::AuthenticationFailed)
        ));
    }

    #[test]
    fn overwrite_is_last_writer_wins() {
        let dir = TempDir::new().unwrap();
        let records = store(&dir);
        records.put_record("alice", "color", "blue").unwrap();
        records.put_record("alice", "color", "green").unwrap();
        assert_eq!(records.get_record("alice", "color").unwrap(), "green");
        assert_eq!(records.list_records("alice").unwrap().len(), 1);
    }
}
