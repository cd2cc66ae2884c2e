// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Flat key/value store sealed to the enclave key.
//!
//! ## Persistence
//!
//! The whole map is serialized to JSON, sealed as ONE blob and written over
//! the previous file on every `put`. There is no per-entry sealing and no
//! write-ahead log: a crash in the middle of the write can lose the store.
//! Writing to a temp file and renaming over the old one is the upgrade path.
//!
//! ## Concurrency
//!
//! One async mutex covers the map and the reseal-and-write sequence, so
//! concurrent `put` calls are serialized and the file always matches the map
//! after each successful call. The write itself runs on the blocking pool.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::Mutex;

use super::{StoreError, StoreResult};
use crate::crypto::{seal, unseal, RootKey, SealedBlob};

/// Associated data bound to the store blob.
const STORE_AAD: &[u8] = b"";

/// The sealed local key/value store.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    key: RootKey,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl LocalStore {
    /// Open the store at `path`.
    ///
    /// A missing file is an empty store. An existing file that does not
    /// unseal under `key` is an error: the caller must not serve this store.
    pub fn open(path: impl AsRef<Path>, key: RootKey) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => {
                let blob = SealedBlob::from_json(&raw)?;
                let plaintext = unseal(&key, &blob, STORE_AAD)?;
                serde_json::from_slice::<BTreeMap<String, Value>>(&plaintext)?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        tracing::info!(
            path = %path.display(),
            keys = entries.len(),
            "Loaded encrypted store"
        );

        Ok(Self {
            path,
            key,
            entries: Mutex::new(entries),
        })
    }

    /// Look up a single value.
    pub async fn get(&self, key: &str) -> StoreResult<Value> {
        self.entries
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("key {key}")))
    }

    /// Insert or replace a value and persist the whole store.
    ///
    /// If sealing or writing fails the in-memory map is left unchanged.
    pub async fn put(&self, key: impl Into<String>, value: Value) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;

        let mut next = entries.clone();
        next.insert(key.into(), value);

        let path = self.path.clone();
        let root = self.key.clone();
        let next = tokio::task::spawn_blocking(move || persist(&path, &root, &next).map(|()| next))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store writer stopped: {e}")))??;

        *entries = next;
        Ok(())
    }

    /// All keys, sorted. Values are not returned.
    pub async fn list(&self) -> Vec<String> {
        self.entries.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

}

/// Seal `entries` and overwrite the file at `path`. Blocking.
fn persist(path: &Path, key: &RootKey, entries: &BTreeMap<String, Value>) -> StoreResult<()> {
    let plaintext = serde_json::to_vec(entries)?;
    let blob = seal(key, &plaintext, STORE_AAD)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, blob.to_json()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ROOT_KEY_LEN;
    use serde_json::json;
    use tempfile::TempDir;

    fn key(byte: u8) -> RootKey {
        RootKey::from_bytes([byte; ROOT_KEY_LEN])
    }

    fn store_path(dir: &TempDir) -> PathBuf {
        dir.path().join("store.enc")
    }

    #[tokio::test]
    async fn missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(store_path(&dir), key(1)).unwrap();
        assert!(store.is_empty().await);
        assert!(!store_path(&dir).exists());
    }

    #[tokio::test]
    async fn put_then_get() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(store_path(&dir), key(1)).unwrap();

        store.put("x", json!(42)).await.unwrap();
        store.put("nested", json!({"a": [1, true, null, "s"]})).await.unwrap();

        assert_eq!(store.get("x").await.unwrap(), json!(42));
        assert_eq!(store.get("nested").await.unwrap(), json!({"a": [1, true, null, "s"]}));
        assert!(matches!(store.get("missing").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn put_overwrites_and_list_returns_sorted_keys() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(store_path(&dir), key(1)).unwrap();

        store.put("b", json!("one")).await.unwrap();
        store.put("a", json!("two")).await.unwrap();
        store.put("b", json!("three")).await.unwrap();

        assert_eq!(store.list().await, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("b").await.unwrap(), json!("three"));
    }

    #[tokio::test]
    async fn survives_restart_with_same_key() {
        let dir = TempDir::new().unwrap();
        {
            let store = LocalStore::open(store_path(&dir), key(1)).unwrap();
            store.put("x", json!(42)).await.unwrap();
        }

        let reopened = LocalStore::open(store_path(&dir), key(1)).unwrap();
        assert_eq!(reopened.get("x").await.unwrap(), json!(42));
    }

    #[tokio::test]
    async fn reload_with_other_key_fails_closed() {
        let dir = TempDir::new().unwrap();
        {
            let store = LocalStore::open(store_path(&dir), key(1)).unwrap();
            store.put("x", json!(42)).await.unwrap();
        }

        let result = LocalStore::open(store_path(&dir), key(2));
        assert!(matches!(result, Err(StoreError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn persisted_file_is_sealed_envelope() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(store_path(&dir), key(1)).unwrap();
        store.put("secret", json!("plain-text-marker")).await.unwrap();

        let raw = fs::read_to_string(store_path(&dir)).unwrap();
        assert!(!raw.contains("plain-text-marker"));
        let envelope: Value = serde_json::from_str(&raw).unwrap();
        assert!(envelope.get("iv").is_some());
        assert!(envelope.get("data").is_some());
        assert!(envelope.get("tag").is_some());
    }

    #[tokio::test]
    async fn corrupted_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(store_path(&dir), "not a sealed blob").unwrap();
        let result = LocalStore::open(store_path(&dir), key(1));
        assert!(matches!(result, Err(StoreError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn failed_write_leaves_map_unchanged() {
        let dir = TempDir::new().unwrap();
        // The store path is a directory, so every write fails.
        let path = dir.path().join("as-dir");
        fs::create_dir_all(&path).unwrap();
        let store = LocalStore {
            path,
            key: key(1),
            entries: Mutex::new(BTreeMap::new()),
        };

        assert!(store.put("x", json!(1)).await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_puts_all_land() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(LocalStore::open(store_path(&dir), key(1)).unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put(format!("k{i}"), json!(i)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let reopened = LocalStore::open(store_path(&dir), key(1)).unwrap();
        assert_eq!(reopened.len().await, 16);
    }
}
