// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authenticated Sealing
//!
//! AES-256-GCM sealing of byte payloads under the enclave root key, with an
//! optional associated-data binding.
//!
//! ## Blob Format
//!
//! ```text
//! { "iv": "<24 hex chars>", "data": "<ciphertext hex>", "tag": "<32 hex chars>" }
//! ```
//!
//! ## Security
//!
//! - A fresh 96-bit IV is drawn from the system CSPRNG for every seal
//! - The tag and associated data are verified before any plaintext is released
//! - Every unseal failure (bad tag, bad AAD, malformed IV) is the same
//!   [`SealError::AuthenticationFailed`]

use std::fmt;

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

/// Length of the root key in bytes (AES-256).
pub const ROOT_KEY_LEN: usize = 32;

/// Length of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Errors produced by the sealing primitive.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    /// Tag, associated data or IV did not verify.
    #[error("sealed data failed authentication")]
    AuthenticationFailed,

    /// The CSPRNG could not produce an IV.
    #[error("random IV generation failed")]
    Rng,

    /// The key material was rejected by the cipher.
    #[error("invalid root key")]
    InvalidKey,

    /// Blob encoding error (JSON envelope).
    #[error("sealed blob encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// The 256-bit root key obtained from the TEE key management service.
///
/// Never serialized and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct RootKey([u8; ROOT_KEY_LEN]);

impl RootKey {
    pub fn from_bytes(bytes: [u8; ROOT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a key from a slice; `None` unless exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; ROOT_KEY_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    fn aead_key(&self) -> Result<LessSafeKey, SealError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.0).map_err(|_| SealError::InvalidKey)?;
        Ok(LessSafeKey::new(unbound))
    }
}

impl fmt::Debug for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootKey(<redacted>)")
    }
}

/// A sealed payload: IV, ciphertext and detached GCM tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBlob {
    #[serde(with = "hex::serde")]
    pub iv: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub tag: Vec<u8>,
}

impl SealedBlob {
    /// Encode as the JSON envelope used on disk and in the record table.
    pub fn to_json(&self) -> Result<String, SealError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON envelope.
    ///
    /// A blob that cannot be parsed is treated as tampered.
    pub fn from_json(raw: &str) -> Result<Self, SealError> {
        serde_json::from_str(raw).map_err(|_| SealError::AuthenticationFailed)
    }
}

/// Encrypt `plaintext` under `key`, binding `aad` (may be empty).
pub fn seal(key: &RootKey, plaintext: &[u8], aad: &[u8]) -> Result<SealedBlob, SealError> {
    let rng = SystemRandom::new();
    let mut iv = [0u8; NONCE_LEN];
    rng.fill(&mut iv).map_err(|_| SealError::Rng)?;

    let aead_key = key.aead_key()?;
    let mut in_out = plaintext.to_vec();
    let tag = aead_key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(iv),
            Aad::from(aad),
            &mut in_out,
        )
        .map_err(|_| SealError::InvalidKey)?;

    Ok(SealedBlob {
        iv: iv.to_vec(),
        data: in_out,
        tag: tag.as_ref().to_vec(),
    })
}

/// Decrypt and verify `blob` under `key` with the same `aad` used to seal.
pub fn unseal(key: &RootKey, blob: &SealedBlob, aad: &[u8]) -> Result<Vec<u8>, SealError> {
    if blob.iv.len() != NONCE_LEN || blob.tag.len() != TAG_LEN {
        return Err(SealError::AuthenticationFailed);
    }
    let nonce = Nonce::try_assume_unique_for_key(&blob.iv)
        .map_err(|_| SealError::AuthenticationFailed)?;

    let aead_key = key.aead_key()?;
    let mut in_out = Vec::with_capacity(blob.data.len() + TAG_LEN);
    in_out.extend_from_slice(&blob.data);
    in_out.extend_from_slice(&blob.tag);

    let plaintext = aead_key
        .open_in_place(nonce, Aad::from(aad), &mut in_out)
        .map_err(|_| SealError::AuthenticationFailed)?;
    Ok(plaintext.to_vec())
}
