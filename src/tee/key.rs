// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Root key derivation.
//!
//! The backend returns at least 256 bits of key material for
//! `(path, purpose)`. The first 32 bytes are used twice:
//!
//! - as the AES-256-GCM root key for sealed storage
//! - as a secp256k1 scalar whose public key (with the backend's signature
//!   chain) identifies the oracle to verifiers
//!
//! The secret half is never returned by any endpoint.

use k256::ecdsa::{signature::Signer, Signature, SigningKey};

use super::{TeeBackend, TeeError};
use crate::crypto::{RootKey, ROOT_KEY_LEN};

/// Minimum key length accepted from the backend, in hex characters.
pub const MIN_KEY_HEX_LEN: usize = ROOT_KEY_LEN * 2;

/// Key material derived from one `GetKey` call.
#[derive(Clone)]
pub struct DerivedKey {
    root: RootKey,
    signing_key: SigningKey,
    signature_chain: Vec<String>,
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("public_key", &self.public_key_hex())
            .field("signature_chain", &self.signature_chain)
            .finish_non_exhaustive()
    }
}

impl DerivedKey {
    /// Parse a raw `GetKey` answer.
    ///
    /// Fails if the key is shorter than 256 bits, is not hex, or is not a
    /// valid secp256k1 scalar.
    pub fn from_backend(key_hex: &str, signature_chain: Vec<String>) -> Result<Self, TeeError> {
        let key_hex = key_hex.trim_start_matches("0x");
        if key_hex.len() < MIN_KEY_HEX_LEN {
            return Err(TeeError::Malformed(format!(
                "derived key is {} hex chars, need at least {MIN_KEY_HEX_LEN}",
                key_hex.len()
            )));
        }

        let bytes = key_hex
            .get(..MIN_KEY_HEX_LEN)
            .and_then(|prefix| hex::decode(prefix).ok())
            .ok_or_else(|| TeeError::Malformed("derived key is not hex".to_string()))?;

        let root = RootKey::from_slice(&bytes)
            .ok_or_else(|| TeeError::Malformed("derived key has wrong length".to_string()))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| TeeError::Malformed("derived key is not a valid scalar".to_string()))?;

        Ok(Self {
            root,
            signing_key,
            signature_chain,
        })
    }

    pub fn root(&self) -> &RootKey {
        &self.root
    }

    /// Compressed SEC1 public key, hex encoded with `0x` prefix.
    pub fn public_key_hex(&self) -> String {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        format!("0x{}", hex::encode(point.as_bytes()))
    }

    pub fn signature_chain(&self) -> &[String] {
        &self.signature_chain
    }

    /// ECDSA (secp256k1, SHA-256) signature over `message`, hex encoded.
    pub fn sign(&self, message: &[u8]) -> String {
        let signature: Signature = self.signing_key.sign(message);
        format!("0x{}", hex::encode(signature.to_bytes()))
    }
}

/// Ask the backend for the key at `(path, purpose)`.
pub async fn derive_key(
    backend: &TeeBackend,
    path: &str,
    purpose: &str,
) -> Result<DerivedKey, TeeError> {
    let response = backend.get_key(path, purpose).await?;
    DerivedKey::from_backend(&response.key, response.signature_chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tee::SimulatedBackend;
    use k256::ecdsa::{signature::Verifier, VerifyingKey};

    const KEY_HEX: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn short_key_is_rejected() {
        let err = DerivedKey::from_backend("abcd", vec![]).unwrap_err();
        assert!(matches!(err, TeeError::Malformed(_)));
    }

    #[test]
    fn non_hex_key_is_rejected() {
        let err = DerivedKey::from_backend(&"zz".repeat(32), vec![]).unwrap_err();
        assert!(matches!(err, TeeError::Malformed(_)));
    }

    #[test]
    fn longer_key_uses_first_32_bytes() {
        let long = format!("{KEY_HEX}{}", "ff".repeat(32));
        let a = DerivedKey::from_backend(&long, vec![]).unwrap();
        let b = DerivedKey::from_backend(KEY_HEX, vec![]).unwrap();
        assert_eq!(a.root(), b.root());
        assert_eq!(a.public_key_hex(), b.public_key_hex());
    }

    #[test]
    fn public_key_is_compressed_sec1() {
        let key = DerivedKey::from_backend(KEY_HEX, vec!["aa".into(), "bb".into()]).unwrap();
        let public = key.public_key_hex();
        assert_eq!(public.len(), 2 + 66);
        assert!(public.starts_with("0x02") || public.starts_with("0x03"));
        assert_eq!(key.signature_chain(), ["aa".to_string(), "bb".to_string()]);
    }

    #[test]
    fn signature_verifies_under_public_key() {
        let key = DerivedKey::from_backend(KEY_HEX, vec![]).unwrap();
        let signature = key.sign(b"report bytes");

        let public = hex::decode(key.public_key_hex().trim_start_matches("0x")).unwrap();
        let verifying = VerifyingKey::from_sec1_bytes(&public).unwrap();
        let sig_bytes = hex::decode(signature.trim_start_matches("0x")).unwrap();
        let sig = Signature::from_slice(&sig_bytes).unwrap();

        assert!(verifying.verify(b"report bytes", &sig).is_ok());
        assert!(verifying.verify(b"other bytes", &sig).is_err());
    }

    #[test]
    fn debug_omits_secret() {
        let key = DerivedKey::from_backend(KEY_HEX, vec![]).unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains(KEY_HEX));
    }

    #[tokio::test]
    async fn derivation_is_deterministic_across_restarts() {
        let backend = TeeBackend::Simulated(SimulatedBackend::new("enclave"));
        let first = derive_key(&backend, "/oracle", "signing").await.unwrap();
        let second = derive_key(&backend, "/oracle", "signing").await.unwrap();
        assert_eq!(first.root(), second.root());
    }

    #[tokio::test]
    async fn unavailable_backend_fails_derivation() {
        let sim = SimulatedBackend::new("enclave");
        sim.set_available(false);
        let backend = TeeBackend::Simulated(sim);
        assert!(derive_key(&backend, "/oracle", "signing").await.is_err());
    }
}
