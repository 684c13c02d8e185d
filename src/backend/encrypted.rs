// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Encryption layer over any backend.
//!
//! [`EncryptedBackend`] composes with any [`StorageBackend`]: each write
//! encrypts the value under AES-256-GCM with a fresh random 96-bit nonce and
//! stores `nonce || ciphertext`; reads strip the leading nonce and decrypt.
//!
//! Decryption or authentication failure is treated as absence (fail-soft),
//! the same policy as any other backend-level corruption. Key material is
//! supplied by the embedding application and is never generated or persisted
//! here, keeping the core independent of platform credential stores.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use rand::RngCore;
use tracing::warn;

use super::{BackendError, StorageBackend};

/// AES-GCM nonce length in bytes (96 bits).
const NONCE_LEN: usize = 12;

pub struct EncryptedBackend<B: StorageBackend> {
    inner: B,
    cipher: Aes256Gcm,
}

impl<B: StorageBackend> EncryptedBackend<B> {
    /// Wrap `inner` with encryption under the caller-supplied 32-byte key.
    #[must_use]
    pub fn new(inner: B, key: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Self { inner, cipher }
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, BackendError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| BackendError::Backend("encryption failed".into()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn open(&self, key: &str, raw: &[u8]) -> Option<Vec<u8>> {
        if raw.len() < NONCE_LEN {
            warn!(key, "stored value too short to hold a nonce, treating as absent");
            return None;
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        match self.cipher.decrypt(Nonce::from_slice(nonce_bytes), ciphertext) {
            Ok(plaintext) => Some(plaintext),
            Err(_) => {
                warn!(key, "authentication failed, treating as absent");
                None
            }
        }
    }
}

#[async_trait]
impl<B: StorageBackend> StorageBackend for EncryptedBackend<B> {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        let sealed = self.seal(bytes)?;
        self.inner.save(key, &sealed).await
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        match self.inner.load(key).await? {
            Some(raw) => Ok(self.open(key, &raw)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        self.inner.exists(key).await
    }

    async fn clear(&self) -> Result<(), BackendError> {
        self.inner.clear().await
    }

    async fn list_keys(&self) -> Result<Vec<String>, BackendError> {
        self.inner.list_keys().await
    }
}
