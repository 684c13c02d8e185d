// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Raw key-value backends.
//!
//! A [`StorageBackend`] is the minimal byte-level primitive a storage medium
//! exposes: save/load/delete/exists/clear/list. Everything typed lives above
//! it in [`Store`](crate::Store).
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Backend Module                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  memory.rs     - MemoryBackend: DashMap, volatile            │
//! │  file.rs       - FileBackend: one file per key, compact()    │
//! │  prefs.rs      - PrefsBackend: text-only stores, base64      │
//! │  encrypted.rs  - EncryptedBackend: AES-256-GCM wrapper       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backends are chosen at runtime by the embedding application and injected
//! as `Arc<dyn StorageBackend>`; there is no compile-time selection.
//!
//! All backends are binary-safe. Media that can only hold text (preference
//! stores) base64-encode transparently and treat decode failure as absent.

pub mod encrypted;
pub mod file;
pub mod memory;
pub mod prefs;

use async_trait::async_trait;
use thiserror::Error;

/// I/O or encoding failure at the backend level.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Abstract raw storage primitive.
///
/// Implementations must be thread-safe (`Send + Sync`) and tolerate
/// concurrent calls. Reads of corrupt data return `Ok(None)`, never an
/// error: storage-format concerns stop here.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store raw bytes under a key, overwriting any previous value.
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError>;

    /// Load the raw bytes for a key, or `None` if absent (or undecodable).
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Remove a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, BackendError>;

    /// Check presence without loading the value.
    ///
    /// Default implementation loads and discards; backends with a cheaper
    /// path should override.
    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.load(key).await?.is_some())
    }

    /// Remove every key.
    async fn clear(&self) -> Result<(), BackendError>;

    /// Enumerate all stored keys (unordered).
    async fn list_keys(&self) -> Result<Vec<String>, BackendError>;
}

// Shared backends (and wrappers over shared backends) are the common case.
#[async_trait]
impl<B: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<B> {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        (**self).save(key, bytes).await
    }
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        (**self).load(key).await
    }
    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        (**self).delete(key).await
    }
    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        (**self).exists(key).await
    }
    async fn clear(&self) -> Result<(), BackendError> {
        (**self).clear().await
    }
    async fn list_keys(&self) -> Result<Vec<String>, BackendError> {
        (**self).list_keys().await
    }
}
