//! Backend adapter for text-only preference stores.
//!
//! Platform preference stores (NSUserDefaults, SharedPreferences, the
//! Windows registry) hold strings, not bytes. [`PrefsBackend`] adapts any
//! such store to the binary-safe [`StorageBackend`] contract by
//! base64-encoding values transparently. A value that fails to decode reads
//! as absent, never as an error: somebody else's string in the store must
//! not crash us.
//!
//! The embedding application supplies the platform handle as a [`TextStore`]
//! at construction time; there is no ambient global to reach through.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dashmap::DashMap;
use tracing::debug;

use super::{BackendError, StorageBackend};

/// A string-only key-value medium, typically a platform preference store.
///
/// Operations are synchronous because the platform APIs they wrap are; the
/// [`PrefsBackend`] adapter keeps the async contract above it.
pub trait TextStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;
    /// Remove a key, returning whether it existed.
    fn remove(&self, key: &str) -> bool;
    fn keys(&self) -> Vec<String>;
    fn clear(&self) -> Result<(), BackendError>;
}

/// Adapts a [`TextStore`] to the binary-safe backend contract.
pub struct PrefsBackend<S: TextStore> {
    store: S,
}

impl<S: TextStore> PrefsBackend<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: TextStore> StorageBackend for PrefsBackend<S> {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        self.store.set(key, &STANDARD.encode(bytes))
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let Some(text) = self.store.get(key) else {
            return Ok(None);
        };
        match STANDARD.decode(&text) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(_) => {
                // Not ours (or damaged): treat as absent.
                debug!(key, "undecodable preference value treated as absent");
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.store.remove(key))
    }

    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.store.get(key).is_some())
    }

    async fn clear(&self) -> Result<(), BackendError> {
        self.store.clear()
    }

    async fn list_keys(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.store.keys())
    }
}

/// In-memory [`TextStore`], standing in for a platform preference store in
/// tests and on targets without one.
#[derive(Default)]
pub struct MemoryTextStore {
    data: DashMap<String, String>,
}

impl MemoryTextStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextStore for MemoryTextStore {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.data.iter().map(|r| r.key().clone()).collect()
    }

    fn clear(&self) -> Result<(), BackendError> {
        self.data.clear();
        Ok(())
    }
}
