use async_trait::async_trait;
use dashmap::DashMap;

use super::{BackendError, StorageBackend};

/// Volatile in-process backend backed by a concurrent map.
///
/// Useful as a cache substrate, for tests, and as the reference
/// implementation of the [`StorageBackend`] contract.
pub struct MemoryBackend {
    data: DashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Get current key count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        self.data.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.data.get(key).map(|r| r.value().clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.data.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.data.contains_key(key))
    }

    async fn clear(&self) -> Result<(), BackendError> {
        self.data.clear();
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.data.iter().map(|r| r.key().clone()).collect())
    }
}
