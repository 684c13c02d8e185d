//! Remote store contract and in-memory stub.
//!
//! The sync engine talks to the remote side through [`RemoteStore`]; a real
//! backend (HTTP service, cloud KV, peer device) is supplied by the
//! embedding application. [`MemoryRemote`] is the reference implementation
//! used in tests, with fault injection for failure-path coverage.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

/// Network or remote-rejection failure. Always non-fatal: the engine
/// records it and keeps running.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),
    #[error("remote rejected the operation: {0}")]
    Rejected(String),
    #[error("engine is offline")]
    Offline,
    #[error("key '{0}' not found")]
    NotFound(String),
}

/// A remote copy of one key: the serialized payload plus its write
/// timestamp, which last-write-wins comparisons run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub payload: String,
    pub written_at: i64,
}

/// Minimal per-key remote contract.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the remote record for a key, `None` if the remote has none.
    async fn fetch(&self, key: &str) -> Result<Option<RemoteRecord>, SyncError>;

    /// Overwrite the remote record for a key.
    async fn push(&self, key: &str, record: RemoteRecord) -> Result<(), SyncError>;
}

/// In-memory remote stub with deterministic fault injection.
#[derive(Default)]
pub struct MemoryRemote {
    data: DashMap<String, RemoteRecord>,
    /// Number of upcoming operations that fail with a network error.
    fail_next: AtomicU32,
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` operations fail with a network error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Seed a record directly, bypassing fault injection.
    pub fn insert(&self, key: &str, record: RemoteRecord) {
        self.data.insert(key.to_string(), record);
    }

    /// Peek at a record directly, bypassing fault injection.
    #[must_use]
    pub fn record(&self, key: &str) -> Option<RemoteRecord> {
        self.data.get(key).map(|r| r.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn maybe_fail(&self) -> Result<(), SyncError> {
        let remaining = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if remaining {
            Err(SyncError::Network("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch(&self, key: &str) -> Result<Option<RemoteRecord>, SyncError> {
        self.maybe_fail()?;
        Ok(self.data.get(key).map(|r| r.value().clone()))
    }

    async fn push(&self, key: &str, record: RemoteRecord) -> Result<(), SyncError> {
        self.maybe_fail()?;
        self.data.insert(key.to_string(), record);
        Ok(())
    }
}
