// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Typed key-value store.
//!
//! [`Store`] serializes typed values into [`Entry`] envelopes on top of any
//! [`StorageBackend`], emitting a [`StorageEvent`] for every mutation. Reads
//! are fail-soft: absence, decode failure, and backend corruption all read
//! as `None`. Writes surface typed [`StorageError`]s so callers can retry.
//!
//! # Concurrency
//!
//! Writes to the same key are serialized by a per-key mutex; writes to
//! different keys proceed in parallel. `batch`, `clear`, and `restore` take
//! a store-wide write lock, and reads take the read side, so no caller ever
//! observes a half-applied batch or a torn value.
//!
//! [`CachedStore`] composes a [`Cache`] in front: reads consult the cache
//! and repopulate it on miss, writes go through to the backend and refill
//! the cache.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::backend::{BackendError, StorageBackend};
use crate::cache::{Cache, CacheStats};
use crate::config::CachePolicy;
use crate::entry::Entry;
use crate::events::{EventBus, StorageEvent};
use crate::metrics::{self, LatencyTimer};

/// A write-path failure with the failing key and operation attached.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("serialization failed for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation} failed for '{key}': {source}")]
    Backend {
        operation: &'static str,
        key: String,
        #[source]
        source: BackendError,
    },
    #[error("{operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: BackendError,
    },
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

/// One operation inside an atomic [`Store::batch`], applied in order.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Save { key: String, payload: String },
    Delete { key: String },
    Clear,
}

impl BatchOp {
    /// Build a `Save` op, serializing the value up front so a bad value
    /// fails before the batch ever touches the backend.
    pub fn save<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self, StorageError> {
        let key = key.into();
        let payload = serde_json::to_string(value)
            .map_err(|source| StorageError::Serialize { key: key.clone(), source })?;
        Ok(Self::Save { key, payload })
    }

    #[must_use]
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }
}

/// Typed store over a runtime-injected backend.
pub struct Store {
    backend: Arc<dyn StorageBackend>,
    events: EventBus,
    key_locks: dashmap::DashMap<String, Arc<Mutex<()>>>,
    // Read side for key ops, write side for batch/clear/restore.
    global: RwLock<()>,
    marks_encrypted: bool,
}

impl Store {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            events: EventBus::default(),
            key_locks: dashmap::DashMap::new(),
            global: RwLock::new(()),
            marks_encrypted: false,
        }
    }

    /// Mark entries written by this store as encrypted (set when the backend
    /// chain includes the encryption layer).
    #[must_use]
    pub fn marking_encrypted(mut self) -> Self {
        self.marks_encrypted = true;
        self
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Serialize and persist a value. On failure the key's prior value is
    /// left unchanged.
    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let payload = serde_json::to_string(value)
            .map_err(|source| StorageError::Serialize { key: key.to_string(), source })?;
        let entry = Entry::new(payload, self.marks_encrypted);
        self.put_entry(key, entry).await
    }

    /// Persist a prebuilt envelope (the sync engine uses this to preserve
    /// remote timestamps when mirroring a pull).
    pub async fn put_entry(&self, key: &str, entry: Entry) -> Result<(), StorageError> {
        let _timer = LatencyTimer::new("save");
        let _global = self.global.read().await;
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let existed = self
            .backend
            .exists(key)
            .await
            .map_err(|source| backend_err("save", key, source))?;
        self.backend
            .save(key, &entry.to_bytes())
            .await
            .map_err(|source| backend_err("save", key, source))?;

        metrics::record_operation("save", "success");
        self.events.emit(if existed {
            StorageEvent::KeyUpdated(key.to_string())
        } else {
            StorageEvent::KeyAdded(key.to_string())
        });
        Ok(())
    }

    /// Persist an externally-sourced payload, preserving its original write
    /// timestamp (used by the sync engine when mirroring a remote value so
    /// last-write-wins comparisons stay correct).
    pub async fn import_payload(
        &self,
        key: &str,
        payload: String,
        written_at: i64,
    ) -> Result<(), StorageError> {
        self.put_entry(key, Entry::with_timestamp(payload, written_at, self.marks_encrypted))
            .await
    }

    /// Load and deserialize a value. Fail-soft: absence, decode failure, and
    /// backend errors all read as `None`.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.entry(key).await?;
        match serde_json::from_str(&entry.payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "payload failed to deserialize, treating as absent");
                None
            }
        }
    }

    /// Load the raw envelope for a key (fail-soft).
    pub async fn entry(&self, key: &str) -> Option<Entry> {
        let _global = self.global.read().await;
        let bytes = match self.backend.load(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "backend read failed, treating as absent");
                return None;
            }
        };
        let entry = Entry::from_bytes(&bytes);
        if entry.is_none() {
            warn!(key, "corrupt envelope, treating as absent");
        }
        entry
    }

    /// Remove a key. Emits `KeyDeleted` only if it existed.
    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let _global = self.global.read().await;
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let existed = self
            .backend
            .delete(key)
            .await
            .map_err(|source| backend_err("delete", key, source))?;
        if existed {
            metrics::record_operation("delete", "success");
            self.events.emit(StorageEvent::KeyDeleted(key.to_string()));
        }
        Ok(existed)
    }

    /// Remove every entry. Emits exactly one `Cleared` event regardless of
    /// entry count (including zero).
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _global = self.global.write().await;
        self.backend
            .clear()
            .await
            .map_err(|source| StorageError::Store { operation: "clear", source })?;
        metrics::record_operation("clear", "success");
        self.events.emit(StorageEvent::Cleared);
        Ok(())
    }

    /// Fail-soft presence check.
    pub async fn contains(&self, key: &str) -> bool {
        let _global = self.global.read().await;
        self.backend.exists(key).await.unwrap_or(false)
    }

    /// Enumerate stored keys.
    pub async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let _global = self.global.read().await;
        self.backend
            .list_keys()
            .await
            .map_err(|source| StorageError::Store { operation: "list_keys", source })
    }

    /// Sum of stored payload sizes (envelope accounting; approximate but
    /// monotonic with entry count for a fixed value size).
    pub async fn size_bytes(&self) -> Result<usize, StorageError> {
        let keys = self.keys().await?;
        let mut total = 0usize;
        for key in keys {
            if let Some(entry) = self.entry(&key).await {
                total += entry.size_bytes;
            }
        }
        Ok(total)
    }

    /// Apply a list of operations in order, atomically with respect to
    /// every other caller: readers see either none of the batch or all of
    /// it. On failure the pre-batch state is restored before returning.
    pub async fn batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        let _timer = LatencyTimer::new("batch");
        let _global = self.global.write().await;

        // Pre-images for rollback, captured lazily per touched key.
        let mut pre_images: Vec<(String, Option<Vec<u8>>)> = Vec::new();
        let mut staged: HashSet<String> = HashSet::new();
        let mut pending_events: Vec<StorageEvent> = Vec::new();

        let result = self
            .apply_ops(&ops, &mut pre_images, &mut staged, &mut pending_events)
            .await;

        match result {
            Ok(()) => {
                metrics::record_operation("batch", "success");
                for event in pending_events {
                    self.events.emit(event);
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, ops = ops.len(), "batch failed, rolling back");
                metrics::record_operation("batch", "error");
                self.rollback(pre_images).await;
                Err(e)
            }
        }
    }

    async fn apply_ops(
        &self,
        ops: &[BatchOp],
        pre_images: &mut Vec<(String, Option<Vec<u8>>)>,
        staged: &mut HashSet<String>,
        pending_events: &mut Vec<StorageEvent>,
    ) -> Result<(), StorageError> {
        for op in ops {
            match op {
                BatchOp::Save { key, payload } => {
                    self.stash_pre_image(key, pre_images, staged).await?;
                    let existed = self
                        .backend
                        .exists(key)
                        .await
                        .map_err(|source| backend_err("batch", key, source))?;
                    let entry = Entry::new(payload.clone(), self.marks_encrypted);
                    self.backend
                        .save(key, &entry.to_bytes())
                        .await
                        .map_err(|source| backend_err("batch", key, source))?;
                    pending_events.push(if existed {
                        StorageEvent::KeyUpdated(key.clone())
                    } else {
                        StorageEvent::KeyAdded(key.clone())
                    });
                }
                BatchOp::Delete { key } => {
                    self.stash_pre_image(key, pre_images, staged).await?;
                    let existed = self
                        .backend
                        .delete(key)
                        .await
                        .map_err(|source| backend_err("batch", key, source))?;
                    if existed {
                        pending_events.push(StorageEvent::KeyDeleted(key.clone()));
                    }
                }
                BatchOp::Clear => {
                    // Everything is a pre-image now.
                    let keys = self
                        .backend
                        .list_keys()
                        .await
                        .map_err(|source| StorageError::Store { operation: "batch", source })?;
                    for key in keys {
                        self.stash_pre_image(&key, pre_images, staged).await?;
                    }
                    self.backend
                        .clear()
                        .await
                        .map_err(|source| StorageError::Store { operation: "batch", source })?;
                    pending_events.push(StorageEvent::Cleared);
                }
            }
        }
        Ok(())
    }

    async fn stash_pre_image(
        &self,
        key: &str,
        pre_images: &mut Vec<(String, Option<Vec<u8>>)>,
        staged: &mut HashSet<String>,
    ) -> Result<(), StorageError> {
        if staged.contains(key) {
            return Ok(());
        }
        let prior = self
            .backend
            .load(key)
            .await
            .map_err(|source| backend_err("batch", key, source))?;
        pre_images.push((key.to_string(), prior));
        staged.insert(key.to_string());
        Ok(())
    }

    /// Best-effort restore of pre-images, newest first.
    async fn rollback(&self, pre_images: Vec<(String, Option<Vec<u8>>)>) {
        for (key, prior) in pre_images.into_iter().rev() {
            let result = match prior {
                Some(bytes) => self.backend.save(&key, &bytes).await,
                None => self.backend.delete(&key).await.map(|_| ()),
            };
            if let Err(e) = result {
                warn!(key, error = %e, "rollback write failed");
            }
        }
    }

    /// Serialize the full key/value set into a self-describing JSON object
    /// mapping key to serialized payload.
    pub async fn backup(&self) -> Result<String, StorageError> {
        let _timer = LatencyTimer::new("backup");
        let _global = self.global.read().await;

        let keys = self
            .backend
            .list_keys()
            .await
            .map_err(|source| StorageError::Store { operation: "backup", source })?;

        let mut doc = serde_json::Map::new();
        for key in keys {
            let bytes = self
                .backend
                .load(&key)
                .await
                .map_err(|source| backend_err("backup", &key, source))?;
            let Some(bytes) = bytes else { continue };
            // Skip corrupt envelopes rather than aborting the backup.
            if let Some(entry) = Entry::from_bytes(&bytes) {
                doc.insert(key, serde_json::Value::String(entry.payload));
            }
        }

        info!(entries = doc.len(), "backup created");
        Ok(serde_json::Value::Object(doc).to_string())
    }

    /// Clear existing state and repopulate from a [`Store::backup`]
    /// document. Transactional: a malformed document is rejected before any
    /// mutation, and a mid-restore failure rolls back to the prior state.
    pub async fn restore(&self, snapshot: &str) -> Result<(), StorageError> {
        let _timer = LatencyTimer::new("restore");

        // Validate the whole document before touching anything.
        let doc: serde_json::Value = serde_json::from_str(snapshot)
            .map_err(|e| StorageError::MalformedSnapshot(e.to_string()))?;
        let Some(map) = doc.as_object() else {
            return Err(StorageError::MalformedSnapshot(
                "expected a top-level JSON object".into(),
            ));
        };
        let mut payloads: Vec<(String, String)> = Vec::with_capacity(map.len());
        for (key, value) in map {
            let Some(payload) = value.as_str() else {
                return Err(StorageError::MalformedSnapshot(format!(
                    "value for '{key}' is not a string"
                )));
            };
            payloads.push((key.clone(), payload.to_string()));
        }

        let ops = std::iter::once(BatchOp::Clear)
            .chain(payloads.into_iter().map(|(key, payload)| BatchOp::Save { key, payload }))
            .collect::<Vec<_>>();

        debug!(entries = ops.len() - 1, "restoring snapshot");
        self.batch(ops).await
    }
}

fn backend_err(operation: &'static str, key: &str, source: BackendError) -> StorageError {
    metrics::record_operation(operation, "error");
    StorageError::Backend { operation, key: key.to_string(), source }
}

/// A [`Store`] with a [`Cache`] tier in front.
///
/// Reads consult the cache and fall back to the backend on miss,
/// repopulating the cache; writes go through to the backend and refill the
/// cached payload (write-through).
pub struct CachedStore {
    store: Arc<Store>,
    cache: Cache,
}

impl CachedStore {
    #[must_use]
    pub fn new(store: Arc<Store>, policy: CachePolicy) -> Self {
        Self { store, cache: Cache::new(policy) }
    }

    /// The underlying store (for subscriptions, batch, backup/restore).
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Direct access to the cache tier.
    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let payload = serde_json::to_string(value)
            .map_err(|source| StorageError::Serialize { key: key.to_string(), source })?;
        self.store
            .put_entry(key, Entry::new(payload.clone(), self.store.marks_encrypted))
            .await?;
        self.cache.put(key, payload, Some(self.cache.default_ttl()));
        Ok(())
    }

    /// Cache-first read with miss repopulation.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(payload) = self.cache.get(key) {
            match serde_json::from_str(&payload) {
                Ok(value) => return Some(value),
                Err(_) => {
                    // Cached payload no longer matches the requested type.
                    self.cache.invalidate(key);
                }
            }
        }

        let entry = self.store.entry(key).await?;
        let value = serde_json::from_str(&entry.payload).ok()?;
        self.cache.put(key, entry.payload, Some(self.cache.default_ttl()));
        Some(value)
    }

    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.cache.invalidate(key);
        self.store.delete(key).await
    }

    /// Clear both tiers. Cache stats are preserved (see [`Cache::clear`]).
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.cache.clear(false);
        self.store.clear().await
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
    }

    fn store() -> Store {
        Store::new(Arc::new(MemoryBackend::new()))
    }

    fn profile() -> Profile {
        Profile { name: "Ada".into(), age: 36 }
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = store();
        store.save("user", &profile()).await.unwrap();

        let loaded: Option<Profile> = store.load("user").await;
        assert_eq!(loaded, Some(profile()));
    }

    #[tokio::test]
    async fn test_load_absent_key_is_none() {
        let store = store();
        let loaded: Option<Profile> = store.load("missing").await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_wrong_type_is_none() {
        let store = store();
        store.save("n", &42u32).await.unwrap();

        let loaded: Option<Profile> = store.load("n").await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_backend_value_reads_as_absent() {
        let backend = Arc::new(MemoryBackend::new());
        backend.save("bad", b"\xff\xfenot an envelope").await.unwrap();

        let store = Store::new(backend);
        let loaded: Option<Profile> = store.load("bad").await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_emits_added_then_updated() {
        let store = store();
        let mut rx = store.subscribe();

        store.save("k", &1u32).await.unwrap();
        store.save("k", &2u32).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), StorageEvent::KeyAdded("k".into()));
        assert_eq!(rx.recv().await.unwrap(), StorageEvent::KeyUpdated("k".into()));
    }

    #[tokio::test]
    async fn test_delete_emits_only_if_existed() {
        let store = store();
        let mut rx = store.subscribe();

        assert!(!store.delete("ghost").await.unwrap());
        store.save("k", &1u32).await.unwrap();
        assert!(store.delete("k").await.unwrap());

        assert_eq!(rx.recv().await.unwrap(), StorageEvent::KeyAdded("k".into()));
        assert_eq!(rx.recv().await.unwrap(), StorageEvent::KeyDeleted("k".into()));
    }

    #[tokio::test]
    async fn test_clear_emits_exactly_one_event_even_when_empty() {
        let store = store();
        let mut rx = store.subscribe();

        store.clear().await.unwrap();
        store.save("k", &1u32).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), StorageEvent::Cleared);
        assert_eq!(rx.recv().await.unwrap(), StorageEvent::KeyAdded("k".into()));
        assert_eq!(rx.recv().await.unwrap(), StorageEvent::Cleared);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_batch_applies_in_order() {
        let store = store();

        store
            .batch(vec![
                BatchOp::save("a", &1u32).unwrap(),
                BatchOp::save("b", &2u32).unwrap(),
                BatchOp::delete("a"),
                BatchOp::save("c", &3u32).unwrap(),
            ])
            .await
            .unwrap();

        assert!(!store.contains("a").await);
        assert_eq!(store.load::<u32>("b").await, Some(2));
        assert_eq!(store.load::<u32>("c").await, Some(3));
    }

    #[tokio::test]
    async fn test_batch_clear_then_save() {
        let store = store();
        store.save("old", &0u32).await.unwrap();

        store
            .batch(vec![BatchOp::Clear, BatchOp::save("new", &1u32).unwrap()])
            .await
            .unwrap();

        assert!(!store.contains("old").await);
        assert_eq!(store.load::<u32>("new").await, Some(1));
    }

    #[tokio::test]
    async fn test_size_is_monotonic_with_entry_count() {
        let store = store();

        let mut last = store.size_bytes().await.unwrap();
        for i in 0..5 {
            store.save(&format!("k{}", i), &"fixed-size-value").await.unwrap();
            let size = store.size_bytes().await.unwrap();
            assert!(size > last);
            last = size;
        }
    }

    #[tokio::test]
    async fn test_backup_restore_round_trip() {
        let store = store();
        store.save("user", &profile()).await.unwrap();
        store.save("count", &7u32).await.unwrap();

        let snapshot = store.backup().await.unwrap();

        let fresh = Store::new(Arc::new(MemoryBackend::new()));
        fresh.restore(&snapshot).await.unwrap();

        assert_eq!(fresh.load::<Profile>("user").await, Some(profile()));
        assert_eq!(fresh.load::<u32>("count").await, Some(7));
        let mut keys = fresh.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["count", "user"]);
    }

    #[tokio::test]
    async fn test_restore_rejects_malformed_document_without_clearing() {
        let store = store();
        store.save("keep", &1u32).await.unwrap();

        assert!(store.restore("not json").await.is_err());
        assert!(store.restore("[1,2,3]").await.is_err());
        assert!(store.restore(r#"{"k": 42}"#).await.is_err());

        // Prior state untouched
        assert_eq!(store.load::<u32>("keep").await, Some(1));
    }

    #[tokio::test]
    async fn test_parallel_writers_to_distinct_keys() {
        let store = Arc::new(store());
        let mut handles = vec![];

        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.save(&format!("k{}", i), &i).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.keys().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_cached_store_read_through_and_repopulation() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Arc::new(Store::new(backend));
        let cached = CachedStore::new(store.clone(), CachePolicy::default());

        // Write bypassing the cache front
        store.save("k", &profile()).await.unwrap();

        // First read misses and repopulates
        assert_eq!(cached.load::<Profile>("k").await, Some(profile()));
        assert_eq!(cached.stats().miss_count, 1);

        // Second read hits
        assert_eq!(cached.load::<Profile>("k").await, Some(profile()));
        assert_eq!(cached.stats().hit_count, 1);
    }

    #[tokio::test]
    async fn test_cached_store_write_through() {
        let store = Arc::new(store());
        let cached = CachedStore::new(store, CachePolicy::default());

        cached.save("k", &profile()).await.unwrap();

        // Served from cache without touching the backend path
        assert_eq!(cached.load::<Profile>("k").await, Some(profile()));
        assert_eq!(cached.stats().hit_count, 1);
        assert_eq!(cached.stats().miss_count, 0);
    }

    #[tokio::test]
    async fn test_cached_store_save_applies_policy_default_ttl() {
        let store = Arc::new(store());
        let cached = CachedStore::new(
            store,
            CachePolicy {
                max_size_bytes: 1024,
                default_ttl_ms: 30,
                eviction: crate::cache::EvictionPolicy::Lru,
            },
        );

        cached.save("k", &1u32).await.unwrap();
        assert!(cached.cache().is_valid("k"));

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        assert!(!cached.cache().is_valid("k"));
    }

    #[tokio::test]
    async fn test_cached_store_delete_invalidates() {
        let store = Arc::new(store());
        let cached = CachedStore::new(store, CachePolicy::default());

        cached.save("k", &1u32).await.unwrap();
        cached.delete("k").await.unwrap();

        assert_eq!(cached.load::<u32>("k").await, None);
        assert!(!cached.cache().is_valid("k"));
    }

    #[tokio::test]
    async fn test_store_never_returns_value_absent_from_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Arc::new(Store::new(backend.clone()));
        let cached = CachedStore::new(store, CachePolicy::default());

        cached.save("k", &1u32).await.unwrap();
        // Underlying data vanishes out from under the cache
        backend.delete("k").await.unwrap();

        // The uncached store view must report absence
        assert_eq!(cached.store().load::<u32>("k").await, None);
    }
}
