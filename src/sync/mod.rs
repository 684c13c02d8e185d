// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Best-effort synchronization engine.
//!
//! Reconciles a local [`Store`] with a [`RemoteStore`] under intermittent
//! connectivity, using last-write-wins on entry timestamps (no merge).
//!
//! # State machine
//!
//! ```text
//!            set_online(false)
//!   ┌────────────────────────────────┐
//!   │                                ▼
//! Idle ──sync op──▶ Syncing      Offline
//!   ▲                  │             │
//!   └──────────────────┘             │
//!   ▲        done                    │
//!   └────────────────────────────────┘
//!            set_online(true)
//! ```
//!
//! Sync is never attempted while `Offline`: an op called offline fails fast
//! with `success = false`, increments `failed_count`, and the status stream
//! reports the `Offline` state without ever passing through `Syncing`.
//!
//! Failures are recorded, never thrown: the engine keeps running, and the
//! caller decides whether to retry. The background loop retries a pending
//! key at most `retry_limit` times before giving up on it until it is
//! dirtied again.

pub mod remote;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SyncPolicy;
use crate::entry::epoch_millis;
use crate::events::StorageEvent;
use crate::metrics;
use crate::store::Store;
use remote::{RemoteRecord, RemoteStore, SyncError};

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Online, no sync in flight
    Idle,
    /// A sync operation is running
    Syncing,
    /// Network unavailable; sync ops fail fast
    Offline,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Syncing => write!(f, "Syncing"),
            Self::Offline => write!(f, "Offline"),
        }
    }
}

/// Snapshot of engine status, published on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    /// Epoch millis of the last successful sync, if any
    pub last_sync_time: Option<i64>,
    /// Keys dirtied locally and awaiting reconciliation
    pub pending_count: usize,
    /// Cumulative failed sync operations
    pub failed_count: u64,
}

impl SyncStatus {
    fn initial() -> Self {
        Self {
            is_online: true,
            is_syncing: false,
            last_sync_time: None,
            pending_count: 0,
            failed_count: 0,
        }
    }
}

/// Outcome of one per-key sync operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub key: String,
    pub success: bool,
    /// Epoch millis when the operation completed
    pub timestamp: i64,
    pub error: Option<String>,
}

/// Reconciles one local store with one remote counterpart.
///
/// Independently constructed and lifetime-managed: no global state, all
/// policy passed explicitly.
pub struct SyncEngine {
    local: Arc<Store>,
    remote: Arc<dyn RemoteStore>,
    policy: SyncPolicy,
    state: Mutex<SyncState>,
    /// Dirty keys -> failed background attempts so far
    pending: DashMap<String, u32>,
    failed_count: AtomicU64,
    last_sync_time: Mutex<Option<i64>>,
    status_tx: watch::Sender<SyncStatus>,
    status_rx: watch::Receiver<SyncStatus>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(local: Arc<Store>, remote: Arc<dyn RemoteStore>, policy: SyncPolicy) -> Self {
        let (status_tx, status_rx) = watch::channel(SyncStatus::initial());
        Self {
            local,
            remote,
            policy,
            state: Mutex::new(SyncState::Idle),
            pending: DashMap::new(),
            failed_count: AtomicU64::new(0),
            last_sync_time: Mutex::new(None),
            status_tx,
            status_rx,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.lock()
    }

    /// Latest status snapshot.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status_rx.borrow().clone()
    }

    /// Watch status snapshots; one is published on every transition.
    #[must_use]
    pub fn status_receiver(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state() != SyncState::Offline
    }

    /// Drive the state machine from network availability events:
    /// online moves `Offline -> Idle`, offline moves any state to `Offline`.
    pub fn set_online(&self, online: bool) {
        {
            let mut state = self.state.lock();
            if online {
                if *state == SyncState::Offline {
                    *state = SyncState::Idle;
                    info!("network online, sync resumed");
                }
            } else if *state != SyncState::Offline {
                *state = SyncState::Offline;
                info!("network offline, sync suspended");
            }
        }
        self.publish();
    }

    /// Mark a key as locally dirty, scheduling it for the next cycle.
    pub fn mark_dirty(&self, key: &str) {
        self.pending.insert(key.to_string(), 0);
        self.publish();
    }

    /// Keys awaiting reconciliation.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Push the local value for `key` to the remote.
    pub async fn sync_to_remote(&self, key: &str) -> SyncResult {
        if !self.enter_syncing() {
            return self.offline_result("push", key);
        }
        let outcome = self.push_key(key).await;
        self.finish("push", key, outcome)
    }

    /// Pull the remote value for `key` and overwrite local (last-write-wins,
    /// no merge).
    pub async fn sync_from_remote(&self, key: &str) -> SyncResult {
        if !self.enter_syncing() {
            return self.offline_result("pull", key);
        }
        let outcome = self.pull_key(key).await;
        self.finish("pull", key, outcome)
    }

    /// Keep whichever side has the newer timestamp and write the other side
    /// to match. Equal timestamps prefer the remote copy.
    pub async fn bidirectional_sync(&self, key: &str) -> SyncResult {
        if !self.enter_syncing() {
            return self.offline_result("bidirectional", key);
        }
        let outcome = self.reconcile_key(key).await;
        self.finish("bidirectional", key, outcome)
    }

    /// Reconcile each key independently; one key's failure does not abort
    /// the others. Partial success is expected and reported per key.
    pub async fn batch_sync(&self, keys: &[String]) -> Vec<SyncResult> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.bidirectional_sync(key).await);
        }
        results
    }

    /// Spawn the background loop: listens for local change events and
    /// periodically reconciles pending keys. Returns a handle whose
    /// [`SyncHandle::shutdown`] cancels the loop mid-cycle without
    /// corrupting local state (already-committed keys stay committed).
    #[must_use]
    pub fn spawn(self: &Arc<Self>) -> SyncHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let engine = Arc::clone(self);
        let mut events = engine.local.subscribe();

        let handle = tokio::spawn(async move {
            let mut tick =
                tokio::time::interval(Duration::from_millis(engine.policy.interval_ms.max(1)));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so a fresh engine
            // waits a full interval before its first cycle.
            tick.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("sync loop shutting down");
                        break;
                    }
                    event = events.recv() => match event {
                        Ok(StorageEvent::Cleared) => {
                            engine.pending.clear();
                            engine.publish();
                        }
                        Ok(event) => {
                            if let Some(key) = event.key() {
                                engine.mark_dirty(key);
                            }
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "event stream lagged, some keys may not be scheduled");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = tick.tick() => {
                        engine.sync_pending(&shutdown_rx).await;
                    }
                }
            }
        });

        SyncHandle { shutdown: shutdown_tx, handle }
    }

    /// One background cycle over the pending set.
    async fn sync_pending(&self, shutdown: &watch::Receiver<bool>) {
        if !self.is_online() {
            return;
        }
        let keys: Vec<String> = self.pending.iter().map(|r| r.key().clone()).collect();
        if keys.is_empty() {
            return;
        }
        debug!(pending = keys.len(), "sync cycle start");

        for key in keys {
            if *shutdown.borrow() {
                debug!("sync cycle cancelled");
                return;
            }
            let result = self.bidirectional_sync(&key).await;
            if !result.success {
                let attempts = self
                    .pending
                    .get_mut(&key)
                    .map(|mut r| {
                        *r += 1;
                        *r
                    })
                    .unwrap_or(0);
                if attempts >= self.policy.retry_limit {
                    warn!(key, attempts, "giving up on key until it is dirtied again");
                    self.pending.remove(&key);
                    self.publish();
                }
            }
        }
    }

    // ── per-key operations ────────────────────────────────────────────────

    async fn push_key(&self, key: &str) -> Result<(), SyncError> {
        let entry = self
            .local
            .entry(key)
            .await
            .ok_or_else(|| SyncError::NotFound(key.to_string()))?;
        self.remote
            .push(key, RemoteRecord { payload: entry.payload, written_at: entry.written_at })
            .await
    }

    async fn pull_key(&self, key: &str) -> Result<(), SyncError> {
        let record = self
            .remote
            .fetch(key)
            .await?
            .ok_or_else(|| SyncError::NotFound(key.to_string()))?;
        self.write_local(key, record).await
    }

    async fn reconcile_key(&self, key: &str) -> Result<(), SyncError> {
        let local = self.local.entry(key).await;
        let remote = self.remote.fetch(key).await?;

        match (local, remote) {
            (None, None) => Err(SyncError::NotFound(key.to_string())),
            (Some(entry), None) => {
                self.remote
                    .push(
                        key,
                        RemoteRecord { payload: entry.payload, written_at: entry.written_at },
                    )
                    .await
            }
            (None, Some(record)) => self.write_local(key, record).await,
            (Some(entry), Some(record)) => {
                if entry.written_at > record.written_at {
                    self.remote
                        .push(
                            key,
                            RemoteRecord { payload: entry.payload, written_at: entry.written_at },
                        )
                        .await
                } else if entry.written_at == record.written_at && entry.payload == record.payload {
                    // Already converged; avoid a self-dirtying local write.
                    Ok(())
                } else {
                    // Remote newer, or equal timestamps (remote wins ties).
                    self.write_local(key, record).await
                }
            }
        }
    }

    async fn write_local(&self, key: &str, record: RemoteRecord) -> Result<(), SyncError> {
        self.local
            .import_payload(key, record.payload, record.written_at)
            .await
            .map_err(|e| SyncError::Rejected(format!("local write failed: {e}")))
    }

    // ── state machine plumbing ────────────────────────────────────────────

    /// Transition into `Syncing` if online. Returns false while `Offline`.
    fn enter_syncing(&self) -> bool {
        {
            let mut state = self.state.lock();
            if *state == SyncState::Offline {
                return false;
            }
            *state = SyncState::Syncing;
        }
        self.publish();
        true
    }

    fn offline_result(&self, direction: &'static str, key: &str) -> SyncResult {
        self.failed_count.fetch_add(1, Ordering::Relaxed);
        metrics::record_sync_result(direction, false);
        // Status stream reports Offline without passing through Syncing.
        self.publish();
        SyncResult {
            key: key.to_string(),
            success: false,
            timestamp: epoch_millis(),
            error: Some(SyncError::Offline.to_string()),
        }
    }

    fn finish(
        &self,
        direction: &'static str,
        key: &str,
        outcome: Result<(), SyncError>,
    ) -> SyncResult {
        {
            let mut state = self.state.lock();
            if *state == SyncState::Syncing {
                *state = SyncState::Idle;
            }
        }
        let timestamp = epoch_millis();
        let result = match outcome {
            Ok(()) => {
                *self.last_sync_time.lock() = Some(timestamp);
                self.pending.remove(key);
                metrics::record_sync_result(direction, true);
                SyncResult { key: key.to_string(), success: true, timestamp, error: None }
            }
            Err(e) => {
                self.failed_count.fetch_add(1, Ordering::Relaxed);
                metrics::record_sync_result(direction, false);
                debug!(key, direction, error = %e, "sync failed");
                SyncResult {
                    key: key.to_string(),
                    success: false,
                    timestamp,
                    error: Some(e.to_string()),
                }
            }
        };
        self.publish();
        result
    }

    fn publish(&self) {
        let state = *self.state.lock();
        let failed = self.failed_count.load(Ordering::Relaxed);
        let status = SyncStatus {
            is_online: state != SyncState::Offline,
            is_syncing: state == SyncState::Syncing,
            last_sync_time: *self.last_sync_time.lock(),
            pending_count: self.pending.len(),
            failed_count: failed,
        };
        metrics::set_sync_pending(status.pending_count);
        metrics::set_sync_failed(failed);
        self.status_tx.send_replace(status);
    }
}

/// Handle over the spawned background loop.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SyncHandle {
    /// Signal the loop to stop and wait for it. In-flight per-key syncs may
    /// simply not complete; already-committed keys remain correct.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
