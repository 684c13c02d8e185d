//! # Syncstore
//!
//! A cross-platform persistence core: a typed key-value store with an
//! in-process cache tier (TTL expiration, pluggable eviction), change
//! notification, and a best-effort sync engine that reconciles local state
//! with a remote store under intermittent connectivity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Callers                              │
//! │  • save/load/delete/batch via Store or CachedStore          │
//! │  • observe StorageEvents via broadcast subscription         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Cache Tier (optional)                     │
//! │  • Byte-budgeted DashMap with TTL expiration                │
//! │  • LRU / LFU / FIFO / RANDOM eviction before insert         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                     (miss → repopulate)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Typed Store                            │
//! │  • Entry envelopes: payload + write timestamp               │
//! │  • Atomic batch / backup / restore                          │
//! │  • Per-key write locks, store-wide lock for batches         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Backend Adapter                           │
//! │  • Memory / File / Prefs (base64) / Encrypted (AES-GCM)     │
//! │  • Runtime-injected trait object, no compile-time selection │
//! └─────────────────────────────────────────────────────────────┘
//!
//!        SyncEngine ──(push/pull/bidirectional, LWW)──▶ RemoteStore
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use syncstore::{MemoryBackend, Store, StorageEvent};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let store = Store::new(Arc::new(MemoryBackend::new()));
//!     let mut events = store.subscribe();
//!
//!     store.save("greeting", &"hello").await.expect("save failed");
//!     assert_eq!(store.load::<String>("greeting").await.as_deref(), Some("hello"));
//!
//!     assert_eq!(events.recv().await.unwrap(), StorageEvent::KeyAdded("greeting".into()));
//! }
//! ```
//!
//! ## Design Points
//!
//! - **Fail-soft reads**: absence, decode failure, and decrypt failure all
//!   read as `None`; storage-format concerns never reach application logic.
//! - **Typed write errors**: save/batch/restore return [`StorageError`] so
//!   callers can retry or alert.
//! - **Atomic batches**: a [`Store::batch`] is all-or-nothing to observers.
//! - **Best-effort events**: slow subscribers lag instead of blocking
//!   writers.
//! - **Non-fatal sync**: failures accumulate in the [`SyncStatus`] stream;
//!   the engine never throws.
//!
//! ## Modules
//!
//! - [`backend`]: storage media (memory, file, prefs, encrypted)
//! - [`store`]: the typed store and cache-fronted variant
//! - [`cache`]: TTL + eviction cache tier
//! - [`sync`]: the sync engine and remote contract
//! - [`events`]: change notification
//! - [`config`]: cache and sync policies
//! - [`metrics`]: `metrics`-facade instrumentation

pub mod backend;
pub mod cache;
pub mod config;
pub mod entry;
pub mod events;
pub mod metrics;
pub mod store;
pub mod sync;

pub use backend::encrypted::EncryptedBackend;
pub use backend::file::FileBackend;
pub use backend::memory::MemoryBackend;
pub use backend::prefs::{MemoryTextStore, PrefsBackend, TextStore};
pub use backend::{BackendError, StorageBackend};
pub use cache::{Cache, CacheEntry, CacheStats, EvictionPolicy};
pub use config::{CachePolicy, SyncPolicy};
pub use entry::Entry;
pub use events::{EventBus, StorageEvent};
pub use metrics::LatencyTimer;
pub use store::{BatchOp, CachedStore, StorageError, Store};
pub use sync::remote::{MemoryRemote, RemoteRecord, RemoteStore, SyncError};
pub use sync::{SyncEngine, SyncHandle, SyncResult, SyncState, SyncStatus};
