//! In-process cache tier.
//!
//! A byte-budgeted hot layer that sits in front of a [`Store`](crate::Store).
//! Entries carry a TTL (absent or zero = never expires) and access metadata;
//! when an insert would exceed the configured budget, victims are evicted
//! *before* the insert according to the configured [`EvictionPolicy`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Cache Module                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  mod.rs     - Cache: DashMap entries, stats, TTL checks      │
//! │  policy.rs  - EvictionPolicy: LRU / LFU / FIFO / RANDOM      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expiration is lazy: an expired entry is removed when a `get` trips over
//! it (counted as a miss). The cache never returns an entry whose deadline
//! has passed.

pub mod policy;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::config::CachePolicy;
use crate::metrics;
use policy::VictimCandidate;

pub use policy::EvictionPolicy;

/// A resident cache entry: payload plus expiry and access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached serialized payload
    pub payload: String,
    /// Payload length, counted against the byte budget
    pub size_bytes: usize,
    /// Absolute expiry deadline (`None` = never)
    pub expires_at: Option<Instant>,
    /// Updated on every hit
    pub last_access: Instant,
    /// Incremented on every hit
    pub access_count: u64,
    /// Monotonic insertion order, used by FIFO
    pub inserted_seq: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Monotonic cache counters. Reset only by an explicit stats reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
}

#[derive(Default)]
struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Byte-budgeted TTL cache with pluggable eviction.
pub struct Cache {
    policy: CachePolicy,
    entries: DashMap<String, CacheEntry>,
    size_bytes: AtomicUsize,
    next_seq: AtomicU64,
    stats: StatCounters,
}

impl Cache {
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: DashMap::new(),
            size_bytes: AtomicUsize::new(0),
            next_seq: AtomicU64::new(0),
            stats: StatCounters::default(),
        }
    }

    /// Insert a payload, evicting victims first if the budget would be
    /// exceeded.
    ///
    /// A `ttl` of `None` or zero means the entry never expires; callers
    /// wanting the configured default pass [`Cache::default_ttl`]
    /// explicitly. A payload larger than the whole budget is not cached at
    /// all rather than flushing every resident entry.
    pub fn put(&self, key: &str, payload: impl Into<String>, ttl: Option<Duration>) {
        let payload = payload.into();
        let size = payload.len();

        if size > self.policy.max_size_bytes {
            debug!(key, size, budget = self.policy.max_size_bytes, "payload exceeds cache budget, not caching");
            return;
        }

        // Replacing an entry releases its budget share first.
        if let Some((_, old)) = self.entries.remove(key) {
            self.size_bytes.fetch_sub(old.size_bytes, Ordering::AcqRel);
        }

        while self.size_bytes.load(Ordering::Acquire) + size > self.policy.max_size_bytes {
            if !self.evict_one() {
                break;
            }
        }

        let now = Instant::now();
        let entry = CacheEntry {
            size_bytes: size,
            payload,
            expires_at: ttl.filter(|t| !t.is_zero()).map(|t| now + t),
            last_access: now,
            access_count: 0,
            inserted_seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };

        self.entries.insert(key.to_string(), entry);
        self.size_bytes.fetch_add(size, Ordering::AcqRel);
        self.publish_gauges();
    }

    /// Look up a payload. A hit updates access metadata; an expired entry is
    /// lazily removed and counted as a miss.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let expired = match self.entries.get_mut(key) {
            Some(mut entry) => {
                if entry.is_expired(now) {
                    true
                } else {
                    entry.last_access = now;
                    entry.access_count = entry.access_count.saturating_add(1);
                    let payload = entry.payload.clone();
                    drop(entry);
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    metrics::record_cache_lookup(true);
                    return Some(payload);
                }
            }
            None => false,
        };

        if expired {
            if let Some((_, old)) = self.entries.remove(key) {
                self.size_bytes.fetch_sub(old.size_bytes, Ordering::AcqRel);
                trace!(key, "expired entry removed");
            }
            self.publish_gauges();
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup(false);
        None
    }

    /// The configured default TTL (zero = never expires), for callers that
    /// want writes to expire per policy rather than pinning forever.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.policy.default_ttl_ms)
    }

    /// Expiration check without touching access metadata.
    #[must_use]
    pub fn is_valid(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    /// Remove one entry. Returns whether it was resident.
    pub fn invalidate(&self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some((_, old)) => {
                self.size_bytes.fetch_sub(old.size_bytes, Ordering::AcqRel);
                self.publish_gauges();
                true
            }
            None => false,
        }
    }

    /// Remove every entry. Cumulative stats survive unless `reset_stats` is
    /// set; entry removal alone never zeroes the counters.
    pub fn clear(&self, reset_stats: bool) {
        self.entries.clear();
        self.size_bytes.store(0, Ordering::Release);
        if reset_stats {
            self.stats.hits.store(0, Ordering::Relaxed);
            self.stats.misses.store(0, Ordering::Relaxed);
            self.stats.evictions.store(0, Ordering::Relaxed);
        }
        self.publish_gauges();
    }

    /// Snapshot of the monotonic counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.stats.hits.load(Ordering::Relaxed),
            miss_count: self.stats.misses.load(Ordering::Relaxed),
            eviction_count: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    /// Aggregate resident payload bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes.load(Ordering::Acquire)
    }

    /// Resident entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resident keys (unordered), mainly for diagnostics and tests.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }

    /// Evict one victim per the configured policy. Returns false when there
    /// is nothing left to evict.
    fn evict_one(&self) -> bool {
        // Snapshot metadata so no shard locks are held during selection.
        let candidates: Vec<VictimCandidate> = self
            .entries
            .iter()
            .map(|r| VictimCandidate {
                key: r.key().clone(),
                last_access: r.last_access,
                access_count: r.access_count,
                inserted_seq: r.inserted_seq,
            })
            .collect();

        let Some(victim) = self.policy.eviction.select_victim(&candidates) else {
            return false;
        };
        let Some((_, old)) = self.entries.remove(&victim) else {
            // Raced with invalidate/clear; caller re-checks the budget.
            return true;
        };

        self.size_bytes.fetch_sub(old.size_bytes, Ordering::AcqRel);
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        metrics::record_eviction(1, old.size_bytes);
        debug!(key = %victim, policy = ?self.policy.eviction, "evicted");
        true
    }

    fn publish_gauges(&self) {
        metrics::set_cache_bytes(self.size_bytes.load(Ordering::Acquire));
        metrics::set_cache_entries(self.entries.len());
    }
}
