// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Victim selection for the cache tier.
//!
//! When an insert would push the cache past its byte budget, the configured
//! [`EvictionPolicy`] picks which resident entry goes. Selection operates on
//! a snapshot of entry metadata so no map locks are held while choosing.

use std::time::Instant;

use rand::Rng;
use serde::Deserialize;

/// Rule selecting the eviction victim when the byte budget is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the entry with the oldest last access
    #[default]
    Lru,
    /// Evict the entry with the lowest access count
    Lfu,
    /// Evict the entry inserted earliest, regardless of access
    Fifo,
    /// Evict a uniformly-chosen entry
    Random,
}

/// Metadata snapshot used for victim selection.
#[derive(Debug, Clone)]
pub struct VictimCandidate {
    pub key: String,
    pub last_access: Instant,
    pub access_count: u64,
    pub inserted_seq: u64,
}

impl EvictionPolicy {
    /// Pick the victim's key from a metadata snapshot.
    ///
    /// Ties under LFU fall back to the older access; LRU and FIFO break ties
    /// on insertion order so selection is deterministic.
    #[must_use]
    pub fn select_victim(&self, candidates: &[VictimCandidate]) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        let victim = match self {
            Self::Lru => candidates
                .iter()
                .min_by_key(|c| (c.last_access, c.inserted_seq)),
            Self::Lfu => candidates
                .iter()
                .min_by_key(|c| (c.access_count, c.last_access, c.inserted_seq)),
            Self::Fifo => candidates.iter().min_by_key(|c| c.inserted_seq),
            Self::Random => {
                let idx = rand::thread_rng().gen_range(0..candidates.len());
                candidates.get(idx)
            }
        };
        victim.map(|c| c.key.clone())
    }
}
