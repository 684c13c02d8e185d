//! Configuration for the cache tier and sync engine.
//!
//! Both policies are passed explicitly at construction. There are no
//! process-wide defaults baked into the core; `Default` impls exist only as
//! a convenience for the embedding application.
//!
//! # Example
//!
//! ```
//! use syncstore::{CachePolicy, EvictionPolicy, SyncPolicy};
//!
//! let cache = CachePolicy {
//!     max_size_bytes: 4 * 1024 * 1024, // 4 MB
//!     default_ttl_ms: 60_000,
//!     eviction: EvictionPolicy::Lru,
//! };
//! assert_eq!(cache.eviction, EvictionPolicy::Lru);
//!
//! let sync = SyncPolicy::default();
//! assert_eq!(sync.interval_ms, 30_000);
//! ```

use serde::Deserialize;

pub use crate::cache::policy::EvictionPolicy;

/// Cache tier configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CachePolicy {
    /// Aggregate byte budget; exceeding it triggers eviction before insert
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: usize,

    /// Default TTL in milliseconds applied by the cache-fronted store to
    /// its writes (0 = entries never expire)
    #[serde(default)]
    pub default_ttl_ms: u64,

    /// Victim selection rule when the byte budget is exceeded
    #[serde(default)]
    pub eviction: EvictionPolicy,
}

fn default_max_size_bytes() -> usize {
    16 * 1024 * 1024 // 16 MB
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            default_ttl_ms: 0,
            eviction: EvictionPolicy::default(),
        }
    }
}

/// Sync engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncPolicy {
    /// Background reconciliation interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Background-loop attempts per pending key before giving up on it
    /// until it is dirtied again
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
}

fn default_interval_ms() -> u64 {
    30_000
}

fn default_retry_limit() -> u32 {
    3
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            retry_limit: default_retry_limit(),
        }
    }
}
