// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for syncstore.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `syncstore_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for size gauges
//!
//! # Labels
//! - `operation`: save, load, delete, batch, restore, sync
//! - `status`: success, error

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a store operation outcome
pub fn record_operation(operation: &str, status: &str) {
    counter!(
        "syncstore_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "syncstore_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a cache hit or miss
pub fn record_cache_lookup(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!(
        "syncstore_cache_lookups_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record eviction event
pub fn record_eviction(count: usize, bytes: usize) {
    counter!("syncstore_evictions_total").increment(count as u64);
    counter!("syncstore_evicted_bytes_total").increment(bytes as u64);
}

/// Set current cache size in bytes
pub fn set_cache_bytes(bytes: usize) {
    gauge!("syncstore_cache_bytes").set(bytes as f64);
}

/// Set current cache entry count
pub fn set_cache_entries(count: usize) {
    gauge!("syncstore_cache_entries").set(count as f64);
}

/// Record a per-key sync result
pub fn record_sync_result(direction: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "syncstore_sync_results_total",
        "direction" => direction.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Set pending (locally dirty) key count
pub fn set_sync_pending(count: usize) {
    gauge!("syncstore_sync_pending_keys").set(count as f64);
}

/// Set cumulative failed sync count
pub fn set_sync_failed(count: u64) {
    gauge!("syncstore_sync_failed_total").set(count as f64);
}

/// Timer guard that records operation latency on drop.
///
/// # Example
///
/// ```
/// use syncstore::metrics::LatencyTimer;
///
/// {
///     let _timer = LatencyTimer::new("save");
///     // ... do work ...
/// } // latency recorded here
/// ```
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    #[must_use]
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}
