//! Persisted entry envelope.
//!
//! Every value written through a [`Store`](crate::Store) is wrapped in an
//! [`Entry`] before it reaches the backend: the serialized payload plus the
//! metadata the sync engine needs (write timestamp for last-write-wins) and
//! the cache tier uses (size accounting).
//!
//! The envelope is plain JSON so any backend that can hold a string can hold
//! an entry, and a corrupt envelope decodes to `None` instead of an error.

use serde::{Deserialize, Serialize};

/// Persisted record: serialized payload plus metadata.
///
/// # Example
///
/// ```
/// use syncstore::Entry;
///
/// let entry = Entry::new("{\"answer\":42}".into(), false);
/// assert_eq!(entry.size_bytes, 14);
/// assert!(entry.written_at > 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// The serialized value (JSON text produced by the typed store)
    pub payload: String,
    /// Payload length in bytes (approximate size accounting)
    pub size_bytes: usize,
    /// Write timestamp (epoch millis), compared for last-write-wins
    pub written_at: i64,
    /// Whether the payload passed through the encryption layer
    #[serde(default)]
    pub encrypted: bool,
}

impl Entry {
    /// Wrap a serialized payload with fresh metadata.
    #[must_use]
    pub fn new(payload: String, encrypted: bool) -> Self {
        Self {
            size_bytes: payload.len(),
            written_at: epoch_millis(),
            payload,
            encrypted,
        }
    }

    /// Wrap a payload with an explicit timestamp (used by the sync engine
    /// when mirroring a remote write, so LWW comparisons stay correct).
    #[must_use]
    pub fn with_timestamp(payload: String, written_at: i64, encrypted: bool) -> Self {
        Self {
            size_bytes: payload.len(),
            written_at,
            payload,
            encrypted,
        }
    }

    /// Serialize the envelope for the backend.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        // Entry has no map fields, so serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode an envelope from backend bytes. Corruption reads as `None`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

/// Current time as epoch milliseconds.
#[must_use]
pub fn epoch_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
