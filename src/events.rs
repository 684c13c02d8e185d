//! Change notification.
//!
//! Every mutation through a [`Store`](crate::Store) emits a [`StorageEvent`]
//! on a broadcast channel. Emission is synchronous with the mutation;
//! delivery is asynchronous and best-effort: a subscriber that falls behind
//! its buffer misses events rather than blocking the writer. Observers get
//! "eventual-enough" notification, never completeness.
//!
//! The channel is a plain `tokio::sync::broadcast` with no ties to any UI
//! lifecycle; events are emitted whether or not anyone is listening.

use tokio::sync::broadcast;

/// A change to the underlying store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    /// A key was written that did not previously exist
    KeyAdded(String),
    /// An existing key was overwritten
    KeyUpdated(String),
    /// A key was removed
    KeyDeleted(String),
    /// The whole store was cleared (one event regardless of entry count)
    Cleared,
}

impl StorageEvent {
    /// The key this event concerns, if it concerns a single key.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::KeyAdded(k) | Self::KeyUpdated(k) | Self::KeyDeleted(k) => Some(k),
            Self::Cleared => None,
        }
    }
}

/// Lossy fan-out of [`StorageEvent`]s.
pub struct EventBus {
    tx: broadcast::Sender<StorageEvent>,
}

impl EventBus {
    /// Create a bus whose subscribers each buffer up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to subsequent events. Dropping the receiver unsubscribes;
    /// neither operation blocks writers.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers (fire-and-forget).
    pub fn emit(&self, event: StorageEvent) {
        // Err means no subscribers, which is fine.
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
