//! Store side-channel events
//!
//! Persistence and remote sync never fail the operation that triggered
//! them. Their outcomes are logged and also published here, so callers
//! (and tests) can observe what happened without a real backend.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

/// Outcome of a persistence or sync attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Snapshot written under `key`
    Persisted { key: String },
    /// Snapshot write failed; the in-memory change still stands
    PersistFailed {
        key: String,
        error: String,
        /// What the user can do about it, when known
        suggestion: Option<String>,
    },
    /// Remote mirror accepted the export
    Synced { url: String },
    /// Remote mirror push failed or was refused
    SyncFailed { url: String, error: String },
}

/// Fan-out of events to every live subscriber
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<StoreEvent>>>>,
}

impl EventSink {
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<StoreEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver to all subscribers, dropping the ones whose receiver is gone
    pub(crate) fn emit(&self, event: StoreEvent) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<StoreEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
