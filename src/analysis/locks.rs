//! Per-event single-flight locks
//!
//! Concurrent analysis triggers for the same event (a scheduled run
//! overlapping a manual reprocess) must not interleave their
//! stats/history/event writes. The orchestrator serializes them with a
//! keyed async mutex: one lock per event id, acquired for the duration of
//! the run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async mutex map. Entries are retained for the process lifetime;
/// event ids are low-cardinality relative to memory.
#[derive(Debug, Default)]
pub struct EventLockMap {
    inner: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl EventLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one event id, waiting if another run holds it.
    pub async fn acquire(&self, event_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self
                .inner
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            Arc::clone(map.entry(event_id).or_default())
        };
        lock.lock_owned().await
    }
}
