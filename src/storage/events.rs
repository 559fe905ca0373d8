//! Event and analysis-history storage
//!
//! Events live in one tree keyed by id; the append-only analysis history
//! lives in a second tree keyed by creation timestamp (big-endian
//! nanoseconds) for natural chronological ordering. Both flush on write:
//! an event update or history append must survive a crash, unlike the
//! regenerable reading stream.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{timestamp_key, StorageError};
use crate::analysis::EventStore;
use crate::types::{AnalysisHistoryRecord, Event};

const EVENTS_TREE: &str = "events";
const HISTORY_TREE: &str = "analysis_history";

/// Storage for events and their analysis history
#[derive(Clone)]
pub struct EventStorage {
    db: sled::Db,
    events: sled::Tree,
    history: sled::Tree,
}

impl EventStorage {
    pub fn open(db: &sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            db: db.clone(),
            events: db.open_tree(EVENTS_TREE)?,
            history: db.open_tree(HISTORY_TREE)?,
        })
    }

    /// Allocate a fresh event id (monotonic per database).
    pub fn allocate_id(&self) -> Result<i64, StorageError> {
        Ok(self.db.generate_id()? as i64)
    }

    pub fn save(&self, event: &Event) -> Result<(), StorageError> {
        let key = event.id.to_be_bytes();
        let value = serde_json::to_vec(event)?;
        self.events.insert(key, value)?;
        self.events.flush()?;
        debug!(event_id = event.id, "Event saved");
        Ok(())
    }

    pub fn load(&self, id: i64) -> Result<Option<Event>, StorageError> {
        match self.events.get(id.to_be_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All stored events, id order.
    pub fn all(&self) -> Result<Vec<Event>, StorageError> {
        let mut events = Vec::new();
        for item in self.events.iter() {
            let (_key, value) = item?;
            match serde_json::from_slice::<Event>(&value) {
                Ok(event) => events.push(event),
                Err(e) => warn!("Skipping undecodable event row: {}", e),
            }
        }
        Ok(events)
    }

    pub fn append_history_record(
        &self,
        record: &AnalysisHistoryRecord,
    ) -> Result<(), StorageError> {
        let key = timestamp_key(record.created_at_utc);
        let value = serde_json::to_vec(record)?;
        self.history.insert(key, value)?;
        self.history.flush()?;
        Ok(())
    }

    /// Most recent N history records, newest first.
    pub fn recent_history(&self, limit: usize) -> Result<Vec<AnalysisHistoryRecord>, StorageError> {
        let mut records = Vec::with_capacity(limit);
        for item in self.history.iter().rev() {
            if records.len() >= limit {
                break;
            }
            let (_key, value) = item?;
            match serde_json::from_slice::<AnalysisHistoryRecord>(&value) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping undecodable history row: {}", e),
            }
        }
        Ok(records)
    }

    /// Full history for one event, oldest first.
    pub fn history_for_event(
        &self,
        event_id: i64,
    ) -> Result<Vec<AnalysisHistoryRecord>, StorageError> {
        let mut records = Vec::new();
        for item in self.history.iter() {
            let (_key, value) = item?;
            if let Ok(record) = serde_json::from_slice::<AnalysisHistoryRecord>(&value) {
                if record.event_id == event_id {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl EventStore for EventStorage {
    async fn load_event(&self, id: i64) -> anyhow::Result<Option<Event>> {
        Ok(self.load(id)?)
    }

    async fn save_event(&self, event: &Event) -> anyhow::Result<()> {
        Ok(self.save(event)?)
    }

    async fn append_history(&self, record: &AnalysisHistoryRecord) -> anyhow::Result<()> {
        Ok(self.append_history_record(record)?)
    }
}
