//! Usage log storage
//!
//! Append-only rows keyed by creation timestamp (big-endian nanoseconds).
//! Rows carry token counts and outcome metadata only; cost is recomputed
//! on read from the pricing table so price corrections apply
//! retroactively.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use super::{timestamp_key, StorageError};
use crate::analysis::UsageStore;
use crate::types::UsageLogRecord;

const TREE_NAME: &str = "usage_log";

/// Storage for AI usage accounting rows
#[derive(Clone)]
pub struct UsageStorage {
    tree: sled::Tree,
}

impl UsageStorage {
    pub fn open(db: &sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree(TREE_NAME)?,
        })
    }

    pub fn append(&self, record: &UsageLogRecord) -> Result<(), StorageError> {
        let key = timestamp_key(record.created_at_utc);
        let value = serde_json::to_vec(record)?;
        self.tree.insert(key, value)?;
        self.tree.flush()?;
        Ok(())
    }

    /// Most recent N rows, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<UsageLogRecord>, StorageError> {
        let mut records = Vec::with_capacity(limit);
        for item in self.tree.iter().rev() {
            if records.len() >= limit {
                break;
            }
            let (_key, value) = item?;
            match serde_json::from_slice::<UsageLogRecord>(&value) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping undecodable usage row: {}", e),
            }
        }
        Ok(records)
    }

    /// All rows with `start <= created_at <= end`, chronological.
    pub fn in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageLogRecord>, StorageError> {
        let start_key = timestamp_key(start);
        let end_key = timestamp_key(end);

        let mut records = Vec::new();
        for item in self.tree.range(start_key..=end_key) {
            let (_key, value) = item?;
            match serde_json::from_slice::<UsageLogRecord>(&value) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping undecodable usage row: {}", e),
            }
        }
        Ok(records)
    }

    pub fn count(&self) -> usize {
        self.tree.len()
    }
}

#[async_trait]
impl UsageStore for UsageStorage {
    async fn append_usage_log(&self, record: &UsageLogRecord) -> anyhow::Result<()> {
        Ok(self.append(record)?)
    }
}
