//! Glucose reading storage
//!
//! One tree keyed by reading timestamp (big-endian nanoseconds), so the
//! windowed query the stats pipeline runs is a single range scan. The
//! reading stream is high-frequency; writes rely on sled's background
//! flushing rather than flushing per insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use super::{timestamp_key, StorageError};
use crate::analysis::ReadingStore;
use crate::types::Reading;

const TREE_NAME: &str = "readings";

/// Storage for the recorded reading stream
#[derive(Clone)]
pub struct ReadingStorage {
    tree: sled::Tree,
}

impl ReadingStorage {
    pub fn open(db: &sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree(TREE_NAME)?,
        })
    }

    /// Record one reading. A reading at an already-recorded instant
    /// replaces the stored value (uniqueness per instant is an upstream
    /// guarantee).
    pub fn append(&self, reading: &Reading) -> Result<(), StorageError> {
        let key = timestamp_key(reading.timestamp_utc);
        let value = serde_json::to_vec(reading)?;
        self.tree.insert(key, value)?;
        Ok(())
    }

    /// All readings with `start <= timestamp <= end`, chronological.
    pub fn window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, StorageError> {
        let start_key = timestamp_key(start);
        let end_key = timestamp_key(end);

        let mut readings = Vec::new();
        for item in self.tree.range(start_key..=end_key) {
            let (_key, value) = item?;
            match serde_json::from_slice::<Reading>(&value) {
                Ok(reading) => readings.push(reading),
                Err(e) => {
                    warn!("Skipping undecodable reading row: {}", e);
                }
            }
        }
        Ok(readings)
    }

    pub fn count(&self) -> usize {
        self.tree.len()
    }
}

#[async_trait]
impl ReadingStore for ReadingStorage {
    async fn readings_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Reading>> {
        Ok(self.window(start, end)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn open_temp() -> (tempfile::TempDir, ReadingStorage) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let storage = ReadingStorage::open(&db).unwrap();
        (dir, storage)
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let (_dir, storage) = open_temp();
        for offset in [-10i64, 0, 10, 20, 30] {
            storage
                .append(&Reading::new(
                    100.0 + offset as f64,
                    t0() + Duration::minutes(offset),
                ))
                .unwrap();
        }

        let window = storage.window(t0(), t0() + Duration::minutes(20)).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].timestamp_utc, t0());
        assert_eq!(window[2].timestamp_utc, t0() + Duration::minutes(20));
    }

    #[test]
    fn empty_window() {
        let (_dir, storage) = open_temp();
        storage.append(&Reading::new(100.0, t0())).unwrap();

        let window = storage
            .window(t0() + Duration::hours(1), t0() + Duration::hours(2))
            .unwrap();
        assert!(window.is_empty());
    }
}
