//! Persistent storage for readings, events, history, and usage logs
//!
//! Sled-backed stores with JSON values. Keys are big-endian encoded so
//! they sort chronologically (or by id) and range scans map directly to
//! the windowed queries the engine needs.

mod events;
mod readings;
mod usage;

pub use events::EventStorage;
pub use readings::ReadingStorage;
pub use usage::UsageStorage;

use std::path::Path;

use chrono::{DateTime, Utc};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Open (or create) the database backing all stores.
pub fn open_database<P: AsRef<Path>>(path: P) -> Result<sled::Db, StorageError> {
    let path_ref = path.as_ref();
    let db = sled::open(path_ref)?;
    tracing::info!("Glucose database opened at {:?}", path_ref);
    Ok(db)
}

/// Timestamp as big-endian nanosecond key (sorts chronologically).
pub(crate) fn timestamp_key(ts: DateTime<Utc>) -> [u8; 8] {
    ts.timestamp_nanos_opt()
        .unwrap_or_else(|| ts.timestamp() * 1_000_000_000)
        .to_be_bytes()
}
