//! Glucose reading and event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Classification;

/// One timestamped glucose measurement (mg/dL).
///
/// Immutable once recorded. Uniqueness per instant is enforced upstream
/// by the ingestion layer, not by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Glucose value (mg/dL)
    pub value: f64,
    /// Measurement instant (UTC)
    pub timestamp_utc: DateTime<Utc>,
}

impl Reading {
    pub fn new(value: f64, timestamp_utc: DateTime<Utc>) -> Self {
        Self {
            value,
            timestamp_utc,
        }
    }
}

/// A discrete occurrence (meal, activity) with a reference instant and a
/// surrounding observation window.
///
/// Invariant: `period_start_utc <= event_timestamp_utc <= period_end_utc`,
/// enforced at creation by the caller. The analysis pipeline replaces the
/// AI-derived and stats fields with a fresh value; it never changes the
/// period boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    /// Free-text description of the occurrence (e.g. the meal contents)
    pub description: String,
    /// Reference instant (UTC)
    pub event_timestamp_utc: DateTime<Utc>,
    /// Observation window start (UTC, inclusive)
    pub period_start_utc: DateTime<Utc>,
    /// Observation window end (UTC, inclusive)
    pub period_end_utc: DateTime<Utc>,

    // === Stats fields (recomputed per analysis run) ===
    /// Glucose value nearest the event instant (mg/dL)
    pub glucose_at_event: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    /// Rise from glucose-at-event to the post-event peak (mg/dL)
    pub spike: Option<f64>,
    /// Instant of the post-event peak (UTC)
    pub peak_time_utc: Option<DateTime<Utc>>,
    /// Number of readings in the observation window
    pub reading_count: usize,

    // === AI-derived fields ===
    pub ai_analysis: Option<String>,
    pub ai_classification: Option<Classification>,
    pub is_processed: bool,
    pub processed_at_utc: Option<DateTime<Utc>>,
}

impl Event {
    /// Create an unprocessed event with an empty stats snapshot.
    pub fn new(
        id: i64,
        description: impl Into<String>,
        event_timestamp_utc: DateTime<Utc>,
        period_start_utc: DateTime<Utc>,
        period_end_utc: DateTime<Utc>,
    ) -> Self {
        debug_assert!(period_start_utc <= event_timestamp_utc);
        debug_assert!(event_timestamp_utc <= period_end_utc);

        Self {
            id,
            description: description.into(),
            event_timestamp_utc,
            period_start_utc,
            period_end_utc,
            glucose_at_event: None,
            min: None,
            max: None,
            avg: None,
            spike: None,
            peak_time_utc: None,
            reading_count: 0,
            ai_analysis: None,
            ai_classification: None,
            is_processed: false,
            processed_at_utc: None,
        }
    }
}
