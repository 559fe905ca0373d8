//! Computed statistics value objects
//!
//! Pure derivations from a reading set. Recomputed on demand, never cached
//! beyond the call that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics relative to a single event's reference instant.
///
/// The zero value (`Default`) represents an empty reading set: all fields
/// `None`, `reading_count` 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EventStats {
    /// Value of the reading nearest the event instant (mg/dL)
    pub glucose_at_event: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Mean value, rounded to 1 decimal
    pub avg: Option<f64>,
    /// Post-event peak minus glucose-at-event, rounded to 1 decimal.
    /// May be negative or zero. `None` when no reading falls at or after
    /// the event instant.
    pub spike: Option<f64>,
    /// Instant of the post-event peak
    pub peak_time_utc: Option<DateTime<Utc>>,
    /// Total input reading count (not the post-event subset count)
    pub reading_count: usize,
}

impl EventStats {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.reading_count == 0
    }
}

/// Statistics over an arbitrary window, independent of any single event.
///
/// The zero value (`Default`) represents an empty reading set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeriodStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Mean value, rounded to 1 decimal
    pub avg: Option<f64>,
    /// Population standard deviation (divide by n), rounded to 1 decimal
    pub std_dev: Option<f64>,
    /// Percentage of readings in [70, 180] mg/dL, rounded to 1 decimal.
    /// The three percentages need not sum to exactly 100.0 after rounding.
    pub time_in_range_pct: f64,
    /// Percentage of readings above 180 mg/dL
    pub time_above_range_pct: f64,
    /// Percentage of readings below 70 mg/dL
    pub time_below_range_pct: f64,
    pub reading_count: usize,
    pub first_reading_utc: Option<DateTime<Utc>>,
    pub last_reading_utc: Option<DateTime<Utc>>,
}

impl PeriodStats {
    pub fn empty() -> Self {
        Self::default()
    }
}
