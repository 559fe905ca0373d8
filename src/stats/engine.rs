//! Event-relative and period-relative glucose statistics
//!
//! Pure functions: no side effects, deterministic given identical inputs.
//! Input reading sets are never assumed to be sorted.

use chrono::{DateTime, Utc};
use statrs::statistics::Statistics;

use crate::types::{EventStats, PeriodStats, Reading};

/// Lower bound of the clinical target band (mg/dL), inclusive
pub const IN_RANGE_LOW: f64 = 70.0;

/// Upper bound of the clinical target band (mg/dL), inclusive
pub const IN_RANGE_HIGH: f64 = 180.0;

/// Absolute tolerance for nullable stat equality checks
pub const STATS_TOLERANCE: f64 = 0.01;

/// Round to 1 decimal place
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Compute statistics for one event's observation window.
///
/// - `glucose_at_event` is the value of the reading whose timestamp is
///   nearest `event_instant`; distance ties break to the earlier timestamp
///   so the result is deterministic on unsorted input.
/// - `spike` and `peak_time_utc` consider only readings at or after the
///   event instant. With no such readings both are `None`. Spike may be
///   negative or zero.
/// - `reading_count` is the total input count, not the post-event subset.
///
/// Empty input returns the zero-value `EventStats`.
pub fn compute_event_stats(readings: &[Reading], event_instant: DateTime<Utc>) -> EventStats {
    if readings.is_empty() {
        return EventStats::empty();
    }

    // Nearest reading to the event instant; ties -> earliest timestamp
    let nearest = readings
        .iter()
        .min_by_key(|r| ((r.timestamp_utc - event_instant).abs(), r.timestamp_utc));
    let glucose_at_event = nearest.map(|r| r.value);

    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = round1(values.iter().mean());

    // Peak is searched in the at-or-after-event subset only
    let peak = readings
        .iter()
        .filter(|r| r.timestamp_utc >= event_instant)
        .fold(None::<&Reading>, |best, r| match best {
            None => Some(r),
            Some(b) if r.value > b.value => Some(r),
            // Equal values -> keep the earlier peak time
            Some(b) if r.value == b.value && r.timestamp_utc < b.timestamp_utc => Some(r),
            Some(b) => Some(b),
        });

    let (spike, peak_time_utc) = match (peak, glucose_at_event) {
        (Some(p), Some(at_event)) => (Some(round1(p.value - at_event)), Some(p.timestamp_utc)),
        _ => (None, None),
    };

    EventStats {
        glucose_at_event,
        min: Some(min),
        max: Some(max),
        avg: Some(avg),
        spike,
        peak_time_utc,
        reading_count: readings.len(),
    }
}

/// Compute statistics for an arbitrary window of readings.
///
/// Standard deviation is the population form (divide by n, not n-1).
/// Range percentages use the fixed [70, 180] mg/dL band, inclusive; after
/// rounding to 1 decimal the three percentages need not sum to 100.0.
///
/// Empty input returns the zero-value `PeriodStats`.
pub fn compute_period_stats(readings: &[Reading]) -> PeriodStats {
    if readings.is_empty() {
        return PeriodStats::empty();
    }

    let n = readings.len();
    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = round1(values.iter().mean());
    let std_dev = round1(values.iter().population_std_dev());

    let below = values.iter().filter(|v| **v < IN_RANGE_LOW).count();
    let above = values.iter().filter(|v| **v > IN_RANGE_HIGH).count();
    let in_range = n - below - above;

    let pct = |count: usize| round1(100.0 * count as f64 / n as f64);

    let first = readings.iter().map(|r| r.timestamp_utc).min();
    let last = readings.iter().map(|r| r.timestamp_utc).max();

    PeriodStats {
        min: Some(min),
        max: Some(max),
        avg: Some(avg),
        std_dev: Some(std_dev),
        time_in_range_pct: pct(in_range),
        time_above_range_pct: pct(above),
        time_below_range_pct: pct(below),
        reading_count: n,
        first_reading_utc: first,
        last_reading_utc: last,
    }
}

/// Tolerance-based equality for two stat values.
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= STATS_TOLERANCE
}

/// Tolerance-based equality for two nullable stat values.
///
/// Equal iff both `None`, or both present and within `STATS_TOLERANCE`.
/// Callers use this to decide whether a reprocessed event actually changed
/// and whether to suppress a spurious notification.
pub fn approx_eq_opt(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => approx_eq(a, b),
        _ => false,
    }
}

impl EventStats {
    /// Whether another snapshot is equal within `STATS_TOLERANCE` on every
    /// numeric field (peak time and reading count compare exactly).
    pub fn approx_eq(&self, other: &EventStats) -> bool {
        approx_eq_opt(self.glucose_at_event, other.glucose_at_event)
            && approx_eq_opt(self.min, other.min)
            && approx_eq_opt(self.max, other.max)
            && approx_eq_opt(self.avg, other.avg)
            && approx_eq_opt(self.spike, other.spike)
            && self.peak_time_utc == other.peak_time_utc
            && self.reading_count == other.reading_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn reading(offset_min: i64, value: f64) -> Reading {
        Reading::new(value, t0() + Duration::minutes(offset_min))
    }

    #[test]
    fn event_stats_empty_input() {
        let stats = compute_event_stats(&[], t0());
        assert_eq!(stats, EventStats::empty());
        assert_eq!(stats.reading_count, 0);
        assert!(stats.glucose_at_event.is_none());
    }

    #[test]
    fn event_stats_reference_example() {
        // t-2m(110), t-30m(100), t+3m(115), t+30m(140), t+60m(130)
        let readings = vec![
            reading(-2, 110.0),
            reading(-30, 100.0),
            reading(3, 115.0),
            reading(30, 140.0),
            reading(60, 130.0),
        ];
        let stats = compute_event_stats(&readings, t0());

        assert_eq!(stats.glucose_at_event, Some(110.0));
        assert_eq!(stats.min, Some(100.0));
        assert_eq!(stats.max, Some(140.0));
        assert_eq!(stats.reading_count, 5);
    }

    #[test]
    fn event_stats_spike_example() {
        // t-15m(100), t(105), t+30m(130), t+60m(120)
        let readings = vec![
            reading(-15, 100.0),
            reading(0, 105.0),
            reading(30, 130.0),
            reading(60, 120.0),
        ];
        let stats = compute_event_stats(&readings, t0());

        assert_eq!(stats.glucose_at_event, Some(105.0));
        assert_eq!(stats.spike, Some(25.0));
        assert_eq!(stats.peak_time_utc, Some(t0() + Duration::minutes(30)));
    }

    #[test]
    fn event_stats_no_after_event_readings() {
        let readings = vec![reading(-20, 100.0), reading(-5, 120.0)];
        let stats = compute_event_stats(&readings, t0());

        assert_eq!(stats.glucose_at_event, Some(120.0));
        assert_eq!(stats.spike, None);
        assert_eq!(stats.peak_time_utc, None);
        assert_eq!(stats.reading_count, 2);
    }

    #[test]
    fn event_stats_spike_can_be_negative() {
        // Glucose falls after the event
        let readings = vec![reading(0, 150.0), reading(30, 120.0)];
        let stats = compute_event_stats(&readings, t0());
        assert_eq!(stats.spike, Some(0.0)); // peak is the event reading itself
        assert_eq!(stats.peak_time_utc, Some(t0()));

        let falling = vec![reading(-1, 150.0), reading(30, 120.0)];
        let stats = compute_event_stats(&falling, t0());
        assert_eq!(stats.spike, Some(-30.0));
    }

    #[test]
    fn event_stats_nearest_tie_breaks_to_earlier() {
        // Both 5 minutes away; the earlier one wins regardless of input order
        let readings = vec![reading(5, 140.0), reading(-5, 95.0)];
        let stats = compute_event_stats(&readings, t0());
        assert_eq!(stats.glucose_at_event, Some(95.0));
    }

    #[test]
    fn event_stats_avg_bounded_by_extrema() {
        // min <= avg <= max always holds; min <= glucose_at_event <= max is
        // NOT guaranteed in general (nearest-in-time, not nearest-in-value)
        let readings = vec![reading(-10, 80.0), reading(1, 200.0), reading(45, 90.0)];
        let stats = compute_event_stats(&readings, t0());
        let avg = stats.avg.unwrap();
        assert!(stats.min.unwrap() <= avg && avg <= stats.max.unwrap());
    }

    #[test]
    fn avg_within_extrema_on_random_sets() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let n = rng.gen_range(1..40);
            let readings: Vec<Reading> = (0..n)
                .map(|i| reading(i64::from(i) - 20, rng.gen_range(40.0..400.0)))
                .collect();
            let stats = compute_event_stats(&readings, t0());
            let avg = stats.avg.unwrap();
            // 0.05 slack: avg is rounded to 1 decimal
            assert!(stats.min.unwrap() - 0.05 <= avg && avg <= stats.max.unwrap() + 0.05);
        }
    }

    #[test]
    fn period_stats_empty_input() {
        assert_eq!(compute_period_stats(&[]), PeriodStats::empty());
    }

    #[test]
    fn period_stats_range_percentages() {
        // 2 below, 4 in range, 4 above
        let mut readings = Vec::new();
        for (i, v) in [60.0, 65.0].iter().enumerate() {
            readings.push(reading(i as i64, *v));
        }
        for (i, v) in [80.0, 100.0, 150.0, 180.0].iter().enumerate() {
            readings.push(reading(10 + i as i64, *v));
        }
        for (i, v) in [181.0, 200.0, 250.0, 300.0].iter().enumerate() {
            readings.push(reading(20 + i as i64, *v));
        }

        let stats = compute_period_stats(&readings);
        assert_eq!(stats.time_below_range_pct, 20.0);
        assert_eq!(stats.time_in_range_pct, 40.0);
        assert_eq!(stats.time_above_range_pct, 40.0);
        assert_eq!(stats.reading_count, 10);
    }

    #[test]
    fn period_stats_band_bounds_are_inclusive() {
        let readings = vec![reading(0, 70.0), reading(5, 180.0)];
        let stats = compute_period_stats(&readings);
        assert_eq!(stats.time_in_range_pct, 100.0);
        assert_eq!(stats.time_below_range_pct, 0.0);
        assert_eq!(stats.time_above_range_pct, 0.0);
    }

    #[test]
    fn period_stats_identical_values_zero_stddev() {
        let readings = vec![reading(0, 120.0), reading(5, 120.0), reading(10, 120.0)];
        let stats = compute_period_stats(&readings);
        assert_eq!(stats.std_dev, Some(0.0));
        assert_eq!(stats.avg, Some(120.0));
    }

    #[test]
    fn period_stats_population_stddev() {
        // Population std-dev of [100, 120]: mean 110, sqrt(((10)^2+(10)^2)/2) = 10
        let readings = vec![reading(0, 100.0), reading(5, 120.0)];
        let stats = compute_period_stats(&readings);
        assert_eq!(stats.std_dev, Some(10.0));
    }

    #[test]
    fn period_stats_unsorted_input() {
        let readings = vec![reading(30, 110.0), reading(-10, 100.0), reading(5, 105.0)];
        let stats = compute_period_stats(&readings);
        assert_eq!(stats.first_reading_utc, Some(t0() - Duration::minutes(10)));
        assert_eq!(stats.last_reading_utc, Some(t0() + Duration::minutes(30)));
    }

    #[test]
    fn tolerance_equality() {
        assert!(approx_eq_opt(None, None));
        assert!(approx_eq_opt(Some(100.0), Some(100.005)));
        assert!(!approx_eq_opt(Some(100.0), Some(100.02)));
        assert!(!approx_eq_opt(Some(100.0), None));
    }

    #[test]
    fn event_stats_approx_eq_detects_change() {
        let readings = vec![reading(0, 105.0), reading(30, 130.0)];
        let a = compute_event_stats(&readings, t0());
        let mut b = a;
        assert!(a.approx_eq(&b));

        b.avg = b.avg.map(|v| v + 0.5);
        assert!(!a.approx_eq(&b));
    }
}
