//! Glucose statistics engine
//!
//! Pure, synchronous, thread-safe by construction (no shared mutable
//! state). The orchestration pipeline calls these per analysis run; the
//! reporting layers call them over arbitrary windows.

mod engine;

pub use engine::{
    approx_eq, approx_eq_opt, compute_event_stats, compute_period_stats, IN_RANGE_HIGH,
    IN_RANGE_LOW, STATS_TOLERANCE,
};
