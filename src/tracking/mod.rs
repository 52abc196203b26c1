//! Edge detection for the proximity and holder sensors.
//!
//! Trackers compare each classified reading against the previous one and report a
//! [`Transition`] on genuine state changes. Interval durations shorter than the
//! configured noise floor are reported as discarded so callers can skip them.

pub mod holder;
pub mod proximity;

pub use holder::HolderTracker;
pub use proximity::ProximityTracker;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    AwayStarted { distance_cm: f64 },
    AwayEnded { duration_secs: u64 },
    AwayDiscarded { duration_secs: u64 },
    PhonePickedUp,
    PhonePutBack { duration_secs: u64 },
    PhoneUsageDiscarded { duration_secs: u64 },
}

/// Whole seconds from `start` to `end`, truncated; never negative.
pub fn elapsed_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    let millis = (end - start).num_milliseconds().max(0);
    (millis / 1000) as u64
}
