use chrono::{DateTime, Utc};

use crate::sensing::ProximityState;

use super::{elapsed_secs, Transition};

pub const DEFAULT_AWAY_NOISE_FLOOR_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct ProximityTracker {
    current: Option<ProximityState>,
    away_started_at: Option<DateTime<Utc>>,
    noise_floor_secs: u64,
}

impl Default for ProximityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_AWAY_NOISE_FLOOR_SECS)
    }
}

impl ProximityTracker {
    pub fn new(noise_floor_secs: u64) -> Self {
        Self {
            current: None,
            away_started_at: None,
            noise_floor_secs,
        }
    }

    pub fn current(&self) -> Option<ProximityState> {
        self.current
    }

    pub fn away_open(&self) -> bool {
        self.away_started_at.is_some()
    }

    /// Record a classified distance. The live state always follows the reading;
    /// intervals only open or close while `tracking` (a session is running).
    pub fn observe(
        &mut self,
        state: ProximityState,
        distance_cm: f64,
        at: DateTime<Utc>,
        tracking: bool,
    ) -> Option<Transition> {
        let previous = self.current.replace(state);
        if !tracking || previous == Some(state) {
            return None;
        }

        if state == ProximityState::Away {
            if self.away_started_at.is_none() {
                self.away_started_at = Some(at);
                return Some(Transition::AwayStarted { distance_cm });
            }
            return None;
        }

        if previous == Some(ProximityState::Away) {
            let started_at = self.away_started_at.take()?;
            return Some(self.close(started_at, at));
        }

        None
    }

    /// Close an open away interval when the session pauses.
    pub fn finish(&mut self, at: DateTime<Utc>) -> Option<Transition> {
        let started_at = self.away_started_at.take()?;
        Some(self.close(started_at, at))
    }

    fn close(&self, started_at: DateTime<Utc>, at: DateTime<Utc>) -> Transition {
        let duration_secs = elapsed_secs(started_at, at);
        if duration_secs >= self.noise_floor_secs {
            Transition::AwayEnded { duration_secs }
        } else {
            Transition::AwayDiscarded { duration_secs }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn away_then_back(after: Duration) -> Option<Transition> {
        let t0 = Utc::now();
        let mut tracker = ProximityTracker::default();
        tracker.observe(ProximityState::Focus, 40.0, t0, true);
        assert_eq!(
            tracker.observe(ProximityState::Away, 150.0, t0, true),
            Some(Transition::AwayStarted { distance_cm: 150.0 })
        );
        tracker.observe(ProximityState::Warning, 80.0, t0 + after, true)
    }

    #[test]
    fn short_away_interval_is_discarded() {
        assert_eq!(
            away_then_back(Duration::milliseconds(4_900)),
            Some(Transition::AwayDiscarded { duration_secs: 4 })
        );
    }

    #[test]
    fn away_interval_at_noise_floor_counts() {
        assert_eq!(
            away_then_back(Duration::seconds(5)),
            Some(Transition::AwayEnded { duration_secs: 5 })
        );
    }

    #[test]
    fn repeated_state_is_not_a_transition() {
        let t0 = Utc::now();
        let mut tracker = ProximityTracker::default();
        tracker.observe(ProximityState::Away, 120.0, t0, true);
        assert_eq!(tracker.observe(ProximityState::Away, 130.0, t0, true), None);
        assert!(tracker.away_open());
    }

    #[test]
    fn without_tracking_only_live_state_moves() {
        let t0 = Utc::now();
        let mut tracker = ProximityTracker::default();
        assert_eq!(tracker.observe(ProximityState::Away, 150.0, t0, false), None);
        assert_eq!(tracker.current(), Some(ProximityState::Away));
        assert!(!tracker.away_open());
        assert_eq!(tracker.observe(ProximityState::Focus, 30.0, t0, true), None);
    }

    #[test]
    fn finish_closes_open_interval() {
        let t0 = Utc::now();
        let mut tracker = ProximityTracker::default();
        tracker.observe(ProximityState::Away, 150.0, t0, true);
        assert_eq!(
            tracker.finish(t0 + Duration::seconds(12)),
            Some(Transition::AwayEnded { duration_secs: 12 })
        );
        assert_eq!(tracker.finish(t0 + Duration::seconds(20)), None);
    }
}
