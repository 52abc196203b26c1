use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    models::EventKind,
    persistence::StatsSnapshot,
    scoring::{score_breakdown, ScoreBand, ScoringConfig},
    sensing::{is_valid_distance, HolderState, Metric, ProximityBand, ProximityState, ProximityThresholds, SensorReading},
    tracking::{HolderTracker, ProximityTracker, Transition},
};

use super::SessionStats;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    /// No session loaded.
    Idle,
    Running,
    /// A session is loaded but the ticker is stopped.
    Paused,
}

impl Default for RunStatus {
    fn default() -> Self {
        RunStatus::Idle
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadedSession {
    pub id: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
}

/// Latest sensor view, maintained whether or not a session runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveSensorState {
    pub distance_cm: Option<f64>,
    pub band: Option<ProximityBand>,
    /// Status line for the current band.
    pub label: Option<String>,
    pub proximity: Option<ProximityState>,
    pub holder: Option<HolderState>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadingOutcome {
    Rejected,
    Applied {
        live: LiveSensorState,
        events: Vec<EventKind>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: RunStatus,
    pub session: Option<LoadedSession>,
    pub stats: SessionStats,
    /// Stored phone usage plus the open in-hand interval.
    pub live_phone_use_s: u64,
    pub live: LiveSensorState,
    pub score: u32,
    pub band: ScoreBand,
    pub band_label: String,
}

/// The accumulator behind a session: counters, trackers and run status.
/// Owned by the controller; every mutation goes through `&mut self`.
#[derive(Debug, Clone)]
pub struct SessionAccumulator {
    status: RunStatus,
    session: Option<LoadedSession>,
    stats: SessionStats,
    thresholds: ProximityThresholds,
    proximity: ProximityTracker,
    holder: HolderTracker,
    live: LiveSensorState,
    snapshot_seq: u64,
}

impl Default for SessionAccumulator {
    fn default() -> Self {
        Self::new(
            ProximityThresholds::default(),
            ProximityTracker::default(),
            HolderTracker::default(),
        )
    }
}

impl SessionAccumulator {
    pub fn new(
        thresholds: ProximityThresholds,
        proximity: ProximityTracker,
        holder: HolderTracker,
    ) -> Self {
        Self {
            status: RunStatus::Idle,
            session: None,
            stats: SessionStats::default(),
            thresholds,
            proximity,
            holder,
            live: LiveSensorState::default(),
            snapshot_seq: 0,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub fn session(&self) -> Option<&LoadedSession> {
        self.session.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn live(&self) -> &LiveSensorState {
        &self.live
    }

    /// Validate, classify and track one reading. Counters and intervals only move
    /// while the session runs.
    pub fn apply_reading(&mut self, reading: &SensorReading) -> ReadingOutcome {
        let tracking = self.is_running();
        let at = reading.timestamp;

        let transition = match reading.metric {
            Metric::Distance => {
                if !is_valid_distance(reading.value) {
                    return ReadingOutcome::Rejected;
                }
                let band = self.thresholds.band(reading.value);
                self.live.distance_cm = Some(reading.value);
                self.live.band = Some(band);
                self.live.label = Some(band.label().to_string());
                self.live.proximity = Some(band.state());
                self.proximity.observe(band.state(), reading.value, at, tracking)
            }
            Metric::Holder => {
                let Some(state) = HolderState::from_raw(reading.value) else {
                    return ReadingOutcome::Rejected;
                };
                self.live.holder = Some(state);
                self.holder.observe(state, at, tracking)
            }
        };
        self.live.updated_at = Some(at);

        let events = transition
            .and_then(|transition| self.record(transition))
            .into_iter()
            .collect();

        ReadingOutcome::Applied {
            live: self.live.clone(),
            events,
        }
    }

    /// Advance the counters by one tick. Returns false when no session runs.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }

        self.stats.total_s += 1;
        match self.proximity.current() {
            Some(ProximityState::Focus) => self.stats.focus_s += 1,
            Some(ProximityState::Away) => self.stats.distraction_count += 1,
            _ => {}
        }
        true
    }

    /// Load a session's counters without running it. Reloading the session that
    /// is already in memory keeps the in-memory counters; the store may lag them.
    pub fn load(&mut self, session: LoadedSession, stats: SessionStats) {
        let same_session = self
            .session
            .as_ref()
            .is_some_and(|loaded| loaded.id == session.id);
        if !same_session {
            self.stats = stats;
        }
        self.session = Some(session);
        self.status = RunStatus::Paused;
    }

    /// Start ticking the loaded session.
    pub fn begin(&mut self, at: DateTime<Utc>) -> bool {
        if self.session.is_none() {
            return false;
        }
        self.holder.begin(at);
        self.status = RunStatus::Running;
        true
    }

    /// Stop ticking and fold open intervals into the counters. Flushes add
    /// durations only; no interval-end events are produced for them.
    pub fn pause(&mut self, at: DateTime<Utc>) {
        if !self.is_running() {
            return;
        }
        for transition in [self.holder.finish(at), self.proximity.finish(at)]
            .into_iter()
            .flatten()
        {
            self.record(transition);
        }
        self.status = RunStatus::Paused;
    }

    pub fn live_phone_use_s(&self, now: DateTime<Utc>) -> u64 {
        if self.is_running() && self.holder.in_hand() {
            self.stats.phone_use_s + self.holder.open_usage_secs(now)
        } else {
            self.stats.phone_use_s
        }
    }

    /// Sequence-stamped copy of the counters for persistence.
    pub fn capture(&mut self) -> Option<StatsSnapshot> {
        let session = self.session.as_ref()?;
        self.snapshot_seq += 1;
        Some(StatsSnapshot {
            session_id: session.id.clone(),
            stats: self.stats,
            seq: self.snapshot_seq,
        })
    }

    pub fn snapshot(&self, now: DateTime<Utc>, scoring: &ScoringConfig) -> SessionSnapshot {
        let score = score_breakdown(&self.stats, scoring).score;
        let band = ScoreBand::from_score(score);
        SessionSnapshot {
            status: self.status,
            session: self.session.clone(),
            stats: self.stats,
            live_phone_use_s: self.live_phone_use_s(now),
            live: self.live.clone(),
            score,
            band,
            band_label: band.label().to_string(),
        }
    }

    fn record(&mut self, transition: Transition) -> Option<EventKind> {
        match transition {
            Transition::AwayStarted { distance_cm } => {
                self.stats.away_count += 1;
                Some(EventKind::AwayStart { distance_cm })
            }
            Transition::AwayEnded { duration_secs } => {
                self.stats.away_s += duration_secs;
                Some(EventKind::AwayEnd {
                    duration_s: duration_secs,
                })
            }
            Transition::PhonePickedUp => {
                self.stats.phone_pickups += 1;
                Some(EventKind::PhonePickup)
            }
            Transition::PhonePutBack { duration_secs } => {
                self.stats.phone_use_s += duration_secs;
                Some(EventKind::PhonePutback {
                    duration_s: duration_secs,
                })
            }
            Transition::AwayDiscarded { duration_secs }
            | Transition::PhoneUsageDiscarded { duration_secs } => {
                log_debug!("discarding {duration_secs}s interval below noise floor");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn running(at: DateTime<Utc>) -> SessionAccumulator {
        let mut acc = SessionAccumulator::default();
        acc.load(
            LoadedSession {
                id: "s1".into(),
                name: "Alice".into(),
                started_at: at,
            },
            SessionStats::default(),
        );
        assert!(acc.begin(at));
        acc
    }

    fn events(outcome: ReadingOutcome) -> Vec<EventKind> {
        match outcome {
            ReadingOutcome::Applied { events, .. } => events,
            ReadingOutcome::Rejected => panic!("reading rejected"),
        }
    }

    #[test]
    fn invalid_distance_is_rejected_without_state_change() {
        let t0 = Utc::now();
        let mut acc = running(t0);
        acc.apply_reading(&SensorReading::distance(40.0, t0));
        let before = acc.live().clone();

        assert_eq!(acc.apply_reading(&SensorReading::distance(-3.0, t0)), ReadingOutcome::Rejected);
        assert_eq!(acc.apply_reading(&SensorReading::distance(f64::NAN, t0)), ReadingOutcome::Rejected);
        assert_eq!(acc.apply_reading(&SensorReading::holder(7.0, t0)), ReadingOutcome::Rejected);
        assert_eq!(acc.live(), &before);
    }

    #[test]
    fn ticks_follow_current_proximity_state() {
        let t0 = Utc::now();
        let mut acc = running(t0);

        acc.apply_reading(&SensorReading::distance(40.0, t0));
        for _ in 0..3 {
            acc.tick();
        }
        acc.apply_reading(&SensorReading::distance(75.0, t0));
        acc.tick();
        acc.apply_reading(&SensorReading::distance(180.0, t0));
        acc.tick();
        acc.tick();

        let stats = acc.stats();
        assert_eq!(stats.total_s, 6);
        assert_eq!(stats.focus_s, 3);
        assert_eq!(stats.distraction_count, 2);
        assert_eq!(stats.away_count, 1);
    }

    #[test]
    fn away_count_increments_even_when_duration_is_discarded() {
        let t0 = Utc::now();
        let mut acc = running(t0);
        acc.apply_reading(&SensorReading::distance(40.0, t0));

        assert_eq!(
            events(acc.apply_reading(&SensorReading::distance(150.0, t0))),
            vec![EventKind::AwayStart { distance_cm: 150.0 }]
        );
        assert_eq!(
            events(acc.apply_reading(&SensorReading::distance(80.0, t0 + Duration::milliseconds(4_900)))),
            vec![]
        );
        assert_eq!(acc.stats().away_count, 1);
        assert_eq!(acc.stats().away_s, 0);

        let t1 = t0 + Duration::seconds(30);
        acc.apply_reading(&SensorReading::distance(150.0, t1));
        assert_eq!(
            events(acc.apply_reading(&SensorReading::distance(45.0, t1 + Duration::seconds(5)))),
            vec![EventKind::AwayEnd { duration_s: 5 }]
        );
        assert_eq!(acc.stats().away_count, 2);
        assert_eq!(acc.stats().away_s, 5);
    }

    #[test]
    fn pickups_count_even_when_usage_is_discarded() {
        let t0 = Utc::now();
        let mut acc = running(t0);
        acc.apply_reading(&SensorReading::holder(1.0, t0));

        assert_eq!(
            events(acc.apply_reading(&SensorReading::holder(0.0, t0))),
            vec![EventKind::PhonePickup]
        );
        assert_eq!(
            events(acc.apply_reading(&SensorReading::holder(1.0, t0 + Duration::milliseconds(2_900)))),
            vec![]
        );
        assert_eq!(acc.stats().phone_pickups, 1);
        assert_eq!(acc.stats().phone_use_s, 0);

        acc.apply_reading(&SensorReading::holder(0.0, t0 + Duration::seconds(10)));
        assert_eq!(
            events(acc.apply_reading(&SensorReading::holder(1.0, t0 + Duration::seconds(13)))),
            vec![EventKind::PhonePutback { duration_s: 3 }]
        );
        assert_eq!(acc.stats().phone_pickups, 2);
        assert_eq!(acc.stats().phone_use_s, 3);
    }

    #[test]
    fn readings_without_running_session_leave_counters_untouched() {
        let t0 = Utc::now();
        let mut acc = SessionAccumulator::default();
        acc.load(
            LoadedSession {
                id: "s1".into(),
                name: "Alice".into(),
                started_at: t0,
            },
            SessionStats {
                total_s: 50,
                focus_s: 20,
                ..SessionStats::default()
            },
        );
        let before = acc.stats();

        for (i, value) in [40.0, 150.0, 30.0, 250.0, 90.0].into_iter().enumerate() {
            acc.apply_reading(&SensorReading::distance(value, t0 + Duration::seconds(i as i64 * 10)));
        }
        for (i, value) in [1.0, 0.0, 1.0, 0.0].into_iter().enumerate() {
            let outcome = acc.apply_reading(&SensorReading::holder(value, t0 + Duration::seconds(i as i64 * 10)));
            assert_eq!(events(outcome), vec![]);
        }
        assert!(!acc.tick());

        assert_eq!(acc.stats(), before);
        assert_eq!(acc.live().proximity, Some(ProximityState::Warning));
        assert_eq!(acc.live().holder, Some(HolderState::InHand));
    }

    #[test]
    fn live_phone_usage_includes_open_interval_without_mutating() {
        let t0 = Utc::now();
        let mut acc = running(t0);
        acc.apply_reading(&SensorReading::holder(1.0, t0));
        acc.apply_reading(&SensorReading::holder(0.0, t0));

        assert_eq!(acc.live_phone_use_s(t0 + Duration::seconds(8)), 8);
        assert_eq!(acc.stats().phone_use_s, 0);
    }

    #[test]
    fn pause_flushes_phone_in_hand() {
        let t0 = Utc::now();
        let mut acc = running(t0);
        acc.apply_reading(&SensorReading::holder(1.0, t0));
        acc.apply_reading(&SensorReading::holder(0.0, t0));

        acc.pause(t0 + Duration::seconds(42));
        assert_eq!(acc.status(), RunStatus::Paused);
        assert_eq!(acc.stats().phone_use_s, 42);
        assert_eq!(acc.live_phone_use_s(t0 + Duration::seconds(100)), 42);
    }

    #[test]
    fn reloading_loaded_session_keeps_newer_counters() {
        let t0 = Utc::now();
        let mut acc = running(t0);
        for _ in 0..3 {
            acc.tick();
        }
        acc.pause(t0);

        let stale = SessionStats {
            total_s: 1,
            ..SessionStats::default()
        };
        let session = acc.session().cloned().unwrap();
        acc.load(session, stale);
        assert_eq!(acc.stats().total_s, 3);

        let other = LoadedSession {
            id: "s2".into(),
            name: "Bob".into(),
            started_at: t0,
        };
        acc.load(other, stale);
        assert_eq!(acc.stats().total_s, 1);
    }

    #[test]
    fn snapshot_carries_status_labels() {
        let t0 = Utc::now();
        let mut acc = running(t0);
        acc.apply_reading(&SensorReading::distance(10.0, t0));
        let snapshot = acc.snapshot(t0, &ScoringConfig::default());

        assert_eq!(snapshot.live.label.as_deref(), Some("Too close to the screen"));
        assert_eq!(snapshot.band, ScoreBand::Poor);
        assert_eq!(snapshot.band_label, "Easily distracted");
    }

    #[test]
    fn capture_sequence_increases() {
        let mut acc = running(Utc::now());
        let first = acc.capture().unwrap();
        acc.tick();
        let second = acc.capture().unwrap();
        assert!(second.seq > first.seq);
        assert_eq!(second.stats.total_s, 1);
        assert!(SessionAccumulator::default().capture().is_none());
    }
}
