use chrono::{DateTime, Utc};

use crate::sensing::HolderState;

use super::{elapsed_secs, Transition};

pub const DEFAULT_PHONE_NOISE_FLOOR_SECS: u64 = 3;

#[derive(Debug, Clone)]
pub struct HolderTracker {
    /// `None` until the first reading arrives, so startup never produces an edge.
    last: Option<HolderState>,
    pickup_started_at: Option<DateTime<Utc>>,
    noise_floor_secs: u64,
}

impl Default for HolderTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PHONE_NOISE_FLOOR_SECS)
    }
}

impl HolderTracker {
    pub fn new(noise_floor_secs: u64) -> Self {
        Self {
            last: None,
            pickup_started_at: None,
            noise_floor_secs,
        }
    }

    pub fn current(&self) -> Option<HolderState> {
        self.last
    }

    pub fn in_hand(&self) -> bool {
        self.last == Some(HolderState::InHand)
    }

    pub fn observe(
        &mut self,
        state: HolderState,
        at: DateTime<Utc>,
        tracking: bool,
    ) -> Option<Transition> {
        let Some(previous) = self.last.replace(state) else {
            if state == HolderState::InHand && tracking {
                self.pickup_started_at = Some(at);
            }
            return None;
        };

        if previous == state || !tracking {
            return None;
        }

        match state {
            HolderState::InHand => {
                self.pickup_started_at = Some(at);
                Some(Transition::PhonePickedUp)
            }
            HolderState::InHolder => {
                let started_at = self.pickup_started_at.take()?;
                Some(self.close(started_at, at))
            }
        }
    }

    /// Called when a session starts: a phone already in hand starts its usage
    /// interval now, without counting a pickup.
    pub fn begin(&mut self, at: DateTime<Utc>) {
        self.pickup_started_at = if self.in_hand() { Some(at) } else { None };
    }

    /// Close the open usage interval when the session pauses.
    pub fn finish(&mut self, at: DateTime<Utc>) -> Option<Transition> {
        let started_at = self.pickup_started_at.take()?;
        Some(self.close(started_at, at))
    }

    /// Seconds the phone has been in hand in the open interval.
    pub fn open_usage_secs(&self, now: DateTime<Utc>) -> u64 {
        self.pickup_started_at
            .map(|started_at| elapsed_secs(started_at, now))
            .unwrap_or(0)
    }

    fn close(&self, started_at: DateTime<Utc>, at: DateTime<Utc>) -> Transition {
        let duration_secs = elapsed_secs(started_at, at);
        if duration_secs >= self.noise_floor_secs {
            Transition::PhonePutBack { duration_secs }
        } else {
            Transition::PhoneUsageDiscarded { duration_secs }
        }
    }
}
