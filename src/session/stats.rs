use serde::{Deserialize, Serialize};

/// Running counters of one session. All values only grow while the session runs
/// and are persisted as a whole.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionStats {
    pub total_s: u64,
    pub focus_s: u64,
    /// Ticks spent in the away state. Separate from the interval counters below.
    pub distraction_count: u64,
    pub away_s: u64,
    pub away_count: u64,
    pub phone_pickups: u64,
    pub phone_use_s: u64,
}

impl SessionStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Field-wise sum, used by reports.
    pub fn accumulate(&mut self, other: &SessionStats) {
        self.total_s += other.total_s;
        self.focus_s += other.focus_s;
        self.distraction_count += other.distraction_count;
        self.away_s += other.away_s;
        self.away_count += other.away_count;
        self.phone_pickups += other.phone_pickups;
        self.phone_use_s += other.phone_use_s;
    }
}
