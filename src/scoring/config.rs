use serde::{Deserialize, Serialize};

/// Weights and constants for the focus score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub weight_focus: f64,
    pub weight_distraction: f64,
    pub weight_phone: f64,
    pub weight_break: f64,

    /// Distraction ticks at which the distraction term reaches zero.
    pub distraction_tolerance: f64,

    /// Phone usage ratio multiplier; a ratio of `1 / multiplier` zeroes the phone term.
    pub phone_usage_multiplier: f64,

    /// Not derived from data yet.
    pub break_quality: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_focus: 50.0,
            weight_distraction: 15.0,
            weight_phone: 25.0,
            weight_break: 10.0,
            distraction_tolerance: 15.0,
            phone_usage_multiplier: 2.0,
            break_quality: 0.8,
        }
    }
}
