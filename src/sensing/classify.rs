//! Distance validation and state classification for the desk sensors.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Physical range of the ultrasonic distance sensor, in centimetres.
pub const MIN_VALID_DISTANCE_CM: f64 = 0.0;
pub const MAX_VALID_DISTANCE_CM: f64 = 400.0;

/// A distance is usable when it is finite and inside the sensor's range.
pub fn is_valid_distance(distance_cm: f64) -> bool {
    distance_cm.is_finite()
        && (MIN_VALID_DISTANCE_CM..=MAX_VALID_DISTANCE_CM).contains(&distance_cm)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ProximityState {
    Focus,
    Warning,
    Away,
}

/// Finer-grained view of a distance, used for the live status label.
/// Both `TooClose` and `Uncertain` collapse to [`ProximityState::Warning`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProximityBand {
    TooClose,
    Focus,
    Uncertain,
    Away,
}

impl ProximityBand {
    pub fn state(&self) -> ProximityState {
        match self {
            ProximityBand::TooClose | ProximityBand::Uncertain => ProximityState::Warning,
            ProximityBand::Focus => ProximityState::Focus,
            ProximityBand::Away => ProximityState::Away,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProximityBand::TooClose => "Too close to the screen",
            ProximityBand::Focus => "Focused",
            ProximityBand::Uncertain => "Uncertain",
            ProximityBand::Away => "Away from desk",
        }
    }
}

/// Band boundaries in centimetres. Each band includes its lower bound.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProximityThresholds {
    /// Below this the user is too close (warning).
    pub too_close_below_cm: f64,
    /// Start of the uncertain band; `[too_close_below_cm, uncertain_from_cm)` is focus.
    pub uncertain_from_cm: f64,
    /// Start of the away band.
    pub away_from_cm: f64,
}

impl Default for ProximityThresholds {
    fn default() -> Self {
        Self {
            too_close_below_cm: 20.0,
            uncertain_from_cm: 60.0,
            away_from_cm: 100.0,
        }
    }
}

impl ProximityThresholds {
    pub fn validate(&self) -> Result<()> {
        let ordered = self.too_close_below_cm < self.uncertain_from_cm
            && self.uncertain_from_cm < self.away_from_cm;
        if !ordered {
            bail!(
                "proximity thresholds must be strictly increasing (got {} / {} / {})",
                self.too_close_below_cm,
                self.uncertain_from_cm,
                self.away_from_cm
            );
        }
        Ok(())
    }

    pub fn band(&self, distance_cm: f64) -> ProximityBand {
        if distance_cm < self.too_close_below_cm {
            ProximityBand::TooClose
        } else if distance_cm < self.uncertain_from_cm {
            ProximityBand::Focus
        } else if distance_cm < self.away_from_cm {
            ProximityBand::Uncertain
        } else {
            ProximityBand::Away
        }
    }

    pub fn classify(&self, distance_cm: f64) -> ProximityState {
        self.band(distance_cm).state()
    }
}

/// Classify with the default thresholds.
pub fn classify(distance_cm: f64) -> ProximityState {
    ProximityThresholds::default().classify(distance_cm)
}

/// Phone holder reed switch: `0` means the phone is in hand, `1` in the holder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum HolderState {
    InHand,
    InHolder,
}

impl HolderState {
    pub fn from_raw(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(HolderState::InHand)
        } else if value == 1.0 {
            Some(HolderState::InHolder)
        } else {
            None
        }
    }
}
