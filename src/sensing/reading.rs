//! Sensor reading model and payload decoding.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Metric {
    #[serde(rename = "distance_cm")]
    Distance,
    #[serde(rename = "holder")]
    Holder,
}

impl Metric {
    /// Resolve a metric from a field name or the last segment of a broker topic,
    /// e.g. `focusSense/desk1/distance`.
    pub fn from_name(name: &str) -> Option<Self> {
        let key = name.rsplit('/').next().unwrap_or(name).trim();
        match key.to_ascii_lowercase().as_str() {
            "distance" | "distance_cm" => Some(Metric::Distance),
            "holder" | "reed" => Some(Metric::Holder),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Distance => "distance_cm",
            Metric::Holder => "holder",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SensorReading {
    pub metric: Metric,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    pub fn distance(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric: Metric::Distance,
            value,
            timestamp,
        }
    }

    pub fn holder(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric: Metric::Holder,
            value,
            timestamp,
        }
    }
}

/// Decode a single broker message (`topic`, raw text payload).
///
/// Only the shape is checked here; out-of-range numbers are still returned so the
/// validator can drop them.
pub fn decode_payload(topic: &str, payload: &str, timestamp: DateTime<Utc>) -> Result<SensorReading> {
    let metric = Metric::from_name(topic).ok_or_else(|| anyhow!("unknown metric topic '{topic}'"))?;
    let value: f64 = payload
        .trim()
        .parse()
        .with_context(|| format!("payload '{}' is not a number", payload.trim()))?;

    Ok(SensorReading {
        metric,
        value,
        timestamp,
    })
}

/// Realtime-database `sensors` node: both sensors in one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SensorNode {
    pub distance_cm: Option<f64>,
    #[serde(alias = "holder")]
    pub reed: Option<f64>,
}

impl SensorNode {
    /// Distance first, then holder.
    pub fn into_readings(self, timestamp: DateTime<Utc>) -> Vec<SensorReading> {
        let mut readings = Vec::with_capacity(2);
        if let Some(distance) = self.distance_cm {
            readings.push(SensorReading::distance(distance, timestamp));
        }
        if let Some(reed) = self.reed {
            readings.push(SensorReading::holder(reed, timestamp));
        }
        readings
    }
}
