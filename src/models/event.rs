//! Session events published to subscribers and appended to the event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    SessionStart { name: String },
    SessionResume,
    SessionPause,
    AwayStart { distance_cm: f64 },
    AwayEnd { duration_s: u64 },
    PhonePickup,
    PhonePutback { duration_s: u64 },
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionStart { .. } => "SESSION_START",
            EventKind::SessionResume => "SESSION_RESUME",
            EventKind::SessionPause => "SESSION_PAUSE",
            EventKind::AwayStart { .. } => "AWAY_START",
            EventKind::AwayEnd { .. } => "AWAY_END",
            EventKind::PhonePickup => "PHONE_PICKUP",
            EventKind::PhonePutback { .. } => "PHONE_PUTBACK",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FocusEvent {
    pub ts: DateTime<Utc>,
    pub session_id: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl FocusEvent {
    pub fn new(session_id: impl Into<String>, kind: EventKind, ts: DateTime<Utc>) -> Self {
        Self {
            ts,
            session_id: session_id.into(),
            kind,
        }
    }
}
