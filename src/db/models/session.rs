//! Stored session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionStats;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Active,
    Paused,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub stats: SessionStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// A fresh, active session with zeroed counters.
    pub fn new(owner_id: &str, name: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            status: SessionStatus::Active,
            started_at: at,
            resumed_at: None,
            paused_at: None,
            stats: SessionStats::default(),
            created_at: at,
            updated_at: at,
        }
    }
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub status: Option<SessionStatus>,
    pub stats: Option<SessionStats>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SessionUpdate {
    pub fn stats(stats: SessionStats, at: DateTime<Utc>) -> Self {
        Self {
            status: None,
            stats: Some(stats),
            resumed_at: None,
            paused_at: None,
            updated_at: at,
        }
    }

    pub fn status(status: SessionStatus, at: DateTime<Utc>) -> Self {
        let (resumed_at, paused_at) = match status {
            SessionStatus::Active => (Some(at), None),
            SessionStatus::Paused => (None, Some(at)),
        };
        Self {
            status: Some(status),
            stats: None,
            resumed_at,
            paused_at,
            updated_at: at,
        }
    }
}
