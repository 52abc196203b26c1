//! Weekly and monthly roll-ups across an owner's stored sessions.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::SessionRecord;
use crate::session::SessionStats;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReportWindow {
    /// Sessions started within the trailing number of days.
    LastDays(u32),
    /// Sessions started in the current UTC calendar month.
    CurrentMonth,
}

impl ReportWindow {
    pub const WEEKLY: ReportWindow = ReportWindow::LastDays(7);

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Some(Self::WEEKLY),
            "monthly" | "month" => Some(Self::CurrentMonth),
            _ => None,
        }
    }

    pub fn contains(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            ReportWindow::LastDays(days) => {
                started_at <= now && started_at >= now - Duration::days(i64::from(*days))
            }
            ReportWindow::CurrentMonth => {
                started_at.year() == now.year() && started_at.month() == now.month()
            }
        }
    }

    fn title(&self) -> String {
        match self {
            ReportWindow::LastDays(7) => "Weekly report".to_string(),
            ReportWindow::LastDays(days) => format!("Last {days} days"),
            ReportWindow::CurrentMonth => "Monthly report".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub window: ReportWindow,
    pub sessions: usize,
    pub stats: SessionStats,
}

pub fn summarize_sessions(
    sessions: &[SessionRecord],
    window: ReportWindow,
    now: DateTime<Utc>,
) -> ReportSummary {
    let mut stats = SessionStats::default();
    let mut count = 0;
    for session in sessions
        .iter()
        .filter(|session| window.contains(session.started_at, now))
    {
        stats.accumulate(&session.stats);
        count += 1;
    }

    ReportSummary {
        window,
        sessions: count,
        stats,
    }
}

/// `m:ss`, minutes unbounded.
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;
        writeln!(f, "{}", self.window.title())?;
        if self.sessions == 0 {
            return write!(f, "No sessions in this range.");
        }
        writeln!(f, "Sessions: {}", self.sessions)?;
        writeln!(f, "Total time: {}", format_duration(stats.total_s))?;
        writeln!(f, "Focus time: {}", format_duration(stats.focus_s))?;
        writeln!(f, "Distractions: {}", stats.distraction_count)?;
        writeln!(f, "Away time: {} ({} times)", format_duration(stats.away_s), stats.away_count)?;
        write!(
            f,
            "Phone: {} pickups, {} in hand",
            stats.phone_pickups,
            format_duration(stats.phone_use_s)
        )
    }
}
