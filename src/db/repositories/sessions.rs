use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_status, to_i64, to_u64},
    models::{SessionRecord, SessionStatus, SessionUpdate},
};
use crate::session::SessionStats;

const SESSION_COLUMNS: &str = "id, owner_id, name, status, started_at, resumed_at, paused_at,
     total_s, focus_s, distraction_count, away_s, away_count, phone_pickups, phone_use_s,
     created_at, updated_at";

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let status: String = row.get("status")?;
    let started_at: String = row.get("started_at")?;
    let resumed_at: Option<String> = row.get("resumed_at")?;
    let paused_at: Option<String> = row.get("paused_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    let stats = SessionStats {
        total_s: to_u64(row.get("total_s")?, "total_s")?,
        focus_s: to_u64(row.get("focus_s")?, "focus_s")?,
        distraction_count: to_u64(row.get("distraction_count")?, "distraction_count")?,
        away_s: to_u64(row.get("away_s")?, "away_s")?,
        away_count: to_u64(row.get("away_count")?, "away_count")?,
        phone_pickups: to_u64(row.get("phone_pickups")?, "phone_pickups")?,
        phone_use_s: to_u64(row.get("phone_use_s")?, "phone_use_s")?,
    };

    Ok(SessionRecord {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        status: parse_status(&status)?,
        started_at: parse_datetime(&started_at, "started_at")?,
        resumed_at: parse_optional_datetime(resumed_at, "resumed_at")?,
        paused_at: parse_optional_datetime(paused_at, "paused_at")?,
        stats,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_session(&self, session: &SessionRecord) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let stats = record.stats;
            conn.execute(
                "INSERT INTO sessions (id, owner_id, name, status, started_at, resumed_at, paused_at,
                     total_s, focus_s, distraction_count, away_s, away_count, phone_pickups, phone_use_s,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    record.id,
                    record.owner_id,
                    record.name,
                    record.status.as_str(),
                    record.started_at.to_rfc3339(),
                    record.resumed_at.map(|dt| dt.to_rfc3339()),
                    record.paused_at.map(|dt| dt.to_rfc3339()),
                    to_i64(stats.total_s)?,
                    to_i64(stats.focus_s)?,
                    to_i64(stats.distraction_count)?,
                    to_i64(stats.away_s)?,
                    to_i64(stats.away_count)?,
                    to_i64(stats.phone_pickups)?,
                    to_i64(stats.phone_use_s)?,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, owner_id: &str, session_id: &str) -> Result<Option<SessionRecord>> {
        let owner_id = owner_id.to_string();
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM sessions
                 WHERE owner_id = ?1 AND id = ?2"
            ))?;

            let mut rows = stmt.query(params![owner_id, session_id])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    /// Most recently created session with exactly this name.
    pub async fn find_session_id_by_name(&self, owner_id: &str, name: &str) -> Result<Option<String>> {
        let owner_id = owner_id.to_string();
        let name = name.to_string();
        self.execute(move |conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM sessions
                     WHERE owner_id = ?1 AND name = ?2
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1",
                    params![owner_id, name],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(id)
        })
        .await
    }

    pub async fn update_session(
        &self,
        owner_id: &str,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<()> {
        let owner_id = owner_id.to_string();
        let session_id = session_id.to_string();
        let update = update.clone();
        self.execute(move |conn| {
            let stats = update.stats;
            let stat = |pick: fn(&SessionStats) -> u64| -> Result<Option<i64>> {
                stats.as_ref().map(|s| to_i64(pick(s))).transpose()
            };

            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET status = COALESCE(?1, status),
                     resumed_at = COALESCE(?2, resumed_at),
                     paused_at = COALESCE(?3, paused_at),
                     total_s = COALESCE(?4, total_s),
                     focus_s = COALESCE(?5, focus_s),
                     distraction_count = COALESCE(?6, distraction_count),
                     away_s = COALESCE(?7, away_s),
                     away_count = COALESCE(?8, away_count),
                     phone_pickups = COALESCE(?9, phone_pickups),
                     phone_use_s = COALESCE(?10, phone_use_s),
                     updated_at = ?11
                 WHERE owner_id = ?12 AND id = ?13",
                params![
                    update.status.map(|status| status.as_str()),
                    update.resumed_at.map(|dt| dt.to_rfc3339()),
                    update.paused_at.map(|dt| dt.to_rfc3339()),
                    stat(|s| s.total_s)?,
                    stat(|s| s.focus_s)?,
                    stat(|s| s.distraction_count)?,
                    stat(|s| s.away_s)?,
                    stat(|s| s.away_count)?,
                    stat(|s| s.phone_pickups)?,
                    stat(|s| s.phone_use_s)?,
                    update.updated_at.to_rfc3339(),
                    owner_id,
                    session_id,
                ],
            )?;

            if rows_affected == 0 {
                bail!("session {session_id} not found");
            }
            Ok(())
        })
        .await
    }

    pub async fn list_sessions(&self, owner_id: &str) -> Result<Vec<SessionRecord>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM sessions
                 WHERE owner_id = ?1
                 ORDER BY started_at DESC"
            ))?;

            let mut rows = stmt.query(params![owner_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    /// Pause sessions left active by a crash. Returns how many were recovered.
    pub async fn pause_orphaned_sessions(&self, owner_id: &str, at: DateTime<Utc>) -> Result<usize> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let recovered = conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     paused_at = ?2,
                     updated_at = ?2
                 WHERE owner_id = ?3 AND status = ?4",
                params![
                    SessionStatus::Paused.as_str(),
                    at.to_rfc3339(),
                    owner_id,
                    SessionStatus::Active.as_str(),
                ],
            )?;
            Ok(recovered)
        })
        .await
    }
}
