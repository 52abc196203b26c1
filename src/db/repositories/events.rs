use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::{connection::Database, helpers::parse_datetime};
use crate::models::{EventKind, FocusEvent};

impl Database {
    pub async fn insert_event(&self, owner_id: &str, event: &FocusEvent) -> Result<()> {
        let owner_id = owner_id.to_string();
        let event = event.clone();
        self.execute(move |conn| {
            let payload_json =
                serde_json::to_string(&event.kind).context("failed to encode event payload")?;
            conn.execute(
                "INSERT INTO events (owner_id, session_id, ts, event_type, payload_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    owner_id,
                    event.session_id,
                    event.ts.to_rfc3339(),
                    event.kind.as_str(),
                    payload_json,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Events of one session in insertion order.
    pub async fn get_events_for_session(
        &self,
        owner_id: &str,
        session_id: &str,
    ) -> Result<Vec<FocusEvent>> {
        let owner_id = owner_id.to_string();
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, ts, payload_json
                 FROM events
                 WHERE owner_id = ?1 AND session_id = ?2
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![owner_id, session_id])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                let ts: String = row.get("ts")?;
                let payload_json: String = row.get("payload_json")?;
                let kind: EventKind = serde_json::from_str(&payload_json)
                    .with_context(|| format!("invalid event payload: {payload_json}"))?;
                events.push(FocusEvent {
                    ts: parse_datetime(&ts, "ts")?,
                    session_id: row.get("session_id")?,
                    kind,
                });
            }

            Ok(events)
        })
        .await
    }
}
