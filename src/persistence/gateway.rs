use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};

use crate::{
    db::{SessionRecord, SessionStatus, SessionUpdate},
    models::FocusEvent,
    session::SessionStats,
};

use super::SessionStore;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub const DEFAULT_PERSIST_EVERY: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("session {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Full copy of a session's counters, stamped with the accumulator's sequence
/// number at capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub session_id: String,
    pub stats: SessionStats,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Written,
    /// Skipped: the last successful write is younger than the throttle window.
    Throttled,
    /// Skipped: another write is still running.
    InFlight,
    /// Skipped: a newer snapshot has already been written.
    Superseded,
}

#[derive(Debug, Default)]
struct WriteProgress {
    last_write: Option<Instant>,
    /// Highest sequence written, per session.
    last_seq: HashMap<String, u64>,
}

/// Owner-scoped access to the session store with throttled, ordered snapshot writes.
pub struct PersistenceGateway<S: SessionStore> {
    store: Arc<S>,
    owner_id: String,
    persist_every: Duration,
    writes: Mutex<WriteProgress>,
}

impl<S: SessionStore> PersistenceGateway<S> {
    pub fn new(store: Arc<S>, owner_id: impl Into<String>, persist_every: Duration) -> Self {
        Self {
            store,
            owner_id: owner_id.into(),
            persist_every,
            writes: Mutex::new(WriteProgress::default()),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.store.find_session_by_name(&self.owner_id, name).await?)
    }

    pub async fn load(&self, session_id: &str) -> Result<SessionRecord, PersistenceError> {
        self.store
            .get_session(&self.owner_id, session_id)
            .await?
            .ok_or_else(|| PersistenceError::NotFound(session_id.to_string()))
    }

    pub async fn create(&self, name: &str, at: DateTime<Utc>) -> Result<SessionRecord, PersistenceError> {
        let record = SessionRecord::new(&self.owner_id, name, at);
        self.store.create_session(&record).await?;
        log_debug!("created session {} ({})", record.id, record.name);
        Ok(record)
    }

    /// Write a stats snapshot. Unforced writes are throttled to one per window and
    /// give way to a write already in flight; forced writes wait their turn.
    /// Snapshots older than the last written one are dropped.
    pub async fn snapshot(
        &self,
        snapshot: StatsSnapshot,
        force: bool,
        at: DateTime<Utc>,
    ) -> Result<SnapshotOutcome, PersistenceError> {
        let mut progress = if force {
            self.writes.lock().await
        } else {
            match self.writes.try_lock() {
                Ok(guard) => guard,
                Err(_) => return Ok(SnapshotOutcome::InFlight),
            }
        };

        if !force {
            if let Some(last_write) = progress.last_write {
                if last_write.elapsed() < self.persist_every {
                    return Ok(SnapshotOutcome::Throttled);
                }
            }
        }

        let last_seq = progress
            .last_seq
            .get(&snapshot.session_id)
            .copied()
            .unwrap_or(0);
        if snapshot.seq <= last_seq {
            return Ok(SnapshotOutcome::Superseded);
        }

        let update = SessionUpdate::stats(snapshot.stats, at);
        self.store
            .update_session(&self.owner_id, &snapshot.session_id, &update)
            .await?;

        progress.last_seq.insert(snapshot.session_id, snapshot.seq);
        progress.last_write = Some(Instant::now());
        Ok(SnapshotOutcome::Written)
    }

    pub async fn set_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let update = SessionUpdate::status(status, at);
        self.store
            .update_session(&self.owner_id, session_id, &update)
            .await?;
        Ok(())
    }

    pub async fn record_event(&self, event: &FocusEvent) -> Result<(), PersistenceError> {
        if let Err(err) = self.store.append_event(&self.owner_id, event).await {
            log_warn!("failed to append {} event: {err:#}", event.kind.as_str());
            return Err(err.into());
        }
        Ok(())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>, PersistenceError> {
        Ok(self.store.list_sessions(&self.owner_id).await?)
    }
}
