//! In-memory store with failure injection for unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::db::{SessionRecord, SessionUpdate};
use crate::models::FocusEvent;

use super::SessionStore;

#[derive(Default)]
pub(crate) struct FlakyStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    events: Mutex<Vec<FocusEvent>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    stats_updates: AtomicUsize,
    hold: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl FlakyStore {
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn stats_updates(&self) -> usize {
        self.stats_updates.load(Ordering::SeqCst)
    }

    pub fn session(&self, id: &str) -> Option<SessionRecord> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    pub fn events(&self) -> Vec<FocusEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Make the next create or update block until released. Returns
    /// `(entered, release)`.
    pub fn hold_next_write(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some((entered.clone(), release.clone()));
        (entered, release)
    }

    async fn wait_if_held(&self) {
        let hold = self.hold.lock().unwrap().take();
        if let Some((entered, release)) = hold {
            entered.notify_one();
            release.notified().await;
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("store unavailable");
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn create_session(&self, session: &SessionRecord) -> Result<()> {
        self.wait_if_held().await;
        self.check_writes()?;
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, owner_id: &str, session_id: &str) -> Result<Option<SessionRecord>> {
        self.check_reads()?;
        Ok(self
            .session(session_id)
            .filter(|record| record.owner_id == owner_id))
    }

    async fn update_session(
        &self,
        owner_id: &str,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<()> {
        self.wait_if_held().await;
        self.check_writes()?;

        let mut sessions = self.sessions.lock().unwrap();
        let record = sessions
            .get_mut(session_id)
            .filter(|record| record.owner_id == owner_id)
            .ok_or_else(|| anyhow!("session {session_id} not found"))?;

        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(stats) = update.stats {
            record.stats = stats;
            self.stats_updates.fetch_add(1, Ordering::SeqCst);
        }
        if update.resumed_at.is_some() {
            record.resumed_at = update.resumed_at;
        }
        if update.paused_at.is_some() {
            record.paused_at = update.paused_at;
        }
        record.updated_at = update.updated_at;
        Ok(())
    }

    async fn find_session_by_name(&self, owner_id: &str, name: &str) -> Result<Option<String>> {
        self.check_reads()?;
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .values()
            .filter(|record| record.owner_id == owner_id && record.name == name)
            .max_by_key(|record| record.created_at)
            .map(|record| record.id.clone()))
    }

    async fn append_event(&self, _owner_id: &str, event: &FocusEvent) -> Result<()> {
        self.check_writes()?;
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn list_sessions(&self, owner_id: &str) -> Result<Vec<SessionRecord>> {
        self.check_reads()?;
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect())
    }
}
