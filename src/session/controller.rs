use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    db::{SessionRecord, SessionStatus},
    models::{EventKind, FocusEvent},
    persistence::{PersistenceError, PersistenceGateway, SessionStore, SnapshotOutcome, StatsSnapshot},
    reports::{summarize_sessions, ReportSummary, ReportWindow},
    scoring::ScoringConfig,
    sensing::SensorReading,
    settings::EngineConfig,
    tracking::{HolderTracker, ProximityTracker},
};

use super::{LiveSensorState, LoadedSession, ReadingOutcome, SessionAccumulator, SessionSnapshot};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const NOTIFICATION_CAPACITY: usize = 256;

/// Everything the controller publishes to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    StateChanged { snapshot: SessionSnapshot },
    Tick { snapshot: SessionSnapshot },
    Live { live: LiveSensorState },
    Event { event: FocusEvent },
}

/// Writes that failed while pausing a session. Nothing ticks after a pause, so
/// they are retried on the next explicit action.
#[derive(Debug, Default)]
struct PendingFlush {
    snapshots: HashMap<String, StatsSnapshot>,
    paused_at: HashMap<String, DateTime<Utc>>,
}

/// Owns the session accumulator and drives it: start/stop flows, the tick loop,
/// reading handling and persistence.
pub struct SessionController<S: SessionStore> {
    state: Arc<Mutex<SessionAccumulator>>,
    gateway: Arc<PersistenceGateway<S>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Serializes start and restore so only one resolve-and-load runs at a time.
    starting: Arc<Mutex<()>>,
    pending: Arc<Mutex<PendingFlush>>,
    tick_interval: Duration,
    scoring: ScoringConfig,
    notifier: broadcast::Sender<Notification>,
}

impl<S: SessionStore> Clone for SessionController<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            gateway: self.gateway.clone(),
            ticker: self.ticker.clone(),
            starting: self.starting.clone(),
            pending: self.pending.clone(),
            tick_interval: self.tick_interval,
            scoring: self.scoring,
            notifier: self.notifier.clone(),
        }
    }
}

impl<S: SessionStore> SessionController<S> {
    pub fn new(gateway: Arc<PersistenceGateway<S>>, config: &EngineConfig) -> Self {
        let accumulator = SessionAccumulator::new(
            config.thresholds,
            ProximityTracker::new(config.away_noise_floor_secs),
            HolderTracker::new(config.phone_noise_floor_secs),
        );
        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            state: Arc::new(Mutex::new(accumulator)),
            gateway,
            ticker: Arc::new(Mutex::new(None)),
            starting: Arc::new(Mutex::new(())),
            pending: Arc::new(Mutex::new(PendingFlush::default())),
            tick_interval: config.tick_interval(),
            scoring: config.scoring,
            notifier,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn gateway(&self) -> &Arc<PersistenceGateway<S>> {
        &self.gateway
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.state.lock().await;
        guard.snapshot(Utc::now(), &self.scoring)
    }

    /// Start a session under `name`, resuming the most recent one with that name
    /// if it exists.
    pub async fn start_session(&self, name: &str) -> Result<SessionSnapshot> {
        let name = name.trim();
        if name.is_empty() {
            bail!("session name must not be empty");
        }

        let _starting = self.starting.lock().await;
        if self.state.lock().await.is_running() {
            bail!("a session is already running");
        }

        self.flush_pending().await;
        let now = Utc::now();
        let (record, event) = self.resolve_session(name, now).await?;

        {
            let mut state = self.state.lock().await;
            if state.is_running() {
                bail!("a session is already running");
            }
            state.load(loaded_session(&record), record.stats);
            if !state.begin(now) {
                return Err(anyhow!("session {} failed to load", record.id));
            }
        }
        self.pending.lock().await.paused_at.remove(&record.id);

        self.spawn_ticker().await;
        log_info!("session '{}' ({}) running", record.name, record.id);

        self.publish_event(FocusEvent::new(record.id.clone(), event, now));
        Ok(self.emit_state_changed().await)
    }

    /// Pause the running session. Returns `None` when nothing was running.
    pub async fn stop_session(&self) -> Result<Option<SessionSnapshot>> {
        let now = Utc::now();

        let capture = {
            let mut state = self.state.lock().await;
            if !state.is_running() {
                log_warn!("stop requested with no running session");
                return Ok(None);
            }
            state.pause(now);
            state.capture()
        };

        self.cancel_ticker().await;

        let Some(capture) = capture else {
            return Err(anyhow!("running session has no identity"));
        };
        let session_id = capture.session_id.clone();

        match self.gateway.snapshot(capture.clone(), true, now).await {
            Ok(_) => {
                self.pending.lock().await.snapshots.remove(&session_id);
            }
            Err(err) => {
                log_error!("final snapshot of session {session_id} failed, keeping it for retry: {err:#}");
                self.pending
                    .lock()
                    .await
                    .snapshots
                    .insert(session_id.clone(), capture);
            }
        }
        match self
            .gateway
            .set_status(&session_id, SessionStatus::Paused, now)
            .await
        {
            Ok(()) => {
                self.pending.lock().await.paused_at.remove(&session_id);
            }
            Err(err) => {
                log_error!("failed to mark session {session_id} paused, keeping it for retry: {err:#}");
                self.pending
                    .lock()
                    .await
                    .paused_at
                    .insert(session_id.clone(), now);
            }
        }

        self.publish_event(FocusEvent::new(session_id.clone(), EventKind::SessionPause, now));
        log_info!("session {session_id} paused");
        Ok(Some(self.emit_state_changed().await))
    }

    /// Load a stored session's counters for display without running it.
    pub async fn restore_session(&self, session_id: &str) -> Result<SessionSnapshot> {
        let _starting = self.starting.lock().await;
        self.flush_pending().await;
        let record = self.gateway.load(session_id).await?;
        {
            let mut state = self.state.lock().await;
            if state.is_running() {
                bail!("cannot restore while a session is running");
            }
            state.load(loaded_session(&record), record.stats);
        }
        log_debug!("restored session {} ({})", record.name, record.id);
        Ok(self.emit_state_changed().await)
    }

    pub async fn handle_reading(&self, reading: SensorReading) -> ReadingOutcome {
        let (outcome, session_id) = {
            let mut state = self.state.lock().await;
            let outcome = state.apply_reading(&reading);
            (outcome, state.session().map(|session| session.id.clone()))
        };

        if outcome == ReadingOutcome::Rejected {
            log_debug!(
                "dropped invalid {} reading {}",
                reading.metric.as_str(),
                reading.value
            );
        }

        if let ReadingOutcome::Applied { live, events } = &outcome {
            let _ = self.notifier.send(Notification::Live { live: live.clone() });
            if let Some(session_id) = session_id {
                for kind in events {
                    self.publish_event(FocusEvent::new(
                        session_id.clone(),
                        kind.clone(),
                        reading.timestamp,
                    ));
                }
            }
        }

        outcome
    }

    /// Summary over the owner's stored sessions; the loaded session contributes
    /// its in-memory counters.
    pub async fn report(&self, window: ReportWindow) -> Result<ReportSummary> {
        self.flush_pending().await;
        let mut sessions = self.gateway.list_sessions().await?;
        {
            let state = self.state.lock().await;
            if let Some(loaded) = state.session() {
                if let Some(record) = sessions.iter_mut().find(|record| record.id == loaded.id) {
                    record.stats = state.stats();
                }
            }
        }
        Ok(summarize_sessions(&sessions, window, Utc::now()))
    }

    /// Advance the running session by one tick, publish it and queue an unforced
    /// snapshot. Returns `None` when no session runs.
    pub async fn tick_once(&self) -> Option<SessionSnapshot> {
        let now = Utc::now();
        let (snapshot, capture) = {
            let mut state = self.state.lock().await;
            if !state.tick() {
                return None;
            }
            (state.snapshot(now, &self.scoring), state.capture())
        };

        let _ = self.notifier.send(Notification::Tick {
            snapshot: snapshot.clone(),
        });

        if let Some(capture) = capture {
            spawn_snapshot(self.gateway.clone(), capture, now);
        }

        Some(snapshot)
    }

    /// Retry writes that failed while pausing. Failures stay pending.
    async fn flush_pending(&self) {
        let mut pending = self.pending.lock().await;

        let snapshots: Vec<StatsSnapshot> = pending.snapshots.drain().map(|(_, s)| s).collect();
        for snapshot in snapshots {
            let session_id = snapshot.session_id.clone();
            match self.gateway.snapshot(snapshot.clone(), true, Utc::now()).await {
                Ok(_) => log_info!("flushed pending snapshot of session {session_id}"),
                Err(err) => {
                    log_warn!("pending snapshot of session {session_id} still failing: {err:#}");
                    pending.snapshots.insert(session_id, snapshot);
                }
            }
        }

        let paused: Vec<(String, DateTime<Utc>)> = pending.paused_at.drain().collect();
        for (session_id, paused_at) in paused {
            if let Err(err) = self
                .gateway
                .set_status(&session_id, SessionStatus::Paused, paused_at)
                .await
            {
                log_warn!("pending pause of session {session_id} still failing: {err:#}");
                pending.paused_at.insert(session_id, paused_at);
            }
        }
    }

    async fn resolve_session(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(SessionRecord, EventKind)> {
        if let Some(session_id) = self.gateway.find_by_name(name).await? {
            match self.gateway.load(&session_id).await {
                Ok(mut record) => {
                    if let Err(err) = self
                        .gateway
                        .set_status(&record.id, SessionStatus::Active, now)
                        .await
                    {
                        log_warn!("failed to mark session {} active: {err:#}", record.id);
                    }
                    record.status = SessionStatus::Active;
                    return Ok((record, EventKind::SessionResume));
                }
                Err(PersistenceError::NotFound(_)) => {
                    log_warn!("session {session_id} vanished during lookup, creating a new one");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let record = self.gateway.create(name, now).await?;
        Ok((
            record,
            EventKind::SessionStart {
                name: name.to_string(),
            },
        ))
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            loop {
                interval.tick().await;
                if controller.tick_once().await.is_none() {
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn publish_event(&self, event: FocusEvent) {
        let _ = self.notifier.send(Notification::Event {
            event: event.clone(),
        });

        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            // Failures are logged by the gateway.
            let _ = gateway.record_event(&event).await;
        });
    }

    async fn emit_state_changed(&self) -> SessionSnapshot {
        let snapshot = self.snapshot().await;
        let _ = self.notifier.send(Notification::StateChanged {
            snapshot: snapshot.clone(),
        });
        snapshot
    }
}

fn loaded_session(record: &SessionRecord) -> LoadedSession {
    LoadedSession {
        id: record.id.clone(),
        name: record.name.clone(),
        started_at: record.started_at,
    }
}

fn spawn_snapshot<S: SessionStore>(
    gateway: Arc<PersistenceGateway<S>>,
    capture: StatsSnapshot,
    at: DateTime<Utc>,
) {
    tokio::spawn(async move {
        let session_id = capture.session_id.clone();
        match gateway.snapshot(capture, false, at).await {
            Ok(SnapshotOutcome::Written) => log_debug!("persisted stats of session {session_id}"),
            Ok(_) => {}
            Err(err) => log_warn!("snapshot of session {session_id} failed, retrying next tick: {err:#}"),
        }
    });
}
