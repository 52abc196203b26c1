pub mod db;
pub mod models;
pub mod persistence;
pub mod reports;
pub mod scoring;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod tracking;
pub mod utils;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use tokio::{io::BufReader, sync::broadcast, task::JoinHandle};

use db::Database;
use persistence::{PersistenceGateway, SessionStore};
use sensing::{InboundMessage, SensingController};
use session::{
    commands::{dispatch, CommandReply, SessionCommand},
    Notification, SessionController,
};
use settings::{SettingsStore, SETTINGS_FILE_NAME};

const DATA_DIR_ENV: &str = "FOCUSSENSE_DATA_DIR";
const DEBUG_ENV: &str = "FOCUSSENSE_DEBUG";
const DEFAULT_DATA_DIR: &str = ".focussense";
const DATABASE_FILE_NAME: &str = "focussense.sqlite3";

fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Write one JSON line to stdout.
fn emit_line<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!("failed to encode outbound message: {err}"),
    }
}

fn spawn_notification_printer(mut rx: broadcast::Receiver<Notification>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notification) => emit_line(&notification),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("notification printer lagged, skipped {skipped} messages")
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn handle_command<S: SessionStore>(
    controller: &SessionController<S>,
    settings: &SettingsStore,
    command: SessionCommand,
) {
    match dispatch(controller, command).await {
        Ok(reply) => {
            if let CommandReply::Started { snapshot } = &reply {
                let session_id = snapshot.session.as_ref().map(|session| session.id.clone());
                if let Err(err) = settings.set_last_session_id(session_id) {
                    warn!("failed to remember last session: {err:#}");
                }
            }
            emit_line(&reply);
        }
        Err(message) => emit_line(&serde_json::json!({ "type": "error", "message": message })),
    }
}

pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    let default_level = if debug_mode() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    info!("FocusSense starting up...");

    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE_NAME))?;
    let owner_id = settings.owner_id()?;
    let engine = settings.engine();
    engine.validate().context("invalid engine configuration")?;

    let database = Database::new(data_dir.join(DATABASE_FILE_NAME))?;

    // Sessions still marked active were running when the engine last died.
    let recovered = database
        .pause_orphaned_sessions(&owner_id, Utc::now())
        .await?;
    if recovered > 0 {
        warn!("Recovered {recovered} orphaned session(s); marked as paused");
    }

    let gateway = Arc::new(PersistenceGateway::new(
        Arc::new(database),
        owner_id,
        engine.persist_every(),
    ));
    let controller = SessionController::new(gateway, &engine);
    let printer = spawn_notification_printer(controller.subscribe());

    if let Some(session_id) = settings.last_session_id() {
        if let Err(err) = controller.restore_session(&session_id).await {
            warn!("could not restore last session {session_id}: {err:#}");
        }
    }

    let mut sensing = SensingController::new();
    let mut inbound = sensing.start_ingest(BufReader::new(tokio::io::stdin()))?;

    loop {
        tokio::select! {
            message = inbound.recv() => match message {
                Some(InboundMessage::Readings(readings)) => {
                    for reading in readings {
                        controller.handle_reading(reading).await;
                    }
                }
                Some(InboundMessage::Command(command)) => {
                    handle_command(&controller, &settings, command).await;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    sensing.stop_ingest().await?;
    controller.stop_session().await?;

    // The printer exits once the last notification sender is gone.
    drop(controller);
    if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
        warn!("notification printer did not drain in time");
    }

    info!("FocusSense stopped");
    Ok(())
}
