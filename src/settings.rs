use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};
use uuid::Uuid;

use crate::{
    scoring::ScoringConfig,
    sensing::ProximityThresholds,
    tracking::{holder::DEFAULT_PHONE_NOISE_FLOOR_SECS, proximity::DEFAULT_AWAY_NOISE_FLOOR_SECS},
};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Tunables of the session engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: ProximityThresholds,
    pub away_noise_floor_secs: u64,
    pub phone_noise_floor_secs: u64,
    pub tick_interval_ms: u64,
    pub persist_every_secs: u64,
    pub scoring: ScoringConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: ProximityThresholds::default(),
            away_noise_floor_secs: DEFAULT_AWAY_NOISE_FLOOR_SECS,
            phone_noise_floor_secs: DEFAULT_PHONE_NOISE_FLOOR_SECS,
            tick_interval_ms: 1_000,
            persist_every_secs: 5,
            scoring: ScoringConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn persist_every(&self) -> Duration {
        Duration::from_secs(self.persist_every_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    owner_id: Option<String>,
    last_session_id: Option<String>,
    engine: EngineConfig,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Device/owner id, generated and saved on first use.
    pub fn owner_id(&self) -> Result<String> {
        if let Some(owner_id) = self.read().owner_id.clone() {
            return Ok(owner_id);
        }

        let mut guard = self.write();
        let owner_id = guard
            .owner_id
            .get_or_insert_with(|| format!("dev_{}", Uuid::new_v4().simple()))
            .clone();
        self.persist(&guard)?;
        Ok(owner_id)
    }

    pub fn last_session_id(&self) -> Option<String> {
        self.read().last_session_id.clone()
    }

    pub fn set_last_session_id(&self, session_id: Option<String>) -> Result<()> {
        let mut guard = self.write();
        if guard.last_session_id == session_id {
            return Ok(());
        }
        guard.last_session_id = session_id;
        self.persist(&guard)
    }

    pub fn engine(&self) -> EngineConfig {
        self.read().engine.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
