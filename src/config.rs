use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    location::{BackendPreference, TrackingSettings, WatchOptions},
    models::HelpCenter,
    utils::logging::parse_level,
};

pub const DEBUG_ENV: &str = "SHESHIELD_DEBUG";
pub const DATA_DIR_ENV: &str = "SHESHIELD_DATA_DIR";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Relative paths resolve against `CoreConfig::data_dir` when one is set.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("sheshield.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub backend: BackendPreference,
    pub fix_timeout_ms: u64,
    pub watch_interval_ms: u64,
    pub watch_distance_m: f64,
    pub poll_interval_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            fix_timeout_ms: 15_000,
            watch_interval_ms: 4_000,
            watch_distance_m: 5.0,
            poll_interval_ms: 1_000,
        }
    }
}

impl LocationConfig {
    pub fn tracking(&self) -> TrackingSettings {
        TrackingSettings {
            fix_timeout: Duration::from_millis(self.fix_timeout_ms),
            watch: WatchOptions {
                min_interval: Duration::from_millis(self.watch_interval_ms),
                min_distance_m: self.watch_distance_m,
                ..WatchOptions::default()
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Close SOS logs left open by a previous run during hydration.
    pub close_orphaned_sos: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            close_orphaned_sos: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub namespace: String,
    pub emergency_contacts: Vec<String>,
    pub data_dir: Option<PathBuf>,
    pub storage: StorageConfig,
    pub location: LocationConfig,
    pub recovery: RecoveryConfig,
    pub log_level: String,
    pub help_centers: Vec<HelpCenter>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            namespace: "she_shield".into(),
            emergency_contacts: vec!["+919900112233".into(), "+919900221133".into()],
            data_dir: None,
            storage: StorageConfig::default(),
            location: LocationConfig::default(),
            recovery: RecoveryConfig::default(),
            log_level: "info".into(),
            help_centers: Vec::new(),
        }
    }
}

impl CoreConfig {
    /// Missing file means defaults; a malformed one is reported and replaced by defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!("Ignoring malformed config {}: {err}", path.display());
            Self::default()
        }))
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(DEBUG_ENV).ok(),
            std::env::var(DATA_DIR_ENV).ok(),
        )
    }

    fn with_overrides(mut self, debug: Option<String>, data_dir: Option<String>) -> Self {
        let debug_mode = debug
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.log_level = "debug".into();
        }
        if let Some(dir) = data_dir.filter(|dir| !dir.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn log_filter(&self) -> log::LevelFilter {
        parse_level(&self.log_level)
    }

    pub fn storage_path(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) if self.storage.path.is_relative() => dir.join(&self.storage.path),
            _ => self.storage.path.clone(),
        }
    }
}
