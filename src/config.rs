//! Runtime settings.
//!
//! Settings are read from `settings.json` in the data directory when it
//! exists, then a handful of environment variables are applied on top so
//! deployments can point at a different remote store without editing the
//! file. Missing or unreadable files fall back to defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub data_dir: PathBuf,
    /// Per-component configuration, keyed by component name. Passed to
    /// `Component::initialize` verbatim.
    pub component_config: Value,
    pub remote_sync: RemoteSyncSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteSyncSettings {
    pub enabled: bool,
    pub uri: String,
    pub database: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "focusd".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: default_data_dir(),
            component_config: Value::Object(serde_json::Map::new()),
            remote_sync: RemoteSyncSettings::default(),
        }
    }
}

impl Default for RemoteSyncSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            uri: "mongodb://localhost:27017".to_string(),
            database: "focusapp".to_string(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".focusd")
}

impl Settings {
    /// Loads settings from `settings.json` under `data_dir`, then applies
    /// environment overrides. A missing file is not an error.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let mut settings = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("Failed to parse {}: {err}, using defaults", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        settings.data_dir = data_dir.to_path_buf();
        settings.apply_env_overrides();
        settings
    }

    pub fn save(&self) -> Result<()> {
        let path = self.data_dir.join(SETTINGS_FILE);
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create data dir {}", self.data_dir.display()))?;
        let raw = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(&path, raw)
            .with_context(|| format!("failed to write settings to {}", path.display()))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(uri) = env::var("FOCUSD_MONGO_URI") {
            if !uri.is_empty() {
                self.remote_sync.uri = uri;
                self.remote_sync.enabled = true;
            }
        }
        if let Ok(database) = env::var("FOCUSD_MONGO_DB") {
            if !database.is_empty() {
                self.remote_sync.database = database;
            }
        }
        if let Ok(enabled) = env::var("FOCUSD_SYNC_ENABLED") {
            match enabled.as_str() {
                "1" | "true" => self.remote_sync.enabled = true,
                "0" | "false" => self.remote_sync.enabled = false,
                other => warn!("Ignoring unrecognized FOCUSD_SYNC_ENABLED value: {other}"),
            }
        }
    }

    /// Configuration section for one component, `null` when absent.
    pub fn component_section(&self, name: &str) -> Value {
        self.component_config
            .get(name)
            .cloned()
            .unwrap_or(Value::Null)
    }
}
