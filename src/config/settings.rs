//! User settings record stored on disk
//!
//! Holds the preferred browser; its absence is the unconfigured state that
//! gates every browser tool.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_browser: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode settings: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Settings persistence collaborator
pub trait SettingsStore: Send + Sync {
    fn get(&self) -> Settings;
    fn update(&self, f: &mut dyn FnMut(&mut Settings)) -> Result<Settings, SettingsError>;
}

/// JSON file in the config directory, cached in memory
pub struct JsonSettingsStore {
    path: PathBuf,
    cache: RwLock<Settings>,
}

impl JsonSettingsStore {
    pub fn default_path() -> PathBuf {
        super::toml_config::config_dir().join(SETTINGS_FILE)
    }

    /// Open at `path`; unreadable or missing files start from defaults
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = Self::load(&path);
        Self {
            path,
            cache: RwLock::new(settings),
        }
    }

    fn load(path: &Path) -> Settings {
        if path.exists() {
            match fs::read_to_string(path).map(|c| serde_json::from_str::<Settings>(&c)) {
                Ok(Ok(settings)) => return settings,
                Ok(Err(e)) => tracing::warn!("Ignoring malformed settings {:?}: {}", path, e),
                Err(e) => tracing::warn!("Failed to read settings {:?}: {}", path, e),
            }
        }
        Settings::default()
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, contents)?;
        tracing::debug!("Saved settings to {:?}", self.path);
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self) -> Settings {
        self.cache.read().map(|s| s.clone()).unwrap_or_default()
    }

    fn update(&self, f: &mut dyn FnMut(&mut Settings)) -> Result<Settings, SettingsError> {
        let mut next = self.get();
        f(&mut next);
        self.save(&next)?;
        if let Ok(mut cache) = self.cache.write() {
            *cache = next.clone();
        }
        Ok(next)
    }
}

/// Process-memory settings, for tests and throwaway sessions
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self) -> Settings {
        self.settings.read().map(|s| s.clone()).unwrap_or_default()
    }

    fn update(&self, f: &mut dyn FnMut(&mut Settings)) -> Result<Settings, SettingsError> {
        let mut guard = self
            .settings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *guard);
        Ok(guard.clone())
    }
}
