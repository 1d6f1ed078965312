//! TOML Configuration with Environment Variable Overrides
//!
//! Loaded from `<config_dir>/deskpilot/config.toml`; every section is
//! optional. `DESKPILOT_*` environment variables override file values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DeskpilotConfig {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShellConfig {
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Working directory when the caller gives none
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Upper bound on any shell timeout, whatever the config says
pub const HARD_MAX_TIMEOUT_MS: u64 = 120_000;

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_max_timeout_ms() -> u64 {
    HARD_MAX_TIMEOUT_MS
}
fn default_max_output_bytes() -> usize {
    10 * 1024 * 1024
}

impl ShellConfig {
    /// Cap `max_timeout_ms` at [`HARD_MAX_TIMEOUT_MS`] and keep the default in `1..=max`
    pub fn clamped(mut self) -> Self {
        self.max_timeout_ms = self.max_timeout_ms.clamp(1, HARD_MAX_TIMEOUT_MS);
        self.default_timeout_ms = self.default_timeout_ms.clamp(1, self.max_timeout_ms);
        self
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            max_timeout_ms: default_max_timeout_ms(),
            max_output_bytes: default_max_output_bytes(),
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_grep_max_results")]
    pub grep_max_results: usize,
    #[serde(default = "default_glob_max_results")]
    pub glob_max_results: usize,
}

fn default_grep_max_results() -> usize {
    50
}
fn default_glob_max_results() -> usize {
    500
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grep_max_results: default_grep_max_results(),
            glob_max_results: default_glob_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillsConfig {
    #[serde(default = "default_registry_url")]
    pub registry_url: String,
    #[serde(default = "default_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_registry_url() -> String {
    "https://skills.deskpilot.dev/api".to_string()
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            search_debounce_ms: default_debounce_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Keep persistent permission grants in a sled database
    #[serde(default = "default_true")]
    pub persist_permissions: bool,
    /// Override for the settings JSON location
    #[serde(default)]
    pub settings_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist_permissions: true,
            settings_file: None,
        }
    }
}

/// `<config_dir>/deskpilot`
pub fn config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("deskpilot");
    path
}

pub fn get_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Load from the default location with environment overrides
pub fn load_config() -> Result<DeskpilotConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load from `path`; a missing file yields defaults
pub fn load_config_from(path: &Path) -> Result<DeskpilotConfig, ConfigError> {
    let config = if path.exists() {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str::<DeskpilotConfig>(&contents).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracing::info!("Loaded TOML config from {:?}", path);
        config
    } else {
        tracing::debug!("No config at {:?}; using defaults", path);
        DeskpilotConfig::default()
    };

    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

/// Write atomically through a temp file, keeping a backup of the previous file
pub fn save_config(config: &DeskpilotConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if path.exists() {
        let backup = path.with_extension("toml.bak");
        if let Err(e) = fs::copy(path, &backup) {
            tracing::warn!("Failed to back up {:?} to {:?}: {}", path, backup, e);
        }
    }

    let contents = toml::to_string_pretty(config)?;
    let temp_path = path.with_extension("toml.tmp");
    fs::write(&temp_path, &contents)?;
    fs::rename(&temp_path, path)?;

    tracing::info!("Saved TOML config to {:?}", path);
    Ok(())
}

fn apply_env_overrides<F>(mut config: DeskpilotConfig, lookup: F) -> DeskpilotConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(ms) = lookup("DESKPILOT_SHELL_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.shell.default_timeout_ms = ms;
    }
    if let Some(ms) = lookup("DESKPILOT_SHELL_MAX_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.shell.max_timeout_ms = ms;
    }
    if let Some(dir) = lookup("DESKPILOT_WORKING_DIR").filter(|v| !v.is_empty()) {
        config.shell.working_dir = Some(PathBuf::from(dir));
    }
    if let Some(max) = lookup("DESKPILOT_GREP_MAX_RESULTS").and_then(|v| v.parse().ok()) {
        config.search.grep_max_results = max;
    }
    if let Some(url) = lookup("DESKPILOT_SKILLS_URL").filter(|v| !v.is_empty()) {
        config.skills.registry_url = url;
    }
    if let Some(persist) = lookup("DESKPILOT_PERSIST_PERMISSIONS") {
        config.storage.persist_permissions = persist == "1" || persist.eq_ignore_ascii_case("true");
    }

    config.shell = config.shell.clamped();
    config
}
