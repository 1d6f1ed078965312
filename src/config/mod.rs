//! Config module - file configuration and user settings

pub mod settings;
pub mod toml_config;

pub use settings::{
    JsonSettingsStore, MemorySettingsStore, Settings, SettingsError, SettingsStore,
};
pub use toml_config::{
    config_dir, get_config_path, load_config, load_config_from, save_config, ConfigError,
    DeskpilotConfig, SearchConfig, ShellConfig, SkillsConfig, StorageConfig, HARD_MAX_TIMEOUT_MS,
};
