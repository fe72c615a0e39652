//! Backend settings
//!
//! Loaded from an optional TOML file, then overridden by `TIMELENS_*`
//! environment variables. Nested keys use a double underscore, e.g.
//! `TIMELENS_HISTORY__CACHE_EVERY=20`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use timelens_bridge::batch::DEFAULT_BATCH_SIZE;
use timelens_common::{LogLevel, Validatable, ValidationError};
use timelens_history::HistoryConfig;
use tracing::debug;

use crate::error::Result;

/// Default environment prefix
pub const ENV_PREFIX: &str = "TIMELENS";

/// Settings for one backend instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Log verbosity
    pub log_level: LogLevel,
    /// Outgoing messages buffered before the bridge flushes
    pub batch_size: usize,
    /// History engine configuration
    pub history: HistoryConfig,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            history: HistoryConfig::default(),
        }
    }
}

impl Validatable for BackendSettings {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut errors = Vec::new();
        if let Err(e) = self.history.validate() {
            errors.push(e);
        }
        if self.batch_size == 0 {
            errors.push(ValidationError::out_of_range(
                "batch_size",
                "at least 1",
                self.batch_size,
            ));
        }
        ValidationError::from_list(errors)
    }
}

/// Reads and writes [`BackendSettings`]
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    path: PathBuf,
    env_prefix: String,
}

impl SettingsLoader {
    /// Loader for the default settings file
    pub fn new() -> Self {
        Self::with_path(Self::default_path())
    }

    /// Loader for a specific settings file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("timelens")
            .join("settings.toml")
    }

    /// Load settings; a missing file falls back to defaults
    pub fn load(&self) -> Result<BackendSettings> {
        let config = Config::builder()
            .add_source(File::from(self.path.clone()).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: BackendSettings = config.try_deserialize()?;
        settings.validate()?;
        debug!(path = %self.path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Write settings as TOML, creating the parent directory if needed
    pub fn save(&self, settings: &BackendSettings) -> Result<()> {
        settings.validate()?;
        let text = toml::to_string_pretty(settings)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}
