//! Configuration persistence for the drill app.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::SchedulerSettings;
use crate::session::SessionSettings;
use crate::store::SqliteStore;

/// Application configuration that persists between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Progress database file. Defaults to the local data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// JSON file replacing the bundled collections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections_path: Option<PathBuf>,

    /// Mistakes allowed per run; unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lives: Option<u32>,

    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("streakdrill")
            .join("config.toml")
    }

    /// Load config from the default path, returning default if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config file")?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path))?;

        Ok(config)
    }

    /// Reject values the scheduler cannot use.
    pub fn validate(&self) -> Result<()> {
        let bias = self.scheduler.retry_bias;
        if !bias.is_finite() || !(0.0..=1.0).contains(&bias) {
            bail!("scheduler.retry_bias must be between 0 and 1, got {}", bias);
        }
        Ok(())
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(SqliteStore::default_path)
    }

    pub fn session_settings(&self, seed: Option<u64>) -> SessionSettings {
        SessionSettings {
            max_lives: self.max_lives,
            scheduler: self.scheduler,
            seed,
        }
    }
}
