//! Persistent CLI configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "cli-config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    /// Base URL of the inspection server API
    #[serde(default)]
    pub api_url: Option<String>,
    /// Local database file location
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| panic!("Failed to resolve CLI config directory"))
        .join("blemish")
        .join(CONFIG_FILE_NAME)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| panic!("Failed to resolve data directory"))
        .join("blemish")
        .join("blemish.db")
}

pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliConfig {
    /// Load the config file (when present) and apply `BLEMISH_*`
    /// environment overrides
    pub fn load() -> Result<Self, CliError> {
        let mut config = Self::load_from_path(&default_config_path())?;
        if let Some(api_url) = normalize_text_option(std::env::var("BLEMISH_API_URL").ok()) {
            config.api_url = Some(api_url);
        }
        if let Some(db_path) = normalize_text_option(std::env::var("BLEMISH_DB_PATH").ok()) {
            config.db_path = Some(PathBuf::from(db_path));
        }
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            CliError::Config(format!(
                "Failed to read config at {}: {}",
                path.display(),
                error
            ))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            CliError::Config(format!(
                "Failed to parse config at {}: {}",
                path.display(),
                error
            ))
        })?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// API base URL, required by `sync now` and `catalog refresh`
    pub fn require_api_url(&self) -> Result<&str, CliError> {
        self.api_url.as_deref().ok_or(CliError::ApiNotConfigured)
    }

    fn normalize(&mut self) {
        self.api_url = normalize_text_option(self.api_url.clone());
    }
}
