//! Configuration management for the synarbor CLI

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, CliResult};

/// Global CLI configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default logging level
    pub log_level: Option<String>,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,
}

/// Output preferences
#[derive(Debug, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Show progress bars
    pub show_progress: bool,

    /// Default output format for `inspect` ("text" or "json")
    pub output_format: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            show_progress: true,
            output_format: "text".to_string(),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            preferences: UserPreferences::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| CliError::config(format!("Invalid config file: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::config("Could not determine config directory"))?;
        Ok(config_dir.join("synarbor").join("config.toml"))
    }

    /// Load from `explicit` if given, else from the default location
    pub fn resolve(explicit: Option<&Path>) -> CliResult<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_config_path() {
                Ok(path) => Self::load_from_file(&path),
                Err(_) => Ok(Self::default()),
            },
        }
    }
}
