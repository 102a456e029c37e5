#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for plaudit
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/plaudit/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod core;

pub use crate::core::{
    AuditConfig, GeneralConfig, NetworkConfig, PathConfig, DEFAULT_API_BASE, DEFAULT_RAW_BASE,
    DEFAULT_REGISTRY_URL,
};

use plaudit_errors::{ConfigError, Error};
use plaudit_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("plaudit").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Reject values no run could work with
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.general.parallel_fetches == 0 {
            return Err(ConfigError::InvalidValue {
                field: "general.parallel_fetches".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.audit.program.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "audit.program".to_string(),
                value: self.audit.program.clone(),
            }
            .into());
        }
        if self.audit.timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audit.timeout".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // PLAUDIT_OUTPUT
        if let Ok(output) = std::env::var("PLAUDIT_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "PLAUDIT_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // PLAUDIT_COLOR
        if let Ok(color) = std::env::var("PLAUDIT_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "PLAUDIT_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        // PLAUDIT_PARALLEL_FETCHES
        if let Ok(jobs) = std::env::var("PLAUDIT_PARALLEL_FETCHES") {
            self.general.parallel_fetches = match jobs.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "PLAUDIT_PARALLEL_FETCHES".to_string(),
                        value: jobs,
                    }
                    .into())
                }
            };
        }

        // PLAUDIT_GITHUB_TOKEN wins over the generic GITHUB_TOKEN
        if let Some(token) = non_empty_var("PLAUDIT_GITHUB_TOKEN").or_else(|| non_empty_var("GITHUB_TOKEN")) {
            self.network.github_token = Some(token);
        }

        if let Some(dir) = non_empty_var("PLAUDIT_CACHE_DIR") {
            self.paths.cache_dir = Some(PathBuf::from(dir));
        }

        if let Some(path) = non_empty_var("PLAUDIT_INSTALLED_PLUGINS") {
            self.paths.installed_plugins = Some(PathBuf::from(path));
        }

        if let Some(program) = non_empty_var("PLAUDIT_AUDIT_PROGRAM") {
            self.audit.program = program;
        }

        Ok(())
    }

    /// Get the cache directory (with default)
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.paths.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("plaudit")
        })
    }

    /// Get the installed-plugins list path (with default)
    #[must_use]
    pub fn installed_plugins_path(&self) -> PathBuf {
        self.paths
            .installed_plugins
            .clone()
            .unwrap_or_else(|| PathBuf::from(".obsidian").join("community-plugins.json"))
    }

    /// Directory for JSON debug logs
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.cache_dir().join("logs")
    }

    #[must_use]
    pub fn audit_timeout(&self) -> Duration {
        Duration::from_secs(self.audit.timeout)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
