//! Configuration sections shared across crates

use plaudit_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default community plugin registry listing
pub const DEFAULT_REGISTRY_URL: &str =
    "https://raw.githubusercontent.com/obsidianmd/obsidian-releases/master/community-plugins.json";

/// Default repository host API
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default raw file host
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
    /// Bound on concurrent repository lookups and downloads
    #[serde(default = "default_parallel_fetches")]
    pub parallel_fetches: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
            parallel_fetches: default_parallel_fetches(),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    #[serde(default = "default_registry_url")]
    pub registry_url: String,
    /// Optional credential for the repository host API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            registry_url: default_registry_url(),
            github_token: None,
        }
    }
}

/// External audit tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_program")]
    pub program: String,
    #[serde(default = "default_audit_args")]
    pub audit_args: Vec<String>,
    #[serde(default = "default_lockfile_args")]
    pub lockfile_args: Vec<String>,
    #[serde(default = "default_audit_timeout")]
    pub timeout: u64, // seconds, per invocation
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            program: default_audit_program(),
            audit_args: default_audit_args(),
            lockfile_args: default_lockfile_args(),
            timeout: default_audit_timeout(),
        }
    }
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub cache_dir: Option<PathBuf>,
    pub installed_plugins: Option<PathBuf>,
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_parallel_fetches() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_raw_base() -> String {
    DEFAULT_RAW_BASE.to_string()
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_audit_program() -> String {
    "npm".to_string()
}

fn default_audit_args() -> Vec<String> {
    vec!["audit".to_string(), "--json".to_string()]
}

fn default_lockfile_args() -> Vec<String> {
    [
        "install",
        "--package-lock-only",
        "--ignore-scripts",
        "--no-audit",
        "--no-fund",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_audit_timeout() -> u64 {
    120
}
