#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for plaudit
//!
//! This crate provides the data model shared by every stage of an audit
//! run: plugin records, fetch-cache entries, per-plugin outcomes and the
//! summary derived from them.

pub mod audit;
pub mod cache;
pub mod plugin;
pub mod reports;
pub mod run;

pub use audit::{AuditOutcome, AuditSummary, OutcomeCategory, PluginAudit, Severity};
pub use cache::{FetchCacheEntry, RemoteProbe};
pub use plugin::{PluginRecord, RegistryEntry, RepoSlug};
pub use reports::AuditResults;
pub use run::RunPhase;

use serde::{Deserialize, Serialize};

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Tty,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Tty
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}

// Implement clap::ValueEnum for ColorChoice
impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}

impl Default for ColorChoice {
    fn default() -> Self {
        Self::Auto
    }
}
