//! Command line interface definition

use clap::{Parser, Subcommand};
use plaudit_types::{ColorChoice, Severity};
use std::path::PathBuf;

/// plaudit - dependency audits for installed Obsidian community plugins
#[derive(Parser)]
#[command(name = "plaudit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dependency audits for installed Obsidian community plugins")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Write JSON debug logs to <cache>/logs
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Cache directory holding fetched files and results
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch plugin manifests and audit their dependencies
    #[command(alias = "a")]
    Audit {
        /// Installed plugin list (community-plugins.json)
        #[arg(long, value_name = "PATH")]
        installed: Option<PathBuf>,

        /// Repository host token, overrides config and environment
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,

        /// Concurrent plugin fetches
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Exit with status 2 when any plugin reaches this severity
        #[arg(long, value_enum, value_name = "SEVERITY")]
        fail_on: Option<Severity>,
    },

    /// Show results of the last audit
    Report {
        /// Only list plugins at or above this severity
        #[arg(long, value_enum, value_name = "SEVERITY")]
        min_severity: Option<Severity>,
    },

    /// Print the raw audit log of the last run
    Log,
}

impl Commands {
    /// Severity that should fail the process, if any
    pub fn fail_threshold(&self) -> Option<Severity> {
        match self {
            Self::Audit { fail_on, .. } => *fail_on,
            Self::Report { .. } | Self::Log => None,
        }
    }
}
