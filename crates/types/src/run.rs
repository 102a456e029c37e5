//! Run lifecycle phases

use serde::{Deserialize, Serialize};
use std::fmt;

/// States of one audit run, in the order they are visited.
///
/// `Failed` is reachable from any state on a structural error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    ResolvingInstalledList,
    BuildingManifest,
    AcquiringFiles,
    RunningAudits,
    Persisting,
    Done,
    Failed(String),
}

impl RunPhase {
    /// Whether no further transitions can happen
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::ResolvingInstalledList => f.write_str("resolving installed plugins"),
            Self::BuildingManifest => f.write_str("building manifest"),
            Self::AcquiringFiles => f.write_str("acquiring files"),
            Self::RunningAudits => f.write_str("running audits"),
            Self::Persisting => f.write_str("persisting results"),
            Self::Done => f.write_str("done"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
