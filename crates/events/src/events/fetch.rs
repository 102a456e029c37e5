use serde::{Deserialize, Serialize};

/// Conditional fetch events, keyed by logical cache path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FetchEvent {
    /// Header-only freshness probe finished
    Probed {
        path: String,
        url: String,
        exists: bool,
        last_modified: Option<String>,
    },

    /// Cached copy is fresh; no download needed
    CacheHit { path: String },

    /// Resource downloaded and written to disk
    Downloaded { path: String, url: String, bytes: u64 },

    /// Remote reported the resource as absent
    Missing { path: String, url: String },

    /// Probe or download failed
    Failed {
        path: String,
        url: String,
        failure: super::FailureContext,
    },
}
