//! Conditional fetch cache records

use serde::{Deserialize, Serialize};

/// Last-known freshness metadata for one logical resource path.
///
/// A `last_modified` value means the resource was confirmed to exist at least
/// once; `downloaded == false` records a confirmed absence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchCacheEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default = "default_downloaded")]
    pub downloaded: bool,
}

fn default_downloaded() -> bool {
    true
}

impl FetchCacheEntry {
    /// Entry for a resource that was fetched in full
    #[must_use]
    pub fn fetched(last_modified: Option<String>, size: Option<u64>) -> Self {
        Self {
            last_modified,
            size,
            downloaded: true,
        }
    }

    /// Entry for a resource the remote reported as absent
    #[must_use]
    pub fn absent() -> Self {
        Self {
            last_modified: None,
            size: None,
            downloaded: false,
        }
    }
}

/// Result of a header-only freshness probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteProbe {
    pub exists: bool,
    pub last_modified: Option<String>,
    pub size: Option<u64>,
}

impl RemoteProbe {
    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }
}
