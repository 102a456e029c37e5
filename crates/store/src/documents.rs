//! Documents replaced wholesale on every run

use crate::{read_json_opt, write_atomic, write_json_atomic, CacheLayout};
use plaudit_errors::{Error, OpsError};
use plaudit_types::{AuditResults, PluginRecord, RegistryEntry};
use std::collections::HashSet;
use std::path::Path;

/// Read the installed-plugin list (a JSON array of ids)
///
/// Duplicate ids are collapsed, keeping the first occurrence.
///
/// # Errors
///
/// Returns `OpsError::InstalledListUnreadable` if the file is missing,
/// unreadable, or not an array of strings.
pub async fn read_installed_list(path: &Path) -> Result<Vec<String>, Error> {
    let unreadable = |message: String| OpsError::InstalledListUnreadable {
        path: path.display().to_string(),
        message,
    };

    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| unreadable(e.to_string()))?;
    let ids: Vec<String> =
        serde_json::from_str(&contents).map_err(|e| unreadable(e.to_string()))?;

    let mut seen = HashSet::new();
    Ok(ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect())
}

/// Read the previous run's installed manifest, if any
///
/// # Errors
///
/// Returns an error if the file exists but is corrupted.
pub async fn read_manifest(layout: &CacheLayout) -> Result<Vec<PluginRecord>, Error> {
    Ok(read_json_opt(&layout.installed_manifest())
        .await?
        .unwrap_or_default())
}

/// Replace the installed manifest
///
/// # Errors
///
/// Returns an error if serialization or the atomic write fails.
pub async fn write_manifest(layout: &CacheLayout, records: &[PluginRecord]) -> Result<(), Error> {
    write_json_atomic(&layout.installed_manifest(), records).await
}

/// Read the cached registry snapshot, if any
///
/// # Errors
///
/// Returns an error if the snapshot exists but is corrupted.
pub async fn read_registry_snapshot(
    layout: &CacheLayout,
) -> Result<Option<Vec<RegistryEntry>>, Error> {
    read_json_opt(&layout.registry_snapshot()).await
}

/// Read the last persisted results
///
/// # Errors
///
/// Returns an error if the file exists but is corrupted.
pub async fn read_results(layout: &CacheLayout) -> Result<Option<AuditResults>, Error> {
    read_json_opt(&layout.results()).await
}

/// Replace the persisted results
///
/// # Errors
///
/// Returns an error if serialization or the atomic write fails.
pub async fn write_results(layout: &CacheLayout, results: &AuditResults) -> Result<(), Error> {
    write_json_atomic(&layout.results(), results).await
}

/// Replace the audit log text
///
/// # Errors
///
/// Returns an error if the atomic write fails.
pub async fn write_log(layout: &CacheLayout, text: &str) -> Result<(), Error> {
    write_atomic(&layout.audit_log(), text.as_bytes()).await
}
