//! Community registry snapshot and installed-manifest construction

use plaudit_errors::Error;
use plaudit_events::EventEmitter;
use plaudit_net::NetClient;
use plaudit_store::{read_registry_snapshot, CacheLayout, FetchCache, REGISTRY_FILE};
use plaudit_types::{PluginRecord, RegistryEntry};
use std::collections::HashMap;

/// Conditionally refresh the registry snapshot and load it
///
/// A failed refresh falls back to the cached snapshot with a warning.
/// `None` means no snapshot is available at all.
///
/// # Errors
///
/// Returns storage errors from persisting the fetch cache entry.
pub async fn load_registry(
    client: &NetClient,
    cache: &FetchCache,
    layout: &CacheLayout,
    url: &str,
    tx: &impl EventEmitter,
) -> Result<Option<Vec<RegistryEntry>>, Error> {
    let dest = layout.registry_snapshot();
    match cache.fetch(client, REGISTRY_FILE, url, &dest, false, tx).await {
        Ok(status) if !status.is_available() => {
            tx.emit_warning_with_context("registry snapshot not found", url.to_string());
        }
        Ok(_) => {}
        Err(e @ Error::Storage(_)) => return Err(e),
        Err(e) => {
            tx.emit_warning_with_context(
                "registry refresh failed, using cached snapshot",
                e.to_string(),
            );
        }
    }

    match read_registry_snapshot(layout).await {
        Ok(snapshot) => Ok(snapshot),
        Err(e) => {
            tx.emit_warning_with_context("cached registry snapshot unusable", e.to_string());
            Ok(None)
        }
    }
}

/// Merge the installed ids with the registry and the previous manifest
///
/// Registry fields win for descriptive data and `repo`; branch and push
/// watermark carry over from the previous record of the same repository.
/// Ids known to neither source become records without a repository.
#[must_use]
pub fn build_records(
    installed: &[String],
    registry: Option<&[RegistryEntry]>,
    prior: &[PluginRecord],
) -> Vec<PluginRecord> {
    let registry: HashMap<&str, &RegistryEntry> = registry
        .unwrap_or_default()
        .iter()
        .map(|entry| (entry.id.as_str(), entry))
        .collect();
    let prior: HashMap<&str, &PluginRecord> =
        prior.iter().map(|record| (record.id.as_str(), record)).collect();

    installed
        .iter()
        .map(|id| {
            let previous = prior.get(id.as_str()).copied();
            match (registry.get(id.as_str()), previous) {
                (Some(entry), _) => PluginRecord::from_registry(entry, previous),
                (None, Some(record)) => {
                    let mut record = record.clone();
                    record.refresh_support_link();
                    record
                }
                (None, None) => PluginRecord::unknown(id.clone()),
            }
        })
        .collect()
}
