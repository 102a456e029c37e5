//! Conditional fetch cache
//!
//! Maps logical resource paths (`community-plugins.json`,
//! `packages/<id>/package.json`, ...) to the last freshness metadata seen
//! for them. Every mutation is written through to `cache-metadata.json`
//! while the lock is held, so concurrent acquisitions never interleave
//! writes to the shared document.

use crate::{read_json_opt, write_json_atomic};
use plaudit_errors::{Error, NetworkError};
use plaudit_events::{AppEvent, EventEmitter, FailureContext, FetchEvent};
use plaudit_net::NetClient;
use plaudit_types::{FetchCacheEntry, RemoteProbe};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// What a conditional fetch did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Local copy is fresh and was kept
    Reused,
    /// Remote copy was downloaded
    Downloaded { bytes: u64 },
    /// Remote reported the resource as absent
    Absent,
}

impl FetchStatus {
    /// Whether a usable local file exists after the fetch
    #[must_use]
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Freshness metadata for every logical path, persisted as one JSON map
#[derive(Debug)]
pub struct FetchCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, FetchCacheEntry>>,
}

impl FetchCache {
    /// Load `cache-metadata.json`; a missing file yields an empty cache
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: PathBuf) -> Result<Self, Error> {
        let entries = read_json_opt(&path).await?.unwrap_or_default();
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// An empty cache that persists to `path`
    #[must_use]
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<FetchCacheEntry> {
        self.entries.lock().await.get(key).cloned()
    }


    /// True unless an entry exists whose `last_modified` equals the probed value
    pub async fn should_fetch(&self, key: &str, remote_last_modified: Option<&str>) -> bool {
        let entries = self.entries.lock().await;
        match (entries.get(key), remote_last_modified) {
            (Some(entry), Some(remote)) => {
                !(entry.downloaded && entry.last_modified.as_deref() == Some(remote))
            }
            _ => true,
        }
    }

    /// A previous download of `key` is recorded and still on disk
    async fn has_local_copy(&self, key: &str, dest: &Path) -> bool {
        let downloaded = self.get(key).await.is_some_and(|entry| entry.downloaded);
        downloaded && tokio::fs::try_exists(dest).await.unwrap_or(false)
    }

    /// Record a completed download and persist the cache
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata document cannot be written.
    pub async fn record_fetch(
        &self,
        key: &str,
        last_modified: Option<String>,
        size: Option<u64>,
    ) -> Result<(), Error> {
        self.update(key, FetchCacheEntry::fetched(last_modified, size))
            .await
    }

    /// Record that the remote reported the resource as absent and persist
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata document cannot be written.
    pub async fn record_absent(&self, key: &str) -> Result<(), Error> {
        self.update(key, FetchCacheEntry::absent()).await
    }

    async fn update(&self, key: &str, entry: FetchCacheEntry) -> Result<(), Error> {
        let mut entries = self.entries.lock().await;
        if entries.get(key) == Some(&entry) {
            return Ok(());
        }
        entries.insert(key.to_string(), entry);
        write_json_atomic(&self.path, &*entries).await
    }

    /// Header-only existence and freshness probe
    ///
    /// # Errors
    ///
    /// Returns network errors other than an absent resource.
    pub async fn check_remote(
        &self,
        client: &NetClient,
        url: &str,
        tx: &impl EventEmitter,
    ) -> Result<RemoteProbe, Error> {
        plaudit_net::probe(client, url, tx).await
    }

    /// Probe `url` and download it to `dest` unless the local copy is fresh
    ///
    /// With `force` set the download happens whenever the resource exists.
    /// An absent resource is recorded as such and is not an error. Without
    /// `force`, a failed header check falls back to a previously downloaded
    /// copy when one is on disk.
    ///
    /// # Errors
    ///
    /// Returns network errors from the probe or download, and storage errors
    /// from persisting the cache entry.
    pub async fn fetch(
        &self,
        client: &NetClient,
        key: &str,
        url: &str,
        dest: &Path,
        force: bool,
        tx: &impl EventEmitter,
    ) -> Result<FetchStatus, Error> {
        let result = self.fetch_inner(client, key, url, dest, force, tx).await;
        if let Err(e) = &result {
            tx.emit(AppEvent::Fetch(FetchEvent::Failed {
                path: key.to_string(),
                url: url.to_string(),
                failure: FailureContext::from_error(e),
            }));
        }
        result
    }

    async fn fetch_inner(
        &self,
        client: &NetClient,
        key: &str,
        url: &str,
        dest: &Path,
        force: bool,
        tx: &impl EventEmitter,
    ) -> Result<FetchStatus, Error> {
        let probe = match self.check_remote(client, url, tx).await {
            Ok(probe) => probe,
            Err(e @ Error::Network(_)) if !force => {
                if !self.has_local_copy(key, dest).await {
                    return Err(e);
                }
                // Unchanged repository keeps its last good copy
                tx.emit_warning_with_context(
                    format!("{key}: freshness check failed, keeping cached copy"),
                    e.to_string(),
                );
                tx.emit(AppEvent::Fetch(FetchEvent::CacheHit {
                    path: key.to_string(),
                }));
                return Ok(FetchStatus::Reused);
            }
            Err(e) => return Err(e),
        };
        tx.emit(AppEvent::Fetch(FetchEvent::Probed {
            path: key.to_string(),
            url: url.to_string(),
            exists: probe.exists,
            last_modified: probe.last_modified.clone(),
        }));

        if !probe.exists {
            return self.mark_absent(key, url, tx).await;
        }

        let stale = self.should_fetch(key, probe.last_modified.as_deref()).await;
        if !force && !stale && tokio::fs::try_exists(dest).await.unwrap_or(false) {
            tx.emit(AppEvent::Fetch(FetchEvent::CacheHit {
                path: key.to_string(),
            }));
            return Ok(FetchStatus::Reused);
        }

        let bytes = match plaudit_net::download_to(client, url, dest, tx).await {
            Ok(bytes) => bytes,
            // Deleted between the probe and the download
            Err(Error::Network(NetworkError::NotFound { .. })) => {
                return self.mark_absent(key, url, tx).await;
            }
            Err(e) => return Err(e),
        };

        self.record_fetch(key, probe.last_modified, Some(bytes))
            .await?;
        tx.emit(AppEvent::Fetch(FetchEvent::Downloaded {
            path: key.to_string(),
            url: url.to_string(),
            bytes,
        }));
        Ok(FetchStatus::Downloaded { bytes })
    }

    async fn mark_absent(
        &self,
        key: &str,
        url: &str,
        tx: &impl EventEmitter,
    ) -> Result<FetchStatus, Error> {
        self.record_absent(key).await?;
        tx.emit(AppEvent::Fetch(FetchEvent::Missing {
            path: key.to_string(),
            url: url.to_string(),
        }));
        Ok(FetchStatus::Absent)
    }
}
