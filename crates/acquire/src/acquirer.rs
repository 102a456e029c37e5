//! Per-plugin manifest and lockfile acquisition

use plaudit_audit::AuditTool;
use plaudit_errors::{Error, StorageError};
use plaudit_events::{AppEvent, AuditEvent, EventEmitter, FailureContext};
use plaudit_net::NetClient;
use plaudit_store::{CacheLayout, FetchCache, FetchStatus, LOCKFILE_FILE, MANIFEST_FILE};
use plaudit_types::RepoSlug;
use std::path::PathBuf;
use std::sync::Arc;

/// What acquisition left in the working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireStatus {
    /// `package.json` is present and current
    pub primary_ok: bool,
    /// `package-lock.json` was fetched from the repository
    pub lockfile_ok: bool,
    /// A lockfile was generated locally instead
    pub lockfile_synthesized: bool,
}

/// Fetches `package.json` and `package-lock.json` into `packages/<id>/`
#[derive(Clone)]
pub struct ManifestAcquirer {
    client: NetClient,
    cache: Arc<FetchCache>,
    layout: CacheLayout,
    raw_base: String,
    synthesizer: Option<Arc<dyn AuditTool>>,
}

impl ManifestAcquirer {
    #[must_use]
    pub fn new(
        client: NetClient,
        cache: Arc<FetchCache>,
        layout: CacheLayout,
        raw_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            cache,
            layout,
            raw_base: raw_base.into(),
            synthesizer: None,
        }
    }

    /// Tool used to generate a lockfile when the repository has none
    #[must_use]
    pub fn with_synthesizer(mut self, tool: Arc<dyn AuditTool>) -> Self {
        self.synthesizer = Some(tool);
        self
    }

    /// Working directory of `id`
    ///
    /// # Errors
    ///
    /// Returns an error if `id` cannot be used as a directory name.
    pub fn working_dir(&self, id: &str) -> Result<PathBuf, Error> {
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(Error::internal(format!(
                "plugin id '{id}' is not a valid directory name"
            )));
        }
        Ok(self.layout.package_dir(id))
    }

    fn raw_url(&self, slug: &RepoSlug, branch: &str, file: &str) -> Result<String, Error> {
        let mut segments = vec![slug.owner(), slug.name()];
        segments.extend(branch.split('/').filter(|s| !s.is_empty()));
        segments.push(file);
        plaudit_net::join_segments(&self.raw_base, &segments)
    }

    /// Acquire the manifest and lockfile of one plugin on `branch`
    ///
    /// With `changed` unset, fresh local copies are reused after a header
    /// probe. A missing `package.json` leaves `primary_ok` false; a missing
    /// lockfile is tolerated and triggers local synthesis when a synthesizer
    /// is configured.
    ///
    /// # Errors
    ///
    /// Returns network errors for the manifest, and storage errors. Lockfile
    /// transport failures are reported as warnings only.
    pub async fn acquire(
        &self,
        id: &str,
        slug: &RepoSlug,
        branch: &str,
        changed: bool,
        tx: &impl EventEmitter,
    ) -> Result<AcquireStatus, Error> {
        let dir = self.working_dir(id)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &dir))?;

        let manifest_key = CacheLayout::package_key(id, MANIFEST_FILE);
        let manifest = self
            .cache
            .fetch(
                &self.client,
                &manifest_key,
                &self.raw_url(slug, branch, MANIFEST_FILE)?,
                &dir.join(MANIFEST_FILE),
                changed,
                tx,
            )
            .await?;

        if !manifest.is_available() {
            let _ = tokio::fs::remove_file(dir.join(MANIFEST_FILE)).await;
            return Ok(AcquireStatus {
                primary_ok: false,
                lockfile_ok: false,
                lockfile_synthesized: false,
            });
        }

        let lock_key = CacheLayout::package_key(id, LOCKFILE_FILE);
        let lock_path = dir.join(LOCKFILE_FILE);
        let previous_lock = self.cache.get(&lock_key).await;
        let lockfile = match self
            .cache
            .fetch(
                &self.client,
                &lock_key,
                &self.raw_url(slug, branch, LOCKFILE_FILE)?,
                &lock_path,
                changed,
                tx,
            )
            .await
        {
            Ok(status) => status,
            Err(e @ Error::Storage(_)) => return Err(e),
            Err(e) => {
                tx.emit_warning_with_context(format!("{id}: lockfile fetch failed"), e.to_string());
                FetchStatus::Absent
            }
        };

        if lockfile.is_available() {
            return Ok(AcquireStatus {
                primary_ok: true,
                lockfile_ok: true,
                lockfile_synthesized: false,
            });
        }

        // A lockfile synthesized by the previous run stays valid while the
        // manifest it was generated from is unchanged.
        let reuse_synthesized = !changed
            && manifest == FetchStatus::Reused
            && previous_lock.is_some_and(|entry| !entry.downloaded)
            && tokio::fs::try_exists(&lock_path).await.unwrap_or(false);
        if reuse_synthesized {
            return Ok(AcquireStatus {
                primary_ok: true,
                lockfile_ok: false,
                lockfile_synthesized: true,
            });
        }

        let _ = tokio::fs::remove_file(&lock_path).await;
        let synthesized = self.synthesize(id, &dir, tx).await;
        Ok(AcquireStatus {
            primary_ok: true,
            lockfile_ok: false,
            lockfile_synthesized: synthesized,
        })
    }

    async fn synthesize(&self, id: &str, dir: &std::path::Path, tx: &impl EventEmitter) -> bool {
        let Some(tool) = &self.synthesizer else {
            return false;
        };

        match tool.synthesize_lockfile(dir).await {
            Ok(()) => {
                tx.emit_for_plugin(
                    id,
                    AppEvent::Audit(AuditEvent::LockfileSynthesized {
                        plugin: id.to_string(),
                    }),
                );
                true
            }
            Err(e) => {
                tx.emit_for_plugin(
                    id,
                    AppEvent::Audit(AuditEvent::LockfileSynthesisFailed {
                        plugin: id.to_string(),
                        failure: FailureContext::from_error(&e),
                    }),
                );
                false
            }
        }
    }
}
