#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! On-disk cache for plaudit
//!
//! This crate owns the cache directory: the per-plugin working directories
//! under `packages/<id>/`, the conditional fetch metadata, and the
//! documents each run replaces wholesale (installed manifest, results,
//! audit log). Every document write goes through [`write_atomic`].

mod documents;
mod fetch_cache;

pub use documents::{
    read_installed_list, read_manifest, read_registry_snapshot, read_results, write_log,
    write_manifest, write_results,
};
pub use fetch_cache::{FetchCache, FetchStatus};

use plaudit_errors::{Error, StorageError};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const INSTALLED_MANIFEST_FILE: &str = "installed-manifest.json";
pub const CACHE_METADATA_FILE: &str = "cache-metadata.json";
pub const AUDIT_LOG_FILE: &str = "audit.log";
pub const RESULTS_FILE: &str = "results.json";
pub const REGISTRY_FILE: &str = "community-plugins.json";
pub const PACKAGES_DIR: &str = "packages";
pub const MANIFEST_FILE: &str = "package.json";
pub const LOCKFILE_FILE: &str = "package-lock.json";

/// Paths of the persisted cache directory
#[derive(Clone, Debug)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the cache root and the packages directory
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directories cannot be created.
    pub async fn ensure(&self) -> Result<(), Error> {
        let packages = self.root.join(PACKAGES_DIR);
        fs::create_dir_all(&packages)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &packages))?;
        Ok(())
    }

    #[must_use]
    pub fn installed_manifest(&self) -> PathBuf {
        self.root.join(INSTALLED_MANIFEST_FILE)
    }

    #[must_use]
    pub fn cache_metadata(&self) -> PathBuf {
        self.root.join(CACHE_METADATA_FILE)
    }

    #[must_use]
    pub fn audit_log(&self) -> PathBuf {
        self.root.join(AUDIT_LOG_FILE)
    }

    #[must_use]
    pub fn results(&self) -> PathBuf {
        self.root.join(RESULTS_FILE)
    }

    #[must_use]
    pub fn registry_snapshot(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Working directory for one plugin
    #[must_use]
    pub fn package_dir(&self, id: &str) -> PathBuf {
        self.root.join(PACKAGES_DIR).join(id)
    }

    /// Logical cache key of a file inside a plugin's working directory
    #[must_use]
    pub fn package_key(id: &str, file: &str) -> String {
        format!("{PACKAGES_DIR}/{id}/{file}")
    }
}

/// Write bytes to `path` through a temporary sibling and a rename
///
/// Readers never observe a half-written document.
///
/// # Errors
///
/// Returns a storage error if the temporary file cannot be written or renamed.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, parent))?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::internal(format!("invalid document path {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    fs::write(&tmp_path, contents)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, &tmp_path))?;

    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(StorageError::RenameFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into());
    }

    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically
///
/// # Errors
///
/// Returns an error if serialization or the atomic write fails.
pub async fn write_json_atomic<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), Error> {
    let mut payload = serde_json::to_vec_pretty(value)?;
    payload.push(b'\n');
    write_atomic(path, &payload).await
}

/// Read and parse a JSON document, treating a missing file as `None`
///
/// # Errors
///
/// Returns `StorageError::CorruptedDocument` when the file exists but does not parse.
pub async fn read_json_opt<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, Error> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::from_io_with_path(&e, path).into()),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| {
            StorageError::CorruptedDocument {
                path: path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
}
