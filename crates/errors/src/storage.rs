//! Failures writing or reading the plaudit cache directory
//!
//! Any of these during a run is structural: the orchestrator stops instead
//! of recording a per-plugin outcome.

use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::Path;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum StorageError {
    #[error("no space left on device for {path}")]
    DiskFull { path: String },

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    /// A plain file sits where the cache layout expects a directory
    #[error("{path} is not a directory")]
    NotADirectory { path: String },

    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("cannot write {path}: {message}")]
    WriteFailed { path: String, message: String },

    /// A cache document exists but is not the JSON we wrote
    #[error("unreadable cache document {path}: {message}")]
    CorruptedDocument { path: String, message: String },

    #[error("cannot move {path} into place: {message}")]
    RenameFailed { path: String, message: String },
}

impl StorageError {
    /// Classify a filesystem failure on `path`
    ///
    /// `AlreadyExists` only arises from directory creation in the cache
    /// layout, so it is reported as a file blocking that directory.
    #[must_use]
    pub fn from_io_with_path(err: &std::io::Error, path: &Path) -> Self {
        let path_str = path.display().to_string();
        match err.kind() {
            ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => {
                Self::PermissionDenied { path: path_str }
            }
            ErrorKind::NotFound => Self::PathNotFound { path: path_str },
            ErrorKind::StorageFull => Self::DiskFull { path: path_str },
            ErrorKind::AlreadyExists | ErrorKind::NotADirectory => {
                Self::NotADirectory { path: path_str }
            }
            _ => Self::WriteFailed {
                path: path_str,
                message: err.to_string(),
            },
        }
    }
}

impl UserFacingError for StorageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DiskFull { .. } => Some("Free up disk space in the cache directory and retry."),
            Self::PermissionDenied { .. } => {
                Some("Adjust permissions on the cache directory or choose another with --cache-dir.")
            }
            Self::NotADirectory { .. } => {
                Some("Remove the stray file from the cache directory; plaudit recreates it.")
            }
            Self::CorruptedDocument { .. } => {
                Some("Delete the damaged file; it is rebuilt on the next run.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::WriteFailed { .. } | Self::RenameFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DiskFull { .. } => "storage.disk_full",
            Self::PermissionDenied { .. } => "storage.permission_denied",
            Self::NotADirectory { .. } => "storage.not_a_directory",
            Self::PathNotFound { .. } => "storage.path_not_found",
            Self::WriteFailed { .. } => "storage.write_failed",
            Self::CorruptedDocument { .. } => "storage.corrupted_document",
            Self::RenameFailed { .. } => "storage.rename_failed",
        };
        Some(code)
    }
}
