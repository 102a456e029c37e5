#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for plaudit
//!
//! Header-only freshness checks and atomic file downloads, both going
//! through the retrying [`NetClient`].

mod client;

pub use client::{NetClient, NetConfig};

use futures::StreamExt;
use plaudit_errors::{Error, NetworkError, StorageError};
use plaudit_events::EventEmitter;
use plaudit_types::RemoteProbe;
use reqwest::header::{CONTENT_LENGTH, LAST_MODIFIED};
use reqwest::{Response, StatusCode};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

fn is_absent(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}

fn check_status(response: &Response, url: &str) -> Result<(), Error> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else if is_absent(status) {
        Err(NetworkError::NotFound {
            url: url.to_string(),
        }
        .into())
    } else {
        Err(NetworkError::HttpError {
            status: status.as_u16(),
            message: status.to_string(),
        }
        .into())
    }
}

/// Header-only existence and freshness check
///
/// A 404 or 410 answer is reported as `exists: false`, not as an error.
///
/// # Errors
///
/// Returns an error on transport failures or any other non-success status.
pub async fn probe(
    client: &NetClient,
    url: &str,
    tx: &impl EventEmitter,
) -> Result<RemoteProbe, Error> {
    tx.emit_debug(format!("Probing {url}"));

    let response = client.head(url).await?;
    if is_absent(response.status()) {
        return Ok(RemoteProbe::missing());
    }
    check_status(&response, url)?;

    let headers = response.headers();
    let last_modified = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let size = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());

    Ok(RemoteProbe {
        exists: true,
        last_modified,
        size,
    })
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Download a URL to `dest`, returning the number of bytes written
///
/// The body is streamed into `<dest>.part` and only renamed onto `dest`
/// once complete, so an interrupted transfer never leaves a file that
/// looks finished. The `.part` file is removed on every failure.
///
/// # Errors
///
/// Returns `NetworkError::NotFound` for 404/410, other network errors for
/// failed requests or truncated bodies, and `StorageError` for local writes.
pub async fn download_to(
    client: &NetClient,
    url: &str,
    dest: &Path,
    tx: &impl EventEmitter,
) -> Result<u64, Error> {
    tx.emit_debug(format!("Downloading {url} to {}", dest.display()));

    let response = client.get(url).await?;
    check_status(&response, url)?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, parent))?;
    }

    let part = partial_path(dest);
    let written = match stream_body(response, &part).await {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&part, dest).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(StorageError::RenameFailed {
            path: dest.display().to_string(),
            message: e.to_string(),
        }
        .into());
    }

    Ok(written)
}

async fn stream_body(response: Response, part: &Path) -> Result<u64, Error> {
    let write_err = |e: std::io::Error| StorageError::from_io_with_path(&e, part);

    let mut file = tokio::fs::File::create(part).await.map_err(write_err)?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| NetworkError::DownloadFailed(e.to_string()))?;
        file.write_all(&chunk).await.map_err(write_err)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(write_err)?;
    file.sync_all().await.map_err(write_err)?;

    Ok(written)
}

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed.
pub fn parse_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()).into())
}

/// Join path segments onto a base URL, keeping any base path prefix
///
/// # Errors
///
/// Returns an error if the base is not a valid absolute URL.
pub fn join_segments(base: &str, segments: &[&str]) -> Result<String, Error> {
    let mut url = parse_url(base)?;
    url.path_segments_mut()
        .map_err(|()| NetworkError::InvalidUrl(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}
