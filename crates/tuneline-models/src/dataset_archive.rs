//! Labeled dataset archive download and extraction.

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use tuneline_abstraction::ModelError;

use crate::map_http_error;

/// Where the lab dataset is published.
pub const DEFAULT_DATASET_URL: &str = "https://c3ntrala.ag3nts.org/dane/lab_data.zip";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Transport(#[from] ModelError),

    #[error("archive io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive entry escapes the extraction directory: {0}")]
    UnsafeEntry(String),
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io { path: path.to_path_buf(), source }
}

/// Streams `url` into `dest`, returning the number of bytes written.
///
/// # Errors
/// Fails on transport errors, non-2xx statuses, and local write errors.
pub async fn download_archive(client: &Client, url: &str, dest: &Path) -> Result<u64, ArchiveError> {
    debug!(url, dest = %dest.display(), "Downloading dataset archive");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ModelError::RequestError(format!("Failed to download {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        return Err(map_http_error("dataset", status, &error_text, "archive download").into());
    }

    let mut file = tokio::fs::File::create(dest).await.map_err(io_at(dest))?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk: Bytes =
            chunk.map_err(|e| ModelError::RequestError(format!("Download interrupted: {}", e)))?;
        file.write_all(&chunk).await.map_err(io_at(dest))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_at(dest))?;

    info!(bytes = written, dest = %dest.display(), "Dataset archive downloaded");
    Ok(written)
}

/// Extracts every file entry of the zip at `archive` into `dest_dir`.
///
/// Entries whose names would resolve outside `dest_dir` abort the extraction.
///
/// # Errors
/// Fails on unreadable archives, unsafe entry names, and local write errors.
pub fn extract_archive(archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let file = File::open(archive).map_err(io_at(archive))?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut extracted = Vec::new();

    for idx in 0..zip.len() {
        let mut entry = zip.by_index(idx)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(ArchiveError::UnsafeEntry(entry.name().to_string()));
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(io_at(&out_path))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_at(parent))?;
        }
        let mut out = File::create(&out_path).map_err(io_at(&out_path))?;
        io::copy(&mut entry, &mut out).map_err(io_at(&out_path))?;
        debug!(path = %out_path.display(), "Extracted archive entry");
        extracted.push(out_path);
    }

    info!(files = extracted.len(), dir = %dest_dir.display(), "Dataset archive extracted");
    Ok(extracted)
}

/// Downloads the archive into `data_dir`, extracts it there, then removes the archive.
///
/// The archive is removed even when extraction fails.
///
/// # Errors
/// Propagates download and extraction failures.
pub async fn fetch_dataset(client: &Client, url: &str, data_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    std::fs::create_dir_all(data_dir).map_err(io_at(data_dir))?;
    let archive_path = data_dir.join("lab_data.zip");

    let result = match download_archive(client, url, &archive_path).await {
        Ok(_) => extract_archive(&archive_path, data_dir),
        Err(e) => Err(e),
    };

    if archive_path.exists() {
        if let Err(e) = std::fs::remove_file(&archive_path) {
            warn!(path = %archive_path.display(), error = %e, "Failed to remove dataset archive");
        }
    }

    result
}
