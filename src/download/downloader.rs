//! Streaming file downloads with retry

use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use super::retry::{RetryPolicy, retry};
use crate::error::{Error, Result};

/// What happened to one file download
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The file was fetched and moved into place
    Downloaded { bytes: u64, attempts: u32 },
    /// A non-empty file was already at the destination; nothing was fetched
    AlreadyPresent,
    /// Every allowed attempt failed
    Failed { attempts: u32, error: Error },
}

impl DownloadOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            DownloadOutcome::Downloaded { attempts, .. } => *attempts,
            DownloadOutcome::AlreadyPresent => 0,
            DownloadOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Streams response bodies to disk
///
/// Bodies are written to `<destination>.part` and renamed into place only
/// once complete, so an interrupted download never leaves a truncated file
/// at the final path.
#[derive(Clone)]
pub struct Downloader {
    http_client: Client,
    retry: RetryPolicy,
}

impl Downloader {
    pub fn new(http_client: Client, retry: RetryPolicy) -> Self {
        Self { http_client, retry }
    }

    /// Download `url` to `destination`, skipping files that already exist
    pub async fn download(&self, url: &Url, destination: &Path) -> DownloadOutcome {
        if is_present(destination).await {
            info!("Already downloaded, skipping: {}", destination.display());
            return DownloadOutcome::AlreadyPresent;
        }

        let part = part_path(destination);
        let what = format!("download {}", url);
        let attempted = retry(&self.retry, &what, |attempt| {
            self.attempt(url, destination, &part, attempt)
        })
        .await;

        match attempted.result {
            Ok(bytes) => {
                info!("Downloaded {} ({} bytes)", destination.display(), bytes);
                DownloadOutcome::Downloaded {
                    bytes,
                    attempts: attempted.attempts,
                }
            }
            Err(error) => DownloadOutcome::Failed {
                attempts: attempted.attempts,
                error,
            },
        }
    }

    async fn attempt(&self, url: &Url, destination: &Path, part: &Path, attempt: u32) -> Result<u64> {
        debug!("Download attempt {} for {}", attempt, url);

        match self.stream_to(url, part).await {
            Ok(bytes) => match fs::rename(part, destination).await {
                Ok(()) => Ok(bytes),
                Err(e) => {
                    let _ = fs::remove_file(part).await;
                    Err(Error::io(destination, e))
                }
            },
            Err(e) => {
                let _ = fs::remove_file(part).await;
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &Url, part: &Path) -> Result<u64> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(url.as_str(), format!("HTTP {}", status)));
        }

        let expected = response.content_length();
        let mut file = fs::File::create(part)
            .await
            .map_err(|e| Error::io(part, e))?;

        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::fetch(url.as_str(), e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(part, e))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| Error::io(part, e))?;
        drop(file);

        if let Some(expected) = expected {
            if expected != written {
                return Err(Error::fetch(
                    url.as_str(),
                    format!("incomplete body: {} of {} bytes", written, expected),
                ));
            }
        }

        Ok(written)
    }
}

/// Temporary path used while a download is in flight
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn is_present(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
