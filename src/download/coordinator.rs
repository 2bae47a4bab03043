//! Album download orchestration
//!
//! One album runs in two pooled phases, both bounded by `max_threads`:
//! - Resolve: fetch every track's detail page and collect its format links
//! - Download: fetch the chosen file for each track, then tag it
//!
//! A failing track only ever fails itself; the album run always accounts for
//! every listed track.

use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use super::downloader::{DownloadOutcome, Downloader};
use super::summary::{AlbumSummary, TrackOutcome};
use super::task::{DownloadTask, TaskStatus};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use crate::scrape::album::parse_album_url;
use crate::scrape::{
    AlbumDescriptor, AudioFormat, HttpFetcher, PageFetcher, TrackDescriptor, http_client,
    parse_album, resolve_track,
};
use crate::tagging::{MetadataTagger, TagFields, TagOutcome};
use crate::utils::sanitize_filename;

/// Drives one album at a time from URL to files on disk
pub struct DownloadCoordinator {
    config: Config,
    fetcher: Arc<dyn PageFetcher>,
    downloader: Downloader,
    tagger: MetadataTagger,
    progress: Arc<dyn ProgressSink>,
}

impl DownloadCoordinator {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        downloader: Downloader,
        tagger: MetadataTagger,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            fetcher,
            downloader,
            tagger,
            progress,
        }
    }

    /// Wire up the HTTP fetcher, downloader and tagger from configuration
    pub fn from_config(config: Config, progress: Arc<dyn ProgressSink>) -> Result<Self> {
        let client = http_client()?;
        let retry = config.retry_policy();
        let fetcher = Arc::new(HttpFetcher::new(client.clone(), retry));
        let downloader = Downloader::new(client, retry);
        let tagger = MetadataTagger::new(config.tag_metadata);
        Ok(Self::new(config, fetcher, downloader, tagger, progress))
    }

    /// Download every track of the album at `album_url`
    ///
    /// Errors are album-level only (bad URL, page unreachable or not an
    /// album, output folder not creatable). Per-track failures end up in the
    /// returned summary.
    pub async fn download_album(&self, album_url: &str) -> Result<AlbumSummary> {
        let url = parse_album_url(album_url)?;

        info!("Fetching album: {}", url);
        let page = self.fetcher.fetch_html(&url).await?;
        let mut album = parse_album(&page, &url)?;
        info!("Album found: {} ({} tracks)", album.title, album.tracks.len());

        let album_dir = self
            .config
            .output_directory
            .join(sanitize_filename(&album.title));
        fs::create_dir_all(&album_dir)
            .await
            .map_err(|e| Error::io(&album_dir, e))?;

        let mut summary = AlbumSummary::new(
            &album.title,
            url.as_str(),
            album_dir.clone(),
            album.tracks.len(),
        );
        self.progress.album_started(&album.title, album.tracks.len());

        let resolve_failures = self.resolve_all(&mut album).await;
        let tasks = self.plan_tasks(&album, &album_dir, resolve_failures, &mut summary);

        info!(
            "Downloading {} tracks to {}",
            tasks.len(),
            album_dir.display()
        );

        let album_title = album.title.as_str();
        let mut finished = stream::iter(tasks)
            .map(|task| self.run_task(task, album_title))
            .buffer_unordered(self.config.max_threads.max(1));

        while let Some((task, outcome)) = finished.next().await {
            debug!(
                "Track {} ({}) {} after {} attempt(s)",
                task.track_index,
                task.chosen_format,
                task.status(),
                task.attempt_count
            );
            self.record(&mut summary, task.track_index, &task.track_title, outcome);
        }

        self.progress.album_finished();
        info!(
            "Album finished: {} ({} downloaded, {} already present, {} failed of {})",
            summary.title,
            summary.succeeded,
            summary.skipped,
            summary.failed_count(),
            summary.total_tracks
        );

        Ok(summary)
    }

    /// Resolve format links for every track across the worker pool
    ///
    /// Returns the tracks whose detail page could not be fetched.
    async fn resolve_all(&self, album: &mut AlbumDescriptor) -> HashMap<usize, Error> {
        let fetcher = self.fetcher.as_ref();
        let preference = self.config.format_preference.as_slice();
        let resolved: Vec<(usize, Result<BTreeMap<AudioFormat, url::Url>>)> =
            stream::iter(album.tracks.iter())
                .map(|track| async move {
                    (track.index, resolve_track(fetcher, track, preference).await)
                })
                .buffer_unordered(self.config.max_threads.max(1))
                .collect()
                .await;

        let mut failures = HashMap::new();
        for (index, result) in resolved {
            let Some(track) = album.tracks.iter_mut().find(|t| t.index == index) else {
                continue;
            };
            match result {
                Ok(links) => track.resolved_links = links,
                // A page without links simply offers no format
                Err(e @ Error::Parse { .. }) => {
                    warn!("Track {} ({}): {}", index, track.display_name, e);
                }
                Err(e) => {
                    warn!("Could not resolve track {} ({}): {}", index, track.display_name, e);
                    failures.insert(index, e);
                }
            }
        }
        failures
    }

    /// Choose a format and destination per track, in index order
    ///
    /// Tracks that cannot be downloaded are recorded as failed right away.
    fn plan_tasks(
        &self,
        album: &AlbumDescriptor,
        album_dir: &Path,
        mut resolve_failures: HashMap<usize, Error>,
        summary: &mut AlbumSummary,
    ) -> Vec<DownloadTask> {
        let width = number_width(album.tracks.len());
        let mut used_names = HashSet::new();
        let mut tasks = Vec::with_capacity(album.tracks.len());

        for track in &album.tracks {
            if let Some(error) = resolve_failures.remove(&track.index) {
                self.fail(summary, track, &error);
                continue;
            }

            let Some((format, file_url)) = track.choose_format(&self.config.format_preference)
            else {
                let error = Error::FormatUnavailable {
                    offered: track.offered_formats(),
                };
                self.fail(summary, track, &error);
                continue;
            };

            let file_name = self.file_name(track, format, width, &mut used_names);
            tasks.push(DownloadTask::new(
                track.index,
                track.display_name.clone(),
                format,
                file_url.clone(),
                album_dir.join(file_name),
            ));
        }

        tasks
    }

    /// File name for a track, unique within the album
    fn file_name(
        &self,
        track: &TrackDescriptor,
        format: AudioFormat,
        width: usize,
        used: &mut HashSet<String>,
    ) -> String {
        let title = sanitize_filename(&track.display_name);
        let stem = if self.config.include_track_number {
            format!("{:0width$} - {}", track.index, title, width = width)
        } else {
            title
        };

        let mut name = format!("{}.{}", stem, format);
        let mut clash = 0;
        while !used.insert(name.to_lowercase()) {
            clash += 1;
            name = match clash {
                1 => format!("{} ({}).{}", stem, track.index, format),
                n => format!("{} ({}-{}).{}", stem, track.index, n, format),
            };
        }
        name
    }

    /// Download and tag one task; runs inside the worker pool
    async fn run_task(
        &self,
        mut task: DownloadTask,
        album_title: &str,
    ) -> (DownloadTask, TrackOutcome) {
        advance(&mut task, TaskStatus::InProgress);

        let download = self
            .downloader
            .download(&task.file_url, &task.destination_path)
            .await;
        task.attempt_count = download.attempts();

        let outcome = match download {
            DownloadOutcome::Downloaded { bytes, .. } => {
                debug!("Track {} wrote {} bytes", task.track_index, bytes);
                let fields = TagFields {
                    album: album_title.to_string(),
                    track: u32::try_from(task.track_index).unwrap_or(u32::MAX),
                    title: task.track_title.clone(),
                };
                if let TagOutcome::Failed(reason) =
                    self.tagger.tag(task.destination_path.clone(), fields).await
                {
                    debug!("Keeping untagged file {}: {}", task.destination_path.display(), reason);
                }
                TrackOutcome::Downloaded
            }
            DownloadOutcome::AlreadyPresent => TrackOutcome::AlreadyPresent,
            DownloadOutcome::Failed { error, .. } => {
                warn!("Track {} ({}) failed: {}", task.track_index, task.track_title, error);
                TrackOutcome::Failed {
                    reason: error.reason(),
                }
            }
        };

        let next = match outcome {
            TrackOutcome::Failed { .. } => TaskStatus::Failed,
            _ => TaskStatus::Succeeded,
        };
        advance(&mut task, next);

        (task, outcome)
    }

    fn fail(&self, summary: &mut AlbumSummary, track: &TrackDescriptor, error: &Error) {
        warn!("Skipping track {} ({}): {}", track.index, track.display_name, error);
        self.record(
            summary,
            track.index,
            &track.display_name,
            TrackOutcome::Failed {
                reason: error.reason(),
            },
        );
    }

    fn record(&self, summary: &mut AlbumSummary, index: usize, name: &str, outcome: TrackOutcome) {
        self.progress.track_finished(index, name, &outcome);
        summary.record(index, name, outcome);
    }
}

fn advance(task: &mut DownloadTask, next: TaskStatus) {
    if let Err(e) = task.advance(next) {
        warn!("Track {}: {}", task.track_index, e);
    }
}

/// Digits used for track number prefixes: at least two
fn number_width(track_count: usize) -> usize {
    track_count.to_string().len().max(2)
}
