//! Outcome aggregation for album runs
//!
//! Tasks finish in any order, so everything here is keyed by track index or
//! counted, never positional.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Terminal outcome of one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Downloaded,
    /// File was already on disk from an earlier run
    AlreadyPresent,
    Failed { reason: String },
}

/// A track that did not make it to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTrack {
    pub name: String,
    pub reason: String,
}

/// Per-album tally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumSummary {
    pub title: String,
    pub source_url: String,
    pub output_dir: PathBuf,
    pub total_tracks: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: BTreeMap<usize, FailedTrack>,
}

impl AlbumSummary {
    pub fn new(title: &str, source_url: &str, output_dir: PathBuf, total_tracks: usize) -> Self {
        Self {
            title: title.to_string(),
            source_url: source_url.to_string(),
            output_dir,
            total_tracks,
            succeeded: 0,
            skipped: 0,
            failed: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, index: usize, name: &str, outcome: TrackOutcome) {
        match outcome {
            TrackOutcome::Downloaded => self.succeeded += 1,
            TrackOutcome::AlreadyPresent => self.skipped += 1,
            TrackOutcome::Failed { reason } => {
                self.failed.insert(
                    index,
                    FailedTrack {
                        name: name.to_string(),
                        reason,
                    },
                );
            }
        }
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Tracks with a recorded outcome
    pub fn accounted(&self) -> usize {
        self.succeeded + self.skipped + self.failed_count()
    }

    /// Tracks present on disk after the run
    pub fn available(&self) -> usize {
        self.succeeded + self.skipped
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.accounted() == self.total_tracks
    }
}

/// Result of one requested album
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumResult {
    Finished(AlbumSummary),
    /// Album page could not be fetched or parsed
    Aborted { url: String, reason: String },
}

/// Everything a process run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub albums: Vec<AlbumResult>,
}

impl RunSummary {
    pub fn push(&mut self, result: AlbumResult) {
        self.albums.push(result);
    }

    pub fn albums_complete(&self) -> usize {
        self.albums
            .iter()
            .filter(|a| matches!(a, AlbumResult::Finished(s) if s.is_complete()))
            .count()
    }

    /// Tracks on disk across all albums, whether fetched now or earlier
    pub fn tracks_available(&self) -> usize {
        self.albums
            .iter()
            .map(|a| match a {
                AlbumResult::Finished(s) => s.available(),
                AlbumResult::Aborted { .. } => 0,
            })
            .sum()
    }

    /// A run succeeds when at least one track ended up on disk
    pub fn is_success(&self) -> bool {
        self.tracks_available() > 0
    }
}
