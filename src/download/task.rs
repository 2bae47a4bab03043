//! Per-track download task and its status

use std::fmt;
use std::path::PathBuf;
use url::Url;

use crate::scrape::AudioFormat;

/// Lifecycle of a download task
///
/// Status only moves forward: `Pending -> InProgress -> Succeeded | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl TaskStatus {
    fn can_advance_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Succeeded)
                | (TaskStatus::InProgress, TaskStatus::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid task transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// One track's download, from format choice to file on disk
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub track_index: usize,
    pub track_title: String,
    pub chosen_format: AudioFormat,
    pub file_url: Url,
    pub destination_path: PathBuf,
    pub attempt_count: u32,
    status: TaskStatus,
}

impl DownloadTask {
    pub fn new(
        track_index: usize,
        track_title: String,
        chosen_format: AudioFormat,
        file_url: Url,
        destination_path: PathBuf,
    ) -> Self {
        Self {
            track_index,
            track_title,
            chosen_format,
            file_url,
            destination_path,
            attempt_count: 0,
            status: TaskStatus::Pending,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Move to `next`, refusing any change that is not a forward step
    pub fn advance(&mut self, next: TaskStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_advance_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
