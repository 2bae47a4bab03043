//! Album download engine

pub mod coordinator;
pub mod downloader;
pub mod retry;
pub mod summary;
pub mod task;

pub use coordinator::DownloadCoordinator;
pub use retry::{RetryPolicy, retry};
pub use summary::{AlbumResult, AlbumSummary, RunSummary, TrackOutcome};
