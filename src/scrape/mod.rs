//! Archive page scraping

pub mod album;
pub mod client;
pub mod html;
pub mod models;
pub mod track;

pub use album::parse_album;
pub use client::{HttpFetcher, PageFetcher, http_client};
pub use models::{AlbumDescriptor, AudioFormat, TrackDescriptor};
pub use track::resolve_track;
