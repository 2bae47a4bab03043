//! Error taxonomy shared by the scraping, download and tagging layers

use std::path::PathBuf;

/// Errors produced while fetching, parsing, downloading or tagging
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network or transport failure reaching a page or file
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// Expected HTML structure is missing
    #[error("failed to parse {url}: {message}")]
    Parse { url: String, message: String },

    /// None of the preferred formats is offered for a track
    #[error("no acceptable format (offered: {offered})")]
    FormatUnavailable { offered: String },

    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted configuration is unreadable or invalid
    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Metadata could not be written
    #[error("failed to tag {path}: {message}")]
    Tag { path: PathBuf, message: String },

    /// Album URL rejected before any request was made
    #[error("invalid album URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn fetch(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn parse(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Io { .. })
    }

    /// Short reason recorded in the run summary for a failed track
    pub fn reason(&self) -> String {
        match self {
            Self::Fetch { message, .. } => format!("fetch failed: {}", message),
            Self::Parse { message, .. } => format!("parse failed: {}", message),
            Self::FormatUnavailable { .. } => "no acceptable format".to_string(),
            Self::Io { source, .. } => format!("I/O error: {}", source),
            Self::Config { message, .. } => format!("config error: {}", message),
            Self::Tag { message, .. } => format!("tagging failed: {}", message),
            Self::InvalidUrl { message, .. } => format!("invalid URL: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_and_io_are_retryable() {
        assert!(Error::fetch("http://x", "timed out").is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(Error::io("/tmp/a", io).is_retryable());
    }

    #[test]
    fn test_structural_errors_are_not_retryable() {
        assert!(!Error::parse("http://x", "no songlist").is_retryable());
        assert!(
            !Error::FormatUnavailable {
                offered: "ogg".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_format_unavailable_reason() {
        let err = Error::FormatUnavailable {
            offered: "none".into(),
        };
        assert_eq!(err.reason(), "no acceptable format");
    }
}
