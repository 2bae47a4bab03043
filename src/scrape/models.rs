//! Album and track models scraped from the archive

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Audio formats the archive serves, identified by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AudioFormat {
    Flac,
    Mp3,
    Ogg,
    M4a,
    Opus,
    Wav,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 6] = [
        AudioFormat::Flac,
        AudioFormat::Mp3,
        AudioFormat::Ogg,
        AudioFormat::M4a,
        AudioFormat::Opus,
        AudioFormat::Wav,
    ];

    /// Canonical lower-case name, also used as the file extension
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Flac => "flac",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::M4a => "m4a",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
        }
    }

    /// Classify a file URL by the extension of its last path segment
    pub fn from_url(url: &Url) -> Option<Self> {
        let segment = url.path_segments()?.next_back()?;
        let (_, ext) = segment.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('.');
        AudioFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// One listed track of an album page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    /// 1-based position in the album listing
    pub index: usize,
    pub display_name: String,
    pub detail_url: Url,
    /// Filled in by the track resolver
    pub resolved_links: BTreeMap<AudioFormat, Url>,
}

impl TrackDescriptor {
    /// Pick the first preferred format that this track offers
    pub fn choose_format(&self, preference: &[String]) -> Option<(AudioFormat, &Url)> {
        preference.iter().find_map(|name| {
            let format = name.parse::<AudioFormat>().ok()?;
            self.resolved_links.get(&format).map(|url| (format, url))
        })
    }

    /// Comma separated list of offered formats, for error messages
    pub fn offered_formats(&self) -> String {
        if self.resolved_links.is_empty() {
            return "none".to_string();
        }
        self.resolved_links
            .keys()
            .map(AudioFormat::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A parsed album listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumDescriptor {
    pub title: String,
    pub source_url: Url,
    pub tracks: Vec<TrackDescriptor>,
}
