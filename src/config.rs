//! User configuration persistence
//!
//! Settings live in `~/.config/khdl/config.json` unless a path is given on the
//! command line. Every key is optional; anything missing takes its built-in
//! default, so older or hand-written files keep working.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::download::RetryPolicy;
use crate::error::{Error, Result};

const CONFIG_DIR: &str = "khdl";
const CONFIG_FILE: &str = "config.json";
const FALLBACK_CONFIG_FILE: &str = "khdl_config.json";

/// Effective settings for one process run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory; each album gets a sub-folder
    pub output_directory: PathBuf,
    /// Size of the worker pool for page resolution and downloads
    pub max_threads: usize,
    /// Audio formats, most preferred first
    pub format_preference: Vec<String>,
    /// Prefix file names with the zero-padded track index
    pub include_track_number: bool,
    /// Extra attempts after the first failed one
    pub retry_attempts: u32,
    /// Constant pause between attempts, in seconds
    #[serde(rename = "retry_delay")]
    pub retry_delay_seconds: u64,
    /// Write album/title/track tags into downloaded files
    pub tag_metadata: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_directory: default_output_directory(),
            max_threads: 3,
            format_preference: vec!["flac".to_string(), "mp3".to_string()],
            include_track_number: true,
            retry_attempts: 3,
            retry_delay_seconds: 5,
            tag_metadata: true,
        }
    }
}

/// Per-run values taken from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output_directory: Option<PathBuf>,
    pub max_threads: Option<usize>,
    pub format_preference: Option<Vec<String>>,
    pub no_track_numbers: bool,
    pub no_tags: bool,
}

impl Config {
    /// Load configuration from `path`
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read, parsed or validated is a [`Error::Config`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let config: Self = serde_json::from_str(&contents).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let config = config.normalized().map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to `path` as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let contents = serde_json::to_string_pretty(self).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        fs::write(path, contents).map_err(|e| Error::io(path, e))?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(FALLBACK_CONFIG_FILE))
    }

    /// Apply command-line overrides on top of the loaded values
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(dir) = &overrides.output_directory {
            self.output_directory = dir.clone();
        }
        if let Some(threads) = overrides.max_threads {
            self.max_threads = threads.max(1);
        }
        if let Some(formats) = &overrides.format_preference {
            let formats = normalize_formats(formats);
            if !formats.is_empty() {
                self.format_preference = formats;
            }
        }
        if overrides.no_track_numbers {
            self.include_track_number = false;
        }
        if overrides.no_tags {
            self.tag_metadata = false;
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_attempts: self.retry_attempts,
            delay: Duration::from_secs(self.retry_delay_seconds),
        }
    }

    fn normalized(mut self) -> std::result::Result<Self, String> {
        if self.max_threads == 0 {
            return Err("max_threads must be at least 1".to_string());
        }
        self.format_preference = normalize_formats(&self.format_preference);
        if self.format_preference.is_empty() {
            return Err("format_preference must name at least one format".to_string());
        }
        Ok(self)
    }
}

/// Split a `-f flac,mp3` style list into format names
pub fn parse_format_list(value: &str) -> Vec<String> {
    normalize_formats(&value.split(',').map(str::to_string).collect::<Vec<_>>())
}

fn normalize_formats(formats: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(formats.len());
    for format in formats {
        let format = format.trim().trim_start_matches('.').to_ascii_lowercase();
        if !format.is_empty() && !out.contains(&format) {
            out.push(format);
        }
    }
    out
}

fn default_output_directory() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Music")))
        .unwrap_or_else(|| PathBuf::from("Music"))
        .join(CONFIG_DIR)
}
