//! Embedded metadata for downloaded tracks
//!
//! Tag writing is best effort: a file that could not be tagged is still a
//! successfully downloaded file, so failures are logged and reported but
//! never propagated.

use lofty::config::WriteOptions;
use lofty::file::FileType;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::scrape::AudioFormat;

/// Values written into a track's tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFields {
    pub album: String,
    pub track: u32,
    pub title: String,
}

/// Something that can write tags for some file extensions
pub trait TagWriter: Send + Sync {
    fn can_tag(&self, extension: &str) -> bool;
    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<()>;
}

/// lofty-backed writer for a single container format
pub struct LoftyTagWriter {
    format: AudioFormat,
    file_type: FileType,
}

impl LoftyTagWriter {
    pub fn new(format: AudioFormat) -> Self {
        let file_type = match format {
            AudioFormat::Flac => FileType::Flac,
            AudioFormat::Mp3 => FileType::Mpeg,
            AudioFormat::Ogg => FileType::Vorbis,
            AudioFormat::M4a => FileType::Mp4,
            AudioFormat::Opus => FileType::Opus,
            AudioFormat::Wav => FileType::Wav,
        };
        Self { format, file_type }
    }
}

impl TagWriter for LoftyTagWriter {
    fn can_tag(&self, extension: &str) -> bool {
        self.format.as_str().eq_ignore_ascii_case(extension)
    }

    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<()> {
        let tag_error = |message: String| Error::Tag {
            path: path.to_path_buf(),
            message,
        };

        let mut tagged_file = Probe::open(path)
            .map_err(|e| tag_error(e.to_string()))?
            .set_file_type(self.file_type)
            .read()
            .map_err(|e| tag_error(e.to_string()))?;

        if tagged_file.primary_tag_mut().is_none() {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .primary_tag_mut()
            .ok_or_else(|| tag_error("no writable tag".to_string()))?;

        tag.set_title(fields.title.clone());
        tag.set_album(fields.album.clone());
        tag.set_track(fields.track);

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| tag_error(e.to_string()))?;

        debug!("Tagged {}", path.display());
        Ok(())
    }
}

/// Writer that never tags anything; stands in when tagging is disabled
pub struct NoopTagWriter;

impl TagWriter for NoopTagWriter {
    fn can_tag(&self, _extension: &str) -> bool {
        false
    }

    fn write_tags(&self, _path: &Path, _fields: &TagFields) -> Result<()> {
        Ok(())
    }
}

/// Dispatches to one writer per extension
pub struct TagWriterTable {
    writers: HashMap<&'static str, Box<dyn TagWriter>>,
}

impl TagWriterTable {
    /// Table with a lofty writer for every known audio format
    pub fn lofty() -> Self {
        let writers = AudioFormat::ALL
            .into_iter()
            .map(|format| {
                let writer: Box<dyn TagWriter> = Box::new(LoftyTagWriter::new(format));
                (format.as_str(), writer)
            })
            .collect();
        Self { writers }
    }

    fn lookup(&self, extension: &str) -> Option<&dyn TagWriter> {
        self.writers
            .get(extension.to_ascii_lowercase().as_str())
            .map(|w| w.as_ref())
            .filter(|w| w.can_tag(extension))
    }
}

impl TagWriter for TagWriterTable {
    fn can_tag(&self, extension: &str) -> bool {
        self.lookup(extension).is_some()
    }

    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match self.lookup(extension) {
            Some(writer) => writer.write_tags(path, fields),
            None => Err(Error::Tag {
                path: path.to_path_buf(),
                message: format!("unsupported extension {:?}", extension),
            }),
        }
    }
}

/// What tagging did to a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    Tagged,
    Unsupported,
    Failed(String),
}

/// Best-effort tagger used by the download workers
#[derive(Clone)]
pub struct MetadataTagger {
    writer: Arc<dyn TagWriter>,
}

impl MetadataTagger {
    /// Pick the writer once; disabled tagging gets the no-op writer
    pub fn new(enabled: bool) -> Self {
        let writer: Arc<dyn TagWriter> = if enabled {
            Arc::new(TagWriterTable::lofty())
        } else {
            debug!("Metadata tagging disabled");
            Arc::new(NoopTagWriter)
        };
        Self { writer }
    }

    /// Tag `path` on the blocking pool; never fails
    pub async fn tag(&self, path: PathBuf, fields: TagFields) -> TagOutcome {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        if !self.writer.can_tag(&extension) {
            debug!("No tag writer for {}", path.display());
            return TagOutcome::Unsupported;
        }

        let writer = self.writer.clone();
        let shown = path.display().to_string();
        let result = tokio::task::spawn_blocking(move || writer.write_tags(&path, &fields)).await;

        match result {
            Ok(Ok(())) => TagOutcome::Tagged,
            Ok(Err(e)) => {
                warn!("Could not tag {}: {}", shown, e);
                TagOutcome::Failed(e.to_string())
            }
            Err(e) => {
                warn!("Tagging task for {} panicked: {}", shown, e);
                TagOutcome::Failed(e.to_string())
            }
        }
    }
}
