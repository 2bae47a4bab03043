//! Logging setup
//!
//! Console output goes to stderr through the progress gate. Every run also
//! appends to a plain-text log file so a long batch can be audited later.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::utils::ConsoleGate;

const FILE_FILTER: &str = "khdl=debug";

/// Install the global subscriber
///
/// The returned guard flushes the file writer when dropped, so it has to live
/// until the end of `main`. `None` means the log file could not be opened and
/// only the console layer is active.
pub fn init(verbose: bool, log_file: &Path) -> Option<WorkerGuard> {
    let filter = if verbose {
        "khdl=debug,reqwest=debug"
    } else {
        "khdl=info"
    };
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    let console_layer = ConsoleGate::new(
        fmt::layer()
            .with_target(false)
            .with_writer(io::stderr),
    )
    .with_filter(console_filter);

    let (file_layer, guard, file_error) = match open_appender(log_file) {
        Ok(appender) => {
            let (writer, guard) = non_blocking::NonBlockingBuilder::default()
                .lossy(false)
                .finish(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(FILE_FILTER));
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        tracing::warn!(
            "Could not open log file {}: {}; logging to stderr only",
            log_file.display(),
            e
        );
    }

    guard
}

/// Open `path` for appending, creating it and its parent directory
///
/// The file is opened once up front so an unwritable location is reported
/// as an error instead of failing inside the appender.
fn open_appender(path: &Path) -> io::Result<rolling::RollingFileAppender> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };

    fs::create_dir_all(&dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(file_name))?;

    Ok(rolling::never(dir, file_name))
}
