//! Download progress reporting
//!
//! A terminal gets an indicatif bar per album. Anything else (pipes, CI logs)
//! gets one plain line per finished track.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::download::TrackOutcome;
use crate::utils::set_bar_active;

/// Receives progress events from the coordinator
pub trait ProgressSink: Send + Sync {
    fn album_started(&self, title: &str, track_count: usize);
    fn track_finished(&self, index: usize, name: &str, outcome: &TrackOutcome);
    fn album_finished(&self);
}

/// Choose the reporter once, based on whether stderr is a terminal
pub fn detect() -> Arc<dyn ProgressSink> {
    if console::Term::stderr().is_term() {
        Arc::new(BarProgress::default())
    } else {
        Arc::new(TextProgress::stderr())
    }
}

fn outcome_label(outcome: &TrackOutcome) -> &'static str {
    match outcome {
        TrackOutcome::Downloaded => "done",
        TrackOutcome::AlreadyPresent => "exists",
        TrackOutcome::Failed { .. } => "FAILED",
    }
}

/// indicatif progress bar, one per album
#[derive(Default)]
pub struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressSink for BarProgress {
    fn album_started(&self, title: &str, track_count: usize) {
        let bar = ProgressBar::new(track_count as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_prefix(title.to_string());
        set_bar_active(true);

        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn track_finished(&self, _index: usize, name: &str, outcome: &TrackOutcome) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.inc(1);
                bar.set_message(format!("{} ({})", name, outcome_label(outcome)));
            }
        }
    }

    fn album_finished(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_with_message("done");
            }
        }
        set_bar_active(false);
    }
}

/// Line-oriented fallback for non-interactive output
pub struct TextProgress {
    out: Mutex<Box<dyn Write + Send>>,
    total: AtomicUsize,
    done: AtomicUsize,
}

impl TextProgress {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
        }
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    fn line(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", text);
        }
    }
}

impl ProgressSink for TextProgress {
    fn album_started(&self, title: &str, track_count: usize) {
        self.total.store(track_count, Ordering::SeqCst);
        self.done.store(0, Ordering::SeqCst);
        self.line(&format!("{}: {} tracks", title, track_count));
    }

    fn track_finished(&self, index: usize, name: &str, outcome: &TrackOutcome) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total.load(Ordering::SeqCst);
        self.line(&format!(
            "[{}/{}] {:>6} #{} {}",
            done,
            total,
            outcome_label(outcome),
            index,
            name
        ));
    }

    fn album_finished(&self) {}
}

/// Sink that reports nothing
#[cfg(test)]
pub struct SilentProgress;

#[cfg(test)]
impl ProgressSink for SilentProgress {
    fn album_started(&self, _title: &str, _track_count: usize) {}
    fn track_finished(&self, _index: usize, _name: &str, _outcome: &TrackOutcome) {}
    fn album_finished(&self) {}
}
