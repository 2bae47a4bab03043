//! Progress-aware console logging
//!
//! While a progress bar is drawing, routine console log lines would tear it
//! apart. The gate holds back everything below WARN on the console layer for
//! that time; the log file still receives every event.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::Level;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

static BAR_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Mark a progress bar as on screen (or gone)
pub fn set_bar_active(active: bool) {
    BAR_ACTIVE.store(active, Ordering::SeqCst);
}

fn is_bar_active() -> bool {
    BAR_ACTIVE.load(Ordering::SeqCst)
}

fn passes(level: &Level) -> bool {
    !is_bar_active() || *level <= Level::WARN
}

/// Wraps the console layer and drops quiet events while a bar is active
pub struct ConsoleGate<L> {
    inner: L,
}

impl<L> ConsoleGate<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<S, L> Layer<S> for ConsoleGate<L>
where
    S: tracing::Subscriber,
    L: Layer<S>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: Context<'_, S>,
    ) {
        self.inner.on_new_span(attrs, id, ctx);
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: Context<'_, S>,
    ) {
        self.inner.on_record(id, values, ctx);
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        if passes(event.metadata().level()) {
            self.inner.on_event(event, ctx);
        }
    }

    fn on_enter(&self, id: &tracing::span::Id, ctx: Context<'_, S>) {
        self.inner.on_enter(id, ctx);
    }

    fn on_exit(&self, id: &tracing::span::Id, ctx: Context<'_, S>) {
        self.inner.on_exit(id, ctx);
    }

    fn on_close(&self, id: tracing::span::Id, ctx: Context<'_, S>) {
        self.inner.on_close(id, ctx);
    }
}
