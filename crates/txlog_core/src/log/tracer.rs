//! Hooks for observing log file lifecycle events and page access.

use std::sync::atomic::{AtomicU64, Ordering};

/// Receives log file lifecycle events and page access.
///
/// Creation is bracketed: [`DatabaseTracer::create_log_file`] returns a
/// guard that is dropped once the header has been written. Page access is
/// bracketed the same way: [`DatabaseTracer::pin_page`] pins and dropping
/// the guard unpins, so pins and unpins always balance.
pub trait DatabaseTracer: Send + Sync {
    /// Called when a new log file header is about to be written.
    fn create_log_file(&self) -> TraceEvent<'_>;

    /// Called when an existing log file is opened for reading.
    fn open_log_file(&self);

    /// Called when a log file channel is closed.
    fn close_log_file(&self) {}

    /// Called when a page of a store file is pinned for copying.
    fn pin_page(&self) -> TraceEvent<'_> {
        TraceEvent::none()
    }
}

/// Guard for a bracketed trace event. Dropping it ends the event.
#[must_use = "the event ends when the guard is dropped"]
pub struct TraceEvent<'a> {
    on_end: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> TraceEvent<'a> {
    /// An event that does nothing when it ends.
    #[must_use]
    pub fn none() -> Self {
        Self { on_end: None }
    }

    /// An event that runs `on_end` when it ends.
    pub fn new(on_end: impl FnOnce() + 'a) -> Self {
        Self {
            on_end: Some(Box::new(on_end)),
        }
    }
}

impl Drop for TraceEvent<'_> {
    fn drop(&mut self) {
        if let Some(on_end) = self.on_end.take() {
            on_end();
        }
    }
}

impl std::fmt::Debug for TraceEvent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceEvent")
            .field("has_end_hook", &self.on_end.is_some())
            .finish()
    }
}

/// A tracer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTracer;

impl DatabaseTracer for NullTracer {
    fn create_log_file(&self) -> TraceEvent<'_> {
        TraceEvent::none()
    }

    fn open_log_file(&self) {}
}

/// A tracer that counts events.
#[derive(Debug, Default)]
pub struct CountingDatabaseTracer {
    created: AtomicU64,
    create_completed: AtomicU64,
    opened: AtomicU64,
    closed: AtomicU64,
    pins: AtomicU64,
    unpins: AtomicU64,
}

impl CountingDatabaseTracer {
    /// Creates a tracer with all counts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of create events started.
    pub fn created_files(&self) -> u64 {
        self.created.load(Ordering::Acquire)
    }

    /// Number of create events that ended.
    pub fn completed_creations(&self) -> u64 {
        self.create_completed.load(Ordering::Acquire)
    }

    /// Number of open events.
    pub fn opened_files(&self) -> u64 {
        self.opened.load(Ordering::Acquire)
    }

    /// Number of close events.
    pub fn closed_files(&self) -> u64 {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of page pins.
    pub fn pins(&self) -> u64 {
        self.pins.load(Ordering::Acquire)
    }

    /// Number of page unpins.
    pub fn unpins(&self) -> u64 {
        self.unpins.load(Ordering::Acquire)
    }
}

impl DatabaseTracer for CountingDatabaseTracer {
    fn create_log_file(&self) -> TraceEvent<'_> {
        self.created.fetch_add(1, Ordering::AcqRel);
        TraceEvent::new(|| {
            self.create_completed.fetch_add(1, Ordering::AcqRel);
        })
    }

    fn open_log_file(&self) {
        self.opened.fetch_add(1, Ordering::AcqRel);
    }

    fn close_log_file(&self) {
        self.closed.fetch_add(1, Ordering::AcqRel);
    }

    fn pin_page(&self) -> TraceEvent<'_> {
        self.pins.fetch_add(1, Ordering::AcqRel);
        TraceEvent::new(|| {
            self.unpins.fetch_add(1, Ordering::AcqRel);
        })
    }
}
