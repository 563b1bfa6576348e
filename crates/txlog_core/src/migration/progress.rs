//! Progress reporting for store migrations.

use parking_lot::Mutex;
use std::time::Instant;

/// Receives progress of one migration section.
///
/// Progress only ever grows: `progress` adds to what has been reported.
pub trait ProgressReporter: Send {
    /// Announces the total amount of work in this section.
    fn start(&mut self, max: u64);

    /// Adds `add` units of completed work.
    fn progress(&mut self, add: u64);

    /// Marks the section as done.
    fn completed(&mut self);
}

/// Receives progress of a whole migration.
pub trait MigrationProgressMonitor: Send + Sync {
    /// Called once when a migration starts with the number of sections.
    fn started(&self, sections: usize);

    /// Starts the section for one participant.
    fn start_section(&self, name: &str) -> Box<dyn ProgressReporter>;

    /// Called once when the migration completed.
    fn completed(&self);
}

/// A reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn start(&mut self, _max: u64) {}

    fn progress(&mut self, _add: u64) {}

    fn completed(&mut self) {}
}

/// A monitor that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgressMonitor;

impl MigrationProgressMonitor for SilentProgressMonitor {
    fn started(&self, _sections: usize) {}

    fn start_section(&self, _name: &str) -> Box<dyn ProgressReporter> {
        Box::new(SilentProgressReporter)
    }

    fn completed(&self) {}
}

/// A monitor that logs progress through `tracing`.
///
/// Sections log every tenth of their work.
#[derive(Debug, Default)]
pub struct LoggingProgressMonitor {
    started_at: Mutex<Option<Instant>>,
}

impl LoggingProgressMonitor {
    /// Creates a new logging monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MigrationProgressMonitor for LoggingProgressMonitor {
    fn started(&self, sections: usize) {
        *self.started_at.lock() = Some(Instant::now());
        tracing::info!(sections, "starting store migration");
    }

    fn start_section(&self, name: &str) -> Box<dyn ProgressReporter> {
        tracing::info!(section = name, "migrating");
        Box::new(LoggingProgressReporter {
            section: name.to_string(),
            max: 0,
            current: 0,
            last_tenth: 0,
        })
    }

    fn completed(&self) {
        let elapsed = self.started_at.lock().map(|t| t.elapsed());
        tracing::info!(elapsed = ?elapsed, "store migration completed");
    }
}

struct LoggingProgressReporter {
    section: String,
    max: u64,
    current: u64,
    last_tenth: u64,
}

impl ProgressReporter for LoggingProgressReporter {
    fn start(&mut self, max: u64) {
        self.max = max;
    }

    fn progress(&mut self, add: u64) {
        self.current = self.current.saturating_add(add);
        if self.max == 0 {
            return;
        }
        let tenth = (self.current.min(self.max) * 10) / self.max;
        if tenth > self.last_tenth {
            self.last_tenth = tenth;
            tracing::info!(section = %self.section, percent = tenth * 10, "migration progress");
        }
    }

    fn completed(&mut self) {
        tracing::info!(section = %self.section, "section completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_reporter_tracks_tenths() {
        let monitor = LoggingProgressMonitor::new();
        monitor.started(1);
        let mut reporter = LoggingProgressReporter {
            section: "logs".to_string(),
            max: 0,
            current: 0,
            last_tenth: 0,
        };
        reporter.start(100);
        reporter.progress(25);
        assert_eq!(reporter.last_tenth, 2);
        reporter.progress(200);
        assert_eq!(reporter.last_tenth, 10);
        reporter.completed();
        monitor.completed();
    }

    #[test]
    fn silent_monitor_sections() {
        let monitor = SilentProgressMonitor;
        let mut section = monitor.start_section("records");
        section.start(10);
        section.progress(10);
        section.completed();
    }
}
