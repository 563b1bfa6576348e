//! A progress monitor that records what it is told.

use parking_lot::Mutex;
use std::sync::Arc;
use txlog_core::migration::{MigrationProgressMonitor, ProgressReporter};

/// What one section reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionRecord {
    /// Section name.
    pub name: String,
    /// The announced maximum, if `start` was called.
    pub max: Option<u64>,
    /// Sum of all progress increments.
    pub progress: u64,
    /// Whether `completed` was called.
    pub completed: bool,
    /// Progress reported after completion.
    pub progress_after_completion: bool,
}

#[derive(Debug, Default)]
struct Recorded {
    started: Option<usize>,
    sections: Vec<SectionRecord>,
    completed: bool,
}

/// Records sections and increments reported during a migration.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingProgressMonitor {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingProgressMonitor {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the announced section count.
    pub fn started_sections(&self) -> Option<usize> {
        self.inner.lock().started
    }

    /// Returns every started section in order.
    pub fn sections(&self) -> Vec<SectionRecord> {
        self.inner.lock().sections.clone()
    }

    /// Returns the names of every started section in order.
    pub fn section_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .sections
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    /// Returns true once the whole migration completed.
    pub fn is_completed(&self) -> bool {
        self.inner.lock().completed
    }

    /// Panics unless every section completed without overshooting its
    /// maximum or reporting after completion.
    pub fn assert_well_formed(&self) {
        let recorded = self.inner.lock();
        for section in &recorded.sections {
            assert!(section.completed, "section {} never completed", section.name);
            assert!(
                !section.progress_after_completion,
                "section {} reported progress after completion",
                section.name
            );
            if let Some(max) = section.max {
                assert!(
                    section.progress <= max,
                    "section {} reported {} of {}",
                    section.name,
                    section.progress,
                    max
                );
            }
        }
    }
}

impl MigrationProgressMonitor for RecordingProgressMonitor {
    fn started(&self, sections: usize) {
        self.inner.lock().started = Some(sections);
    }

    fn start_section(&self, name: &str) -> Box<dyn ProgressReporter> {
        let mut recorded = self.inner.lock();
        recorded.sections.push(SectionRecord {
            name: name.to_string(),
            ..SectionRecord::default()
        });
        Box::new(RecordingReporter {
            inner: Arc::clone(&self.inner),
            index: recorded.sections.len() - 1,
        })
    }

    fn completed(&self) {
        self.inner.lock().completed = true;
    }
}

struct RecordingReporter {
    inner: Arc<Mutex<Recorded>>,
    index: usize,
}

impl RecordingReporter {
    fn with_section(&self, f: impl FnOnce(&mut SectionRecord)) {
        if let Some(section) = self.inner.lock().sections.get_mut(self.index) {
            f(section);
        }
    }
}

impl ProgressReporter for RecordingReporter {
    fn start(&mut self, max: u64) {
        self.with_section(|s| s.max = Some(max));
    }

    fn progress(&mut self, add: u64) {
        self.with_section(|s| {
            if s.completed {
                s.progress_after_completion = true;
            }
            s.progress += add;
        });
    }

    fn completed(&mut self) {
        self.with_section(|s| s.completed = true);
    }
}
