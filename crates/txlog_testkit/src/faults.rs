//! Migration participants for failure and ordering tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use txlog_core::migration::{ProgressReporter, StoreMigrationParticipant};
use txlog_core::{CoreError, CoreResult, DatabaseLayout, StoreVersion};

/// Message of the error a [`FailingParticipant`] fails with.
pub const FAILURE_MESSAGE: &str = "This upgrade is failing";

/// Where a [`FailingParticipant`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// In `migrate`.
    Migrate,
    /// In `move_migrated_files`.
    MoveFiles,
}

/// A participant that fails at a chosen point while armed.
///
/// Starts armed. Disarm it to let the next attempt succeed, as if the
/// process had been restarted after a crash.
#[derive(Debug)]
pub struct FailingParticipant {
    name: String,
    point: FailurePoint,
    armed: AtomicBool,
}

impl FailingParticipant {
    /// Creates an armed participant failing at `point`.
    pub fn new(name: impl Into<String>, point: FailurePoint) -> Self {
        Self {
            name: name.into(),
            point,
            armed: AtomicBool::new(true),
        }
    }

    /// Stops failing.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Starts failing again.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    fn fail_at(&self, point: FailurePoint) -> CoreResult<()> {
        if self.point == point && self.armed.load(Ordering::SeqCst) {
            return Err(CoreError::illegal_state(FAILURE_MESSAGE));
        }
        Ok(())
    }
}

impl StoreMigrationParticipant for FailingParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    fn migrate(
        &self,
        _source: &DatabaseLayout,
        _migration: &DatabaseLayout,
        _progress: &mut dyn ProgressReporter,
        _from: &StoreVersion,
        _to: &StoreVersion,
    ) -> CoreResult<()> {
        self.fail_at(FailurePoint::Migrate)
    }

    fn move_migrated_files(
        &self,
        _migration: &DatabaseLayout,
        _source: &DatabaseLayout,
        _from: &str,
        _to: &str,
    ) -> CoreResult<()> {
        self.fail_at(FailurePoint::MoveFiles)
    }
}

/// Call counts of a [`CountingParticipant`].
#[derive(Debug, Default)]
pub struct CallCounts {
    migrate: AtomicUsize,
    moves: AtomicUsize,
    cleanups: AtomicUsize,
}

impl CallCounts {
    /// Number of `migrate` calls.
    pub fn migrate(&self) -> usize {
        self.migrate.load(Ordering::SeqCst)
    }

    /// Number of `move_migrated_files` calls.
    pub fn moves(&self) -> usize {
        self.moves.load(Ordering::SeqCst)
    }

    /// Number of `cleanup` calls.
    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

/// Wraps a participant and counts calls into it.
pub struct CountingParticipant {
    inner: Arc<dyn StoreMigrationParticipant>,
    counts: Arc<CallCounts>,
}

impl CountingParticipant {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn StoreMigrationParticipant>) -> Self {
        Self {
            inner,
            counts: Arc::new(CallCounts::default()),
        }
    }

    /// Returns the shared call counts.
    pub fn counts(&self) -> Arc<CallCounts> {
        Arc::clone(&self.counts)
    }
}

impl StoreMigrationParticipant for CountingParticipant {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn migrate(
        &self,
        source: &DatabaseLayout,
        migration: &DatabaseLayout,
        progress: &mut dyn ProgressReporter,
        from: &StoreVersion,
        to: &StoreVersion,
    ) -> CoreResult<()> {
        self.counts.migrate.fetch_add(1, Ordering::SeqCst);
        self.inner.migrate(source, migration, progress, from, to)
    }

    fn move_migrated_files(
        &self,
        migration: &DatabaseLayout,
        source: &DatabaseLayout,
        from: &str,
        to: &str,
    ) -> CoreResult<()> {
        self.counts.moves.fetch_add(1, Ordering::SeqCst);
        self.inner.move_migrated_files(migration, source, from, to)
    }

    fn cleanup(&self, migration: &DatabaseLayout) -> CoreResult<()> {
        self.counts.cleanups.fetch_add(1, Ordering::SeqCst);
        self.inner.cleanup(migration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_core::migration::SilentProgressReporter;

    #[test]
    fn fails_only_while_armed() {
        let layout = DatabaseLayout::new("/db");
        let version = StoreVersion::new("record", "aligned", 1, 0);
        let participant = FailingParticipant::new("failing", FailurePoint::Migrate);
        let migrate = |p: &FailingParticipant| {
            p.migrate(
                &layout,
                &layout.migration_layout(),
                &mut SilentProgressReporter,
                &version,
                &version,
            )
        };

        let err = migrate(&participant).unwrap_err();
        assert!(err.to_string().contains(FAILURE_MESSAGE));
        assert!(participant
            .move_migrated_files(&layout.migration_layout(), &layout, "a", "b")
            .is_ok());

        participant.disarm();
        assert!(migrate(&participant).is_ok());
        participant.arm();
        assert!(migrate(&participant).is_err());
    }

    #[test]
    fn counting_forwards_calls() {
        let layout = DatabaseLayout::new("/db");
        let failing: Arc<dyn StoreMigrationParticipant> =
            Arc::new(FailingParticipant::new("moves", FailurePoint::MoveFiles));
        let counting = CountingParticipant::new(failing);
        let counts = counting.counts();

        assert_eq!(counting.name(), "moves");
        assert!(counting
            .move_migrated_files(&layout.migration_layout(), &layout, "a", "b")
            .is_err());
        counting.cleanup(&layout.migration_layout()).unwrap();
        assert_eq!((counts.migrate(), counts.moves(), counts.cleanups()), (0, 1, 1));
    }
}
