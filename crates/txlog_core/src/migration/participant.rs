//! The contract every migration step implements.

use super::progress::ProgressReporter;
use crate::error::CoreResult;
use crate::layout::DatabaseLayout;
use crate::store_id::StoreVersion;

/// Converts one kind of store artifact between formats.
///
/// A participant is stateless between calls. The upgrader calls
/// [`migrate`](Self::migrate) on every participant, then, once all have
/// succeeded, [`move_migrated_files`](Self::move_migrated_files) on every
/// participant in the same order, and finally [`cleanup`](Self::cleanup).
///
/// `migrate` must only write below the migration layout. `move_migrated_files`
/// must be idempotent: after a crash it is run again over artifacts that may
/// already have been moved.
pub trait StoreMigrationParticipant: Send + Sync {
    /// Name used in progress reports and errors.
    fn name(&self) -> &str;

    /// Writes migrated artifacts of `source` into `migration`.
    ///
    /// # Errors
    ///
    /// Any error aborts the upgrade with the source untouched.
    fn migrate(
        &self,
        source: &DatabaseLayout,
        migration: &DatabaseLayout,
        progress: &mut dyn ProgressReporter,
        from: &StoreVersion,
        to: &StoreVersion,
    ) -> CoreResult<()>;

    /// Replaces the source artifacts with the migrated ones.
    ///
    /// `from` and `to` are the version labels of the upgrade.
    ///
    /// # Errors
    ///
    /// Any error aborts the upgrade; the next attempt re-runs the moves.
    fn move_migrated_files(
        &self,
        migration: &DatabaseLayout,
        source: &DatabaseLayout,
        from: &str,
        to: &str,
    ) -> CoreResult<()>;

    /// Removes leftovers once the upgrade completed.
    ///
    /// # Errors
    ///
    /// Returns an error if leftovers cannot be removed.
    fn cleanup(&self, _migration: &DatabaseLayout) -> CoreResult<()> {
        Ok(())
    }
}
