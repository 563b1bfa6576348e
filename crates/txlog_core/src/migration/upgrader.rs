//! Orchestration of a store upgrade.

use super::logs::LogsMigrator;
use super::participant::StoreMigrationParticipant;
use super::progress::{MigrationProgressMonitor, SilentProgressMonitor};
use super::status::{MigrationPhaseMarker, MigrationStatus};
use super::version_check::{StoreVersionCheck, UpgradeCheck};
use crate::config::Config;
use crate::error::{CoreError, CoreResult, MigrationPhase};
use crate::layout::DatabaseLayout;
use crate::store_id::{StoreId, StoreVersion};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use txlog_storage::FileSystem;

/// Name of the background upgrade thread.
const UPGRADE_THREAD_NAME: &str = "txlog-store-upgrade";

/// Progress of one upgrade attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeState {
    /// Nothing has happened yet.
    NotStarted,
    /// The store was found to need an upgrade.
    VersionChecked,
    /// Participants are migrating into the migration directory.
    Migrating,
    /// Every participant has migrated.
    Migrated,
    /// Every participant has moved its files over the source.
    FilesMoved,
    /// The version marker is updated and leftovers are gone.
    CleanedUp,
    /// The attempt failed; the next attempt resumes.
    Failed,
    /// The version check or the configuration refused the upgrade before
    /// any file was touched.
    Refused,
    /// The store needed no upgrade.
    NotNeeded,
}

/// Validates a store after its files were moved and before the version
/// marker is updated.
pub trait ConsistencyCheck: Send + Sync {
    /// Checks the store at `layout`.
    ///
    /// # Errors
    ///
    /// Returns an error describing the inconsistency.
    fn check(&self, layout: &DatabaseLayout) -> CoreResult<()>;
}

/// Handle for cancelling an upgrade between participants.
#[derive(Debug, Clone, Default)]
pub struct UpgradeCancellation {
    cancelled: Arc<AtomicBool>,
}

impl UpgradeCancellation {
    /// Creates a handle that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The running participant finishes first.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Upgrades a store to a target version by running migration participants.
///
/// ## Protocol
///
/// 1. The version check decides whether anything needs doing
/// 2. A fresh migration directory gets the `migrating` marker and every
///    participant migrates into it, in order
/// 3. The marker becomes `moving` and every participant moves its files
///    over the source, in the same order
/// 4. The optional consistency check runs, the version marker is written,
///    participants clean up and the migration directory is removed
///
/// A crash before step 3 leaves the source untouched. A crash during step 3
/// is resumed by the next attempt to the same target, which finds the
/// `moving` marker and only repeats the moves. An attempt to any other
/// target fails until the interrupted one is finished.
///
/// Attempts on one upgrader are serialized. The log migrator always runs
/// first.
pub struct StoreUpgrader {
    fs: Arc<dyn FileSystem>,
    config: Config,
    target: StoreVersion,
    version_check: Arc<dyn StoreVersionCheck>,
    participants: Vec<Arc<dyn StoreMigrationParticipant>>,
    progress: Arc<dyn MigrationProgressMonitor>,
    consistency_check: Option<Arc<dyn ConsistencyCheck>>,
    cancellation: UpgradeCancellation,
    state: Mutex<UpgradeState>,
    attempt: Mutex<()>,
}

impl StoreUpgrader {
    /// Creates an upgrader to `target`, starting with the log migrator.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        config: Config,
        target: StoreVersion,
        version_check: Arc<dyn StoreVersionCheck>,
    ) -> Self {
        let logs: Arc<dyn StoreMigrationParticipant> = Arc::new(LogsMigrator::new(Arc::clone(&fs)));
        Self {
            fs,
            config,
            target,
            version_check,
            participants: vec![logs],
            progress: Arc::new(SilentProgressMonitor),
            consistency_check: None,
            cancellation: UpgradeCancellation::new(),
            state: Mutex::new(UpgradeState::NotStarted),
            attempt: Mutex::new(()),
        }
    }

    /// Appends a participant; participants run in insertion order.
    pub fn add_participant(&mut self, participant: Arc<dyn StoreMigrationParticipant>) {
        self.participants.push(participant);
    }

    /// Replaces the progress monitor.
    #[must_use]
    pub fn with_progress_monitor(mut self, progress: Arc<dyn MigrationProgressMonitor>) -> Self {
        self.progress = progress;
        self
    }

    /// Sets the post-migration consistency check.
    #[must_use]
    pub fn with_consistency_check(mut self, check: Arc<dyn ConsistencyCheck>) -> Self {
        self.consistency_check = Some(check);
        self
    }

    /// Returns the cancellation handle.
    #[must_use]
    pub fn cancellation(&self) -> UpgradeCancellation {
        self.cancellation.clone()
    }

    /// Returns the state of the latest attempt.
    #[must_use]
    pub fn state(&self) -> UpgradeState {
        *self.state.lock()
    }

    /// Returns the participant names in run order.
    #[must_use]
    pub fn participant_names(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.name().to_string()).collect()
    }

    /// Upgrades the store at `layout` if it is older than the target.
    ///
    /// Returns the final state, `CleanedUp` or `NotNeeded`. A call made while
    /// another attempt runs waits for it to finish.
    ///
    /// # Errors
    ///
    /// - `VersionMismatch` / `DowngradeNotSupported` from the version check
    /// - `UpgradeNotPermitted` when an upgrade is needed but disabled
    /// - `IllegalState` when an interrupted upgrade to another target is
    ///   still moving files
    /// - `ParticipantFailure` when a participant fails
    /// - `InconsistentStore` when the consistency check fails
    /// - `UpgradeCancelled` when cancelled between participants
    pub fn migrate_if_needed(&self, layout: &DatabaseLayout) -> CoreResult<UpgradeState> {
        let _attempt = self.attempt.lock();
        self.set_state(UpgradeState::NotStarted);

        let check = self
            .version_check
            .check_upgrade(layout, &self.target)
            .inspect_err(|_| {
                self.set_state(UpgradeState::Refused);
            })?;
        let from_id = match check {
            UpgradeCheck::NoStore => return Ok(self.set_state(UpgradeState::NotNeeded)),
            UpgradeCheck::UpToDate => {
                self.remove_stray_migration_directory(layout)?;
                return Ok(self.set_state(UpgradeState::NotNeeded));
            }
            UpgradeCheck::Upgrade { from } => from,
        };
        self.set_state(UpgradeState::VersionChecked);

        let from = from_id.store_version();
        if !self.config.allow_upgrade {
            self.set_state(UpgradeState::Refused);
            return Err(CoreError::UpgradeNotPermitted {
                from: from.to_string(),
                to: self.target.to_string(),
            });
        }

        tracing::info!(from = %from, to = %self.target, "upgrading store");
        match self.run(layout, &from_id, &from) {
            Ok(()) => {
                tracing::info!(to = %self.target, "store upgrade completed");
                Ok(self.set_state(UpgradeState::CleanedUp))
            }
            Err(e) => {
                self.set_state(UpgradeState::Failed);
                tracing::error!(error = %e, "store upgrade failed");
                Err(e)
            }
        }
    }

    /// Runs [`migrate_if_needed`](Self::migrate_if_needed) on a named
    /// background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(
        self: Arc<Self>,
        layout: DatabaseLayout,
    ) -> CoreResult<JoinHandle<CoreResult<UpgradeState>>> {
        let handle = thread::Builder::new()
            .name(UPGRADE_THREAD_NAME.to_string())
            .spawn(move || self.migrate_if_needed(&layout))?;
        Ok(handle)
    }

    fn run(&self, layout: &DatabaseLayout, from_id: &StoreId, from: &StoreVersion) -> CoreResult<()> {
        let fs = self.fs.as_ref();
        let migration = layout.migration_layout();
        let migration_dir = migration.root();
        let from_label = from.to_string();
        let to_label = self.target.to_string();

        let resume_moves = match MigrationStatus::read(fs, migration_dir)? {
            Some(status)
                if status.phase == MigrationPhaseMarker::Moving && status.from == from_label =>
            {
                if !status.is_upgrade(&from_label, &to_label) {
                    return Err(CoreError::illegal_state(format!(
                        "upgrade from {} to {} was interrupted while moving files and must \
                         finish before upgrading to {to_label}",
                        status.from, status.to
                    )));
                }
                true
            }
            _ => false,
        };

        self.progress.started(self.participants.len());
        if resume_moves {
            tracing::info!(from = %from_label, "resuming interrupted upgrade at file moves");
        } else {
            fs.delete_recursively(migration_dir)?;
            fs.mkdirs(migration_dir)?;
            MigrationStatus::new(MigrationPhaseMarker::Migrating, &from_label, &to_label)
                .write(fs, migration_dir)?;
            self.set_state(UpgradeState::Migrating);

            for participant in &self.participants {
                self.check_cancelled(participant.as_ref())?;
                tracing::info!(participant = participant.name(), "migrating");
                let mut section = self.progress.start_section(participant.name());
                participant
                    .migrate(layout, &migration, section.as_mut(), from, &self.target)
                    .map_err(|e| {
                        CoreError::participant_failure(participant.name(), MigrationPhase::Migrate, e)
                    })?;
                section.completed();
            }

            MigrationStatus::new(MigrationPhaseMarker::Moving, &from_label, &to_label)
                .write(fs, migration_dir)?;
        }
        self.set_state(UpgradeState::Migrated);

        for participant in &self.participants {
            self.check_cancelled(participant.as_ref())?;
            tracing::info!(participant = participant.name(), "moving migrated files");
            participant
                .move_migrated_files(&migration, layout, &from_label, &to_label)
                .map_err(|e| {
                    CoreError::participant_failure(participant.name(), MigrationPhase::MoveFiles, e)
                })?;
        }
        self.set_state(UpgradeState::FilesMoved);

        if let Some(check) = &self.consistency_check {
            check.check(layout).map_err(|e| match e {
                CoreError::InconsistentStore { .. } => e,
                other => CoreError::inconsistent_store(other.to_string()),
            })?;
        }

        self.version_check
            .record_version(layout, &from_id.with_version(&self.target))?;

        for participant in &self.participants {
            participant.cleanup(&migration).map_err(|e| {
                CoreError::participant_failure(participant.name(), MigrationPhase::Cleanup, e)
            })?;
        }
        fs.delete_recursively(migration_dir)?;
        self.progress.completed();
        Ok(())
    }

    fn check_cancelled(&self, next: &dyn StoreMigrationParticipant) -> CoreResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(CoreError::UpgradeCancelled {
                next_participant: next.name().to_string(),
            });
        }
        Ok(())
    }

    fn remove_stray_migration_directory(&self, layout: &DatabaseLayout) -> CoreResult<()> {
        let dir = layout.migration_directory();
        if self.fs.is_directory(&dir) {
            tracing::warn!(path = %dir.display(), "removing leftover migration directory");
            self.fs.delete_recursively(&dir)?;
        }
        Ok(())
    }

    fn set_state(&self, state: UpgradeState) -> UpgradeState {
        *self.state.lock() = state;
        state
    }
}

impl std::fmt::Debug for StoreUpgrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreUpgrader")
            .field("target", &self.target)
            .field("participants", &self.participant_names())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
