//! Store upgrades.
//!
//! An upgrade converts every artifact of a store (transaction logs, record
//! files, indexes, counts) from the format on disk to a target format. Each
//! artifact kind is handled by a [`StoreMigrationParticipant`]; the
//! [`StoreUpgrader`] runs them through a two-phase protocol so that a crash
//! at any point leaves a store that the next attempt can finish:
//!
//! - **migrate**: participants write converted copies into the migration
//!   directory, never touching the source
//! - **move**: participants rename the converted copies over the source
//!
//! The store's version marker is only updated after every move succeeded.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use txlog_core::migration::{ArtifactKind, MetadataVersionCheck, StoreFilesMigrator, StoreUpgrader};
//! use txlog_core::{Config, DatabaseLayout, StoreVersion};
//! use txlog_storage::{EphemeralFileSystem, FileSystem};
//!
//! let fs: Arc<dyn FileSystem> = Arc::new(EphemeralFileSystem::new());
//! let check = Arc::new(MetadataVersionCheck::new(Arc::clone(&fs)));
//! let target = StoreVersion::new("record", "aligned", 2, 0);
//!
//! let mut upgrader = StoreUpgrader::new(Arc::clone(&fs), Config::new().allow_upgrade(true), target, check);
//! upgrader.add_participant(Arc::new(StoreFilesMigrator::new(Arc::clone(&fs), ArtifactKind::Records)));
//! upgrader.migrate_if_needed(&DatabaseLayout::new("/db")).unwrap();
//! ```

mod logs;
mod participant;
mod progress;
mod status;
mod store_files;
mod upgrader;
mod version_check;

pub use logs::{LogsMigrator, LOGS_PARTICIPANT_NAME};
pub use participant::StoreMigrationParticipant;
pub use progress::{
    LoggingProgressMonitor, MigrationProgressMonitor, ProgressReporter, SilentProgressMonitor,
    SilentProgressReporter,
};
pub use status::{MigrationPhaseMarker, MigrationStatus, MIGRATION_STATUS_FILE};
pub use store_files::{ArtifactKind, StoreFilesMigrator, COPY_CHUNK_SIZE};
pub use upgrader::{ConsistencyCheck, StoreUpgrader, UpgradeCancellation, UpgradeState};
pub use version_check::{MetadataVersionCheck, StoreVersionCheck, UpgradeCheck};
