//! Migration of transaction log headers.

use super::participant::StoreMigrationParticipant;
use super::progress::{ProgressReporter, SilentProgressReporter};
use super::store_files::{copy_file_range, relocate};
use crate::error::CoreResult;
use crate::layout::DatabaseLayout;
use crate::log::{read_log_header, write_log_header, LogFilesHelper, LogFormat, NullTracer};
use crate::metadata::MetadataStore;
use crate::store_id::StoreVersion;
use std::sync::Arc;
use txlog_storage::FileSystem;

/// Name of the log migration participant.
pub const LOGS_PARTICIPANT_NAME: &str = "transaction logs";

/// Rewrites every log file header into the current format.
///
/// Record data after the header is copied unchanged. Files without a
/// complete header are left alone; the allocator rewrites them on creation.
#[derive(Debug, Clone)]
pub struct LogsMigrator {
    fs: Arc<dyn FileSystem>,
}

impl LogsMigrator {
    /// Creates a log migrator using `fs`.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl StoreMigrationParticipant for LogsMigrator {
    fn name(&self) -> &str {
        LOGS_PARTICIPANT_NAME
    }

    fn migrate(
        &self,
        source: &DatabaseLayout,
        migration: &DatabaseLayout,
        progress: &mut dyn ProgressReporter,
        _from: &StoreVersion,
        to: &StoreVersion,
    ) -> CoreResult<()> {
        let fs = self.fs.as_ref();
        let source_logs = LogFilesHelper::new(source.transaction_logs_directory());
        let migrated_logs = LogFilesHelper::new(migration.transaction_logs_directory());
        let store_id = MetadataStore::new(source.clone())
            .read(fs)?
            .map(|id| id.with_version(to));

        let versions = source_logs.existing_versions(fs)?;
        progress.start(versions.len() as u64);
        fs.mkdirs(migrated_logs.directory())?;

        for version in versions {
            let path = source_logs.log_file_for_version(version);
            let channel = fs.read(&path)?;
            let Some(header) = read_log_header(channel.as_ref(), false, Some(&path))? else {
                progress.progress(1);
                continue;
            };
            let migrated = header
                .with_format(LogFormat::CURRENT)
                .with_store_id(store_id.clone());
            if header == migrated {
                progress.progress(1);
                continue;
            }

            let target = migrated_logs.log_file_for_version(version);
            copy_file_range(
                fs,
                &path,
                header.format().header_size() as u64,
                &target,
                LogFormat::CURRENT.header_size() as u64,
                // Log progress counts files, not bytes.
                &mut SilentProgressReporter,
                &NullTracer,
            )?;
            let mut channel = fs.write(&target)?;
            write_log_header(channel.as_mut(), &migrated)?;
            channel.sync()?;

            tracing::debug!(
                version,
                from = %header.format(),
                to = %LogFormat::CURRENT,
                "migrated log header"
            );
            progress.progress(1);
        }
        Ok(())
    }

    fn move_migrated_files(
        &self,
        migration: &DatabaseLayout,
        source: &DatabaseLayout,
        _from: &str,
        _to: &str,
    ) -> CoreResult<()> {
        let fs = self.fs.as_ref();
        let migrated_logs = LogFilesHelper::new(migration.transaction_logs_directory());
        let migrated = migrated_logs.log_files(fs)?;
        if migrated.is_empty() {
            return Ok(());
        }
        for file in &migrated {
            let target = relocate(file, migration.root(), source.root())?;
            fs.rename_file(file, &target)?;
        }
        fs.sync_directory(&source.transaction_logs_directory())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_id::StoreId;
    use txlog_storage::EphemeralFileSystem;

    fn v6_file(log_version: u64, tx: u64, body: &[u8]) -> Vec<u8> {
        let mut bytes = (log_version | (6u64 << 56)).to_be_bytes().to_vec();
        bytes.extend_from_slice(&tx.to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn legacy_headers_rewritten_and_moved() {
        let fs = EphemeralFileSystem::new();
        let source = DatabaseLayout::new("/db");
        let migration = source.migration_layout();
        let logs = LogFilesHelper::new(source.transaction_logs_directory());
        let from = StoreVersion::new("record", "aligned", 1, 0);
        let to = StoreVersion::new("record", "aligned", 2, 0);
        MetadataStore::new(source.clone())
            .write(&fs, &StoreId::new(5, 6, "record", "aligned", 1, 0))
            .unwrap();
        fs.put_file(&logs.log_file_for_version(0), v6_file(0, 10, b"body-0"));
        fs.put_file(&logs.log_file_for_version(1), v6_file(1, 20, b"body-1"));

        let migrator = LogsMigrator::new(Arc::new(fs.clone()));
        migrator
            .migrate(&source, &migration, &mut SilentProgressReporter, &from, &to)
            .unwrap();

        // Source untouched until the move.
        let original = fs.file_contents(&logs.log_file_for_version(1)).unwrap();
        assert_eq!(original, v6_file(1, 20, b"body-1"));

        migrator
            .move_migrated_files(&migration, &source, "from", "to")
            .unwrap();

        let moved = fs.read(&logs.log_file_for_version(1)).unwrap();
        let header = read_log_header(moved.as_ref(), true, None).unwrap().unwrap();
        assert_eq!(header.format(), LogFormat::CURRENT);
        assert_eq!(header.last_committed_tx_id(), 20);
        assert_eq!(header.store_id().map(StoreId::store_version), Some(to));
        assert_eq!(&moved.read_exact_at(144, 6).unwrap(), b"body-1");

        // Rerunning the move is a no-op.
        migrator
            .move_migrated_files(&migration, &source, "from", "to")
            .unwrap();
    }

    #[test]
    fn unwritten_log_file_skipped() {
        let fs = EphemeralFileSystem::new();
        let source = DatabaseLayout::new("/db");
        let migration = source.migration_layout();
        let logs = LogFilesHelper::new(source.transaction_logs_directory());
        fs.put_file(&logs.log_file_for_version(0), vec![0u8; 32]);

        let version = StoreVersion::new("record", "aligned", 2, 0);
        LogsMigrator::new(Arc::new(fs.clone()))
            .migrate(&source, &migration, &mut SilentProgressReporter, &version, &version)
            .unwrap();

        let migrated = LogFilesHelper::new(migration.transaction_logs_directory());
        assert!(!fs.file_exists(&migrated.log_file_for_version(0)));
    }
}
