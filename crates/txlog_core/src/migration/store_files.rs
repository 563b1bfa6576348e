//! Migration of record, ID, index and counts store files.

use super::participant::StoreMigrationParticipant;
use super::progress::ProgressReporter;
use crate::error::{CoreError, CoreResult};
use crate::layout::DatabaseLayout;
use crate::log::{DatabaseTracer, NullTracer};
use crate::store_id::StoreVersion;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use txlog_storage::FileSystem;

/// Chunk size for copying store files. Each chunk is one pinned page.
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// The store artifacts handled by [`StoreFilesMigrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Node, relationship and property record files.
    Records,
    /// The ID stores of the record files.
    Ids,
    /// Files below the index directory, at any depth.
    Indexes,
    /// The counts store.
    Counts,
}

impl ArtifactKind {
    /// Returns the participant name for this artifact.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Records => "records",
            Self::Ids => "id stores",
            Self::Indexes => "indexes",
            Self::Counts => "counts",
        }
    }

    fn files(self, fs: &dyn FileSystem, layout: &DatabaseLayout) -> CoreResult<Vec<PathBuf>> {
        Ok(match self {
            Self::Records => layout.record_files(),
            Self::Ids => layout.id_files(),
            Self::Counts => vec![layout.counts_store()],
            Self::Indexes => files_below(fs, &layout.indexes_directory())?,
        })
    }
}

/// Lists every file below `dir`, descending into subdirectories.
fn files_below(fs: &dyn FileSystem, dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs.list_files(&dir)? {
            if fs.is_directory(&entry) {
                pending.push(entry);
            } else if fs.file_exists(&entry) {
                files.push(entry);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Copies one kind of store artifact into the migration layout and moves it
/// back over the source.
///
/// Every copied chunk is reported to the tracer as one page pin.
#[derive(Clone)]
pub struct StoreFilesMigrator {
    fs: Arc<dyn FileSystem>,
    kind: ArtifactKind,
    tracer: Arc<dyn DatabaseTracer>,
}

impl StoreFilesMigrator {
    /// Creates a migrator for `kind` with a [`NullTracer`].
    pub fn new(fs: Arc<dyn FileSystem>, kind: ArtifactKind) -> Self {
        Self {
            fs,
            kind,
            tracer: Arc::new(NullTracer),
        }
    }

    /// Replaces the tracer.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<dyn DatabaseTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Returns the artifact kind.
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }
}

impl StoreMigrationParticipant for StoreFilesMigrator {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn migrate(
        &self,
        source: &DatabaseLayout,
        migration: &DatabaseLayout,
        progress: &mut dyn ProgressReporter,
        _from: &StoreVersion,
        _to: &StoreVersion,
    ) -> CoreResult<()> {
        let fs = self.fs.as_ref();
        let files: Vec<PathBuf> = self
            .kind
            .files(fs, source)?
            .into_iter()
            .filter(|p| fs.file_exists(p))
            .collect();

        let mut total = 0;
        for file in &files {
            total += fs.file_size(file)?;
        }
        progress.start(total);

        for file in &files {
            let target = relocate(file, source.root(), migration.root())?;
            copy_file_range(fs, file, 0, &target, 0, progress, self.tracer.as_ref())?;
            tracing::debug!(path = %file.display(), "migrated store file");
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
        let mut changed = BTreeSet::new();
        for migrated in self.kind.files(fs, migration)? {
            if !fs.file_exists(&migrated) {
                continue;
            }
            let target = relocate(&migrated, migration.root(), source.root())?;
            if let Some(parent) = target.parent() {
                fs.mkdirs(parent)?;
                changed.insert(parent.to_path_buf());
            }
            fs.rename_file(&migrated, &target)?;
        }
        for dir in &changed {
            fs.sync_directory(dir)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for StoreFilesMigrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreFilesMigrator")
            .field("fs", &self.fs)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Maps `path` below `from_root` to the same relative path below `to_root`.
pub(crate) fn relocate(path: &Path, from_root: &Path, to_root: &Path) -> CoreResult<PathBuf> {
    let relative = path.strip_prefix(from_root).map_err(|_| {
        CoreError::invalid_argument(format!(
            "{} is not below {}",
            path.display(),
            from_root.display()
        ))
    })?;
    Ok(to_root.join(relative))
}

/// Copies `from[from_offset..]` to `to[to_offset..]` in chunks, reporting
/// copied bytes. `to` is created or truncated first. Each chunk is pinned
/// on `tracer` while it is copied.
pub(crate) fn copy_file_range(
    fs: &dyn FileSystem,
    from: &Path,
    from_offset: u64,
    to: &Path,
    to_offset: u64,
    progress: &mut dyn ProgressReporter,
    tracer: &dyn DatabaseTracer,
) -> CoreResult<u64> {
    let source = fs.read(from)?;
    let size = source.size()?;
    if let Some(parent) = to.parent() {
        fs.mkdirs(parent)?;
    }
    let mut target = fs.write(to)?;
    target.truncate(0)?;

    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut read_at = from_offset;
    let mut write_at = to_offset;
    while read_at < size {
        let _page = tracer.pin_page();
        let n = source.read_at(read_at, &mut buf)?;
        if n == 0 {
            break;
        }
        target.write_at(write_at, &buf[..n])?;
        read_at += n as u64;
        write_at += n as u64;
        progress.progress(n as u64);
    }
    target.sync()?;
    Ok(read_at.saturating_sub(from_offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::CountingDatabaseTracer;
    use crate::migration::progress::SilentProgressReporter;
    use txlog_storage::EphemeralFileSystem;

    fn versions() -> (StoreVersion, StoreVersion) {
        (
            StoreVersion::new("record", "aligned", 1, 0),
            StoreVersion::new("record", "aligned", 2, 0),
        )
    }

    struct Bytes(u64);

    impl ProgressReporter for Bytes {
        fn start(&mut self, _max: u64) {}
        fn progress(&mut self, add: u64) {
            self.0 += add;
        }
        fn completed(&mut self) {}
    }

    #[test]
    fn records_copied_then_moved() {
        let fs = EphemeralFileSystem::new();
        let source = DatabaseLayout::new("/db");
        let migration = source.migration_layout();
        let big = vec![7u8; COPY_CHUNK_SIZE * 2 + 10];
        fs.put_file(&source.record_files()[0], big.clone());
        fs.put_file(&source.record_files()[1], b"rels".to_vec());

        let migrator = StoreFilesMigrator::new(Arc::new(fs.clone()), ArtifactKind::Records);
        let (from, to) = versions();
        let mut progress = Bytes(0);
        migrator
            .migrate(&source, &migration, &mut progress, &from, &to)
            .unwrap();

        assert_eq!(progress.0, big.len() as u64 + 4);
        assert_eq!(fs.file_contents(&migration.record_files()[0]), Some(big.clone()));
        assert!(!fs.file_exists(&migration.record_files()[2]));

        migrator
            .move_migrated_files(&migration, &source, "a", "b")
            .unwrap();
        assert!(!fs.file_exists(&migration.record_files()[0]));
        assert_eq!(fs.file_contents(&source.record_files()[0]), Some(big));

        // A second move finds nothing left to do.
        migrator
            .move_migrated_files(&migration, &source, "a", "b")
            .unwrap();
        assert_eq!(fs.file_contents(&source.record_files()[1]).unwrap(), b"rels");
    }

    #[test]
    fn index_directory_files_migrated() {
        let fs = EphemeralFileSystem::new();
        let source = DatabaseLayout::new("/db");
        let migration = source.migration_layout();
        fs.put_file(&source.indexes_directory().join("label.idx"), b"idx".to_vec());

        let migrator = StoreFilesMigrator::new(Arc::new(fs.clone()), ArtifactKind::Indexes);
        let (from, to) = versions();
        migrator
            .migrate(&source, &migration, &mut SilentProgressReporter, &from, &to)
            .unwrap();
        assert!(fs.file_exists(&migration.indexes_directory().join("label.idx")));

        migrator
            .move_migrated_files(&migration, &source, "a", "b")
            .unwrap();
        assert_eq!(
            fs.file_contents(&source.indexes_directory().join("label.idx")).unwrap(),
            b"idx"
        );
    }

    #[test]
    fn nested_index_files_migrated() {
        let fs = EphemeralFileSystem::new();
        let source = DatabaseLayout::new("/db");
        let migration = source.migration_layout();
        let nested = Path::new("schema/provider-1/2/index-2");
        fs.put_file(&source.indexes_directory().join(nested), b"tree".to_vec());
        fs.put_file(&source.indexes_directory().join("top.idx"), b"top".to_vec());

        let migrator = StoreFilesMigrator::new(Arc::new(fs.clone()), ArtifactKind::Indexes);
        let (from, to) = versions();
        let mut progress = Bytes(0);
        migrator
            .migrate(&source, &migration, &mut progress, &from, &to)
            .unwrap();
        assert_eq!(progress.0, 7);
        assert_eq!(
            fs.file_contents(&migration.indexes_directory().join(nested)).unwrap(),
            b"tree"
        );

        fs.delete_recursively(&source.indexes_directory()).unwrap();
        migrator
            .move_migrated_files(&migration, &source, "a", "b")
            .unwrap();
        assert_eq!(
            fs.file_contents(&source.indexes_directory().join(nested)).unwrap(),
            b"tree"
        );
        assert!(!fs.file_exists(&migration.indexes_directory().join(nested)));
    }

    #[test]
    fn one_pin_per_copied_chunk() {
        let fs = EphemeralFileSystem::new();
        let source = DatabaseLayout::new("/db");
        let migration = source.migration_layout();
        let ids = source.id_files();
        fs.put_file(&ids[0], vec![1u8; 8]);
        fs.put_file(&ids[1], vec![2u8; COPY_CHUNK_SIZE]);
        fs.put_file(&ids[2], vec![3u8; COPY_CHUNK_SIZE * 2 + 1]);

        let tracer = Arc::new(CountingDatabaseTracer::new());
        let migrator = StoreFilesMigrator::new(Arc::new(fs.clone()), ArtifactKind::Ids)
            .with_tracer(Arc::clone(&tracer) as Arc<dyn DatabaseTracer>);
        let (from, to) = versions();
        migrator
            .migrate(&source, &migration, &mut SilentProgressReporter, &from, &to)
            .unwrap();

        assert_eq!(tracer.pins(), 1 + 1 + 3);
        assert_eq!(tracer.unpins(), tracer.pins());
        assert_eq!(
            fs.file_contents(&migration.id_files()[2]).unwrap().len(),
            COPY_CHUNK_SIZE * 2 + 1
        );
    }

    #[test]
    fn relocate_requires_prefix() {
        assert_eq!(
            relocate(Path::new("/db/a/b"), Path::new("/db"), Path::new("/m")).unwrap(),
            PathBuf::from("/m/a/b")
        );
        assert!(relocate(Path::new("/other/a"), Path::new("/db"), Path::new("/m")).is_err());
    }
}
