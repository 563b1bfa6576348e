//! On-disk layout of a store.
//!
//! ```text
//! <root>/
//! ├── metadata.store        # Version marker and store id
//! ├── nodes.store           # Record files
//! ├── relationships.store
//! ├── properties.store
//! ├── nodes.store.id        # ID stores, one per record file
//! ├── relationships.store.id
//! ├── properties.store.id
//! ├── counts.store          # Counts store
//! ├── indexes/              # Index files
//! ├── transactions/         # transaction.db.0, transaction.db.1, ...
//! └── upgrade_migration/    # Only present while an upgrade runs
//! ```

use std::path::{Path, PathBuf};

/// Metadata store file name.
const METADATA_FILE: &str = "metadata.store";

/// Transaction logs directory name.
const TRANSACTIONS_DIR: &str = "transactions";

/// Record store file names.
const RECORD_FILES: [&str; 3] = ["nodes.store", "relationships.store", "properties.store"];

/// Suffix of the ID store kept next to each record file.
const ID_FILE_SUFFIX: &str = ".id";

/// Counts store file name.
const COUNTS_FILE: &str = "counts.store";

/// Index directory name.
const INDEXES_DIR: &str = "indexes";

/// Migration directory name.
const MIGRATION_DIR: &str = "upgrade_migration";

/// Paths of every artifact of one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseLayout {
    root: PathBuf,
}

impl DatabaseLayout {
    /// Creates the layout of the store at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of the metadata store.
    #[must_use]
    pub fn metadata_store(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    /// Returns the transaction logs directory.
    #[must_use]
    pub fn transaction_logs_directory(&self) -> PathBuf {
        self.root.join(TRANSACTIONS_DIR)
    }

    /// Returns the record store files.
    #[must_use]
    pub fn record_files(&self) -> Vec<PathBuf> {
        RECORD_FILES.iter().map(|f| self.root.join(f)).collect()
    }

    /// Returns the ID store files, one per record file.
    #[must_use]
    pub fn id_files(&self) -> Vec<PathBuf> {
        RECORD_FILES
            .iter()
            .map(|f| self.root.join(format!("{f}{ID_FILE_SUFFIX}")))
            .collect()
    }

    /// Returns the counts store file.
    #[must_use]
    pub fn counts_store(&self) -> PathBuf {
        self.root.join(COUNTS_FILE)
    }

    /// Returns the index directory.
    #[must_use]
    pub fn indexes_directory(&self) -> PathBuf {
        self.root.join(INDEXES_DIR)
    }

    /// Returns the directory migrated artifacts are written to.
    #[must_use]
    pub fn migration_directory(&self) -> PathBuf {
        self.root.join(MIGRATION_DIR)
    }

    /// Returns the layout rooted at the migration directory.
    #[must_use]
    pub fn migration_layout(&self) -> DatabaseLayout {
        DatabaseLayout::new(self.migration_directory())
    }
}
