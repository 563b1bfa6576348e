//! Test fixtures and store helpers.
//!
//! Provides builders that lay out stores in older formats and helpers to
//! compare store contents before and after an upgrade.

use crate::legacy::encode_legacy_header;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;
use txlog_core::migration::COPY_CHUNK_SIZE;
use txlog_core::{DatabaseLayout, LogFilesHelper, LogFormat, MetadataStore, StoreId, StoreVersion};
use txlog_storage::{DefaultFileSystem, FileSystem};

static LOGGING: Once = Once::new();

/// Installs a `tracing` subscriber that writes to the test output.
///
/// The filter is read from `RUST_LOG`. Safe to call from every test.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// The store version legacy fixtures are written in.
pub fn legacy_version() -> StoreVersion {
    StoreVersion::new("record", "aligned", 1, 0)
}

/// The store version upgrades in tests migrate to.
pub fn current_version() -> StoreVersion {
    StoreVersion::new("record", "aligned", 2, 0)
}

/// The store id legacy fixtures are stamped with.
pub fn legacy_store_id() -> StoreId {
    StoreId::new(1_600_000_000_000, 4242, "record", "aligned", 1, 0)
}

struct LegacyLog {
    version: u64,
    format: LogFormat,
    last_committed_tx_id: u64,
    body: Vec<u8>,
}

/// Builds a store whose logs use legacy header formats.
///
/// # Example
///
/// ```rust
/// use txlog_testkit::fixtures::LegacyStoreBuilder;
/// use txlog_core::LogFormat;
/// use txlog_storage::{EphemeralFileSystem, FileSystem};
///
/// let fs = EphemeralFileSystem::new();
/// let layout = LegacyStoreBuilder::new("/db")
///     .log_file(0, LogFormat::V7, 1, b"payload")
///     .build(&fs);
/// assert!(fs.file_exists(&layout.metadata_store()));
/// ```
pub struct LegacyStoreBuilder {
    layout: DatabaseLayout,
    store_id: Option<StoreId>,
    logs: Vec<LegacyLog>,
    record_files: bool,
    id_files: bool,
    counts_store: bool,
    index_files: Vec<(String, Vec<u8>)>,
}

impl LegacyStoreBuilder {
    /// Starts a store at `root` stamped with [`legacy_store_id`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: DatabaseLayout::new(root),
            store_id: Some(legacy_store_id()),
            logs: Vec::new(),
            record_files: false,
            id_files: false,
            counts_store: false,
            index_files: Vec::new(),
        }
    }

    /// Overrides the store id written to the metadata store.
    pub fn with_store_id(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    /// Writes no metadata store at all.
    pub fn without_metadata(mut self) -> Self {
        self.store_id = None;
        self
    }

    /// Adds log file `version` with a `format` header followed by `body`.
    pub fn log_file(
        mut self,
        version: u64,
        format: LogFormat,
        last_committed_tx_id: u64,
        body: &[u8],
    ) -> Self {
        self.logs.push(LegacyLog {
            version,
            format,
            last_committed_tx_id,
            body: body.to_vec(),
        });
        self
    }

    /// Adds node, relationship and property record files.
    pub fn with_record_files(mut self) -> Self {
        self.record_files = true;
        self
    }

    /// Adds the ID stores. ID store `i` holds `i` full copy chunks plus
    /// eight bytes, so copying all of them takes six chunks.
    pub fn with_id_files(mut self) -> Self {
        self.id_files = true;
        self
    }

    /// Adds a counts store.
    pub fn with_counts_store(mut self) -> Self {
        self.counts_store = true;
        self
    }

    /// Adds a file to the index directory. `name` may contain
    /// subdirectories.
    pub fn with_index_file(mut self, name: &str, contents: &[u8]) -> Self {
        self.index_files.push((name.to_string(), contents.to_vec()));
        self
    }

    /// Writes the store through `fs` and returns its layout.
    pub fn build(self, fs: &dyn FileSystem) -> DatabaseLayout {
        fs.mkdirs(self.layout.root()).expect("Failed to create store root");
        if let Some(store_id) = &self.store_id {
            MetadataStore::new(self.layout.clone())
                .write(fs, store_id)
                .expect("Failed to write metadata store");
        }

        let logs = LogFilesHelper::new(self.layout.transaction_logs_directory());
        fs.mkdirs(logs.directory()).expect("Failed to create logs directory");
        for log in &self.logs {
            let store_id = self.store_id.as_ref().filter(|_| log.format.has_store_id());
            let mut data = encode_legacy_header(
                log.format,
                log.version,
                log.last_committed_tx_id,
                store_id,
                256,
                0x1234_ABCD,
            );
            data.extend_from_slice(&log.body);
            write_file(fs, &logs.log_file_for_version(log.version), &data);
        }

        if self.record_files {
            for (i, file) in self.layout.record_files().iter().enumerate() {
                let data = vec![i as u8 + 1; 1024 * (i + 1)];
                write_file(fs, file, &data);
            }
        }
        if self.id_files {
            for (i, file) in self.layout.id_files().iter().enumerate() {
                let data = vec![0xA0 + i as u8; COPY_CHUNK_SIZE * i + 8];
                write_file(fs, file, &data);
            }
        }
        if self.counts_store {
            write_file(fs, &self.layout.counts_store(), b"counts");
        }
        for (name, contents) in &self.index_files {
            write_file(fs, &self.layout.indexes_directory().join(name), contents);
        }
        self.layout
    }
}

fn write_file(fs: &dyn FileSystem, path: &Path, data: &[u8]) {
    if let Some(parent) = path.parent() {
        fs.mkdirs(parent).expect("Failed to create parent directory");
    }
    let mut channel = fs.write(path).expect("Failed to create file");
    channel.write_at(0, data).expect("Failed to write file");
    channel.sync().expect("Failed to sync file");
}

/// Returns the contents of every file below `root`, skipping `exclude`.
pub fn snapshot(
    fs: &dyn FileSystem,
    root: &Path,
    exclude: Option<&Path>,
) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs.list_files(&dir).expect("Failed to list directory") {
            if exclude.is_some_and(|e| entry.starts_with(e)) {
                continue;
            }
            if fs.is_directory(&entry) {
                pending.push(entry);
            } else {
                let data = fs.read_to_vec(&entry).expect("Failed to read file");
                files.insert(entry, data);
            }
        }
    }
    files
}

/// A store on the OS file system in a temporary directory.
pub struct TempStore {
    /// The file system.
    pub fs: Arc<DefaultFileSystem>,
    /// The store layout.
    pub layout: DatabaseLayout,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TempStore {
    /// Creates an empty store directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let layout = DatabaseLayout::new(temp_dir.path().join("graph.db"));
        Self {
            fs: Arc::new(DefaultFileSystem),
            layout,
            _temp_dir: temp_dir,
        }
    }

    /// Creates a store laid out by the builder `build` returns for the
    /// store root.
    pub fn with(build: impl FnOnce(&Path) -> LegacyStoreBuilder) -> Self {
        let store = Self::new();
        let layout = build(store.layout.root()).build(store.fs.as_ref());
        assert_eq!(layout, store.layout, "builder must use the given root");
        store
    }

    /// Returns the file system as a trait object.
    pub fn shared_fs(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}
