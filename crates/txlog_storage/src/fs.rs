//! File system abstraction.

use crate::channel::StoreChannel;
use crate::error::StorageResult;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Suffix used for the temporary file of [`FileSystem::write_atomically`].
const ATOMIC_WRITE_SUFFIX: &str = ".tmp";

/// The file operations the log and migration layers need.
///
/// Implementations hand out [`StoreChannel`]s for individual files and
/// perform directory-level operations (listing, renaming, deleting).
///
/// # Implementors
///
/// - [`super::DefaultFileSystem`] - the OS file system
/// - [`super::EphemeralFileSystem`] - an in-memory file system for tests
pub trait FileSystem: Send + Sync + Debug {
    /// Returns true if a regular file exists at `path`.
    fn file_exists(&self, path: &Path) -> bool;

    /// Returns true if a directory exists at `path`.
    fn is_directory(&self, path: &Path) -> bool;

    /// Creates `path` and all missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    fn mkdirs(&self, path: &Path) -> StorageResult<()>;

    /// Opens `path` for reading and writing, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    fn write(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>>;

    /// Opens an existing file read-only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] when the file is missing.
    fn read(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>>;

    /// Lists the entries directly inside `dir`, sorted by path.
    ///
    /// A missing directory lists as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    fn list_files(&self, dir: &Path) -> StorageResult<Vec<PathBuf>>;

    /// Renames `from` to `to`, replacing `to` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if `from` is missing or the rename fails.
    fn rename_file(&self, from: &Path, to: &Path) -> StorageResult<()>;

    /// Deletes a single file. Deleting a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    fn delete_file(&self, path: &Path) -> StorageResult<()>;

    /// Deletes `dir` and everything below it. A missing directory is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn delete_recursively(&self, dir: &Path) -> StorageResult<()>;

    /// Returns the size of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing.
    fn file_size(&self, path: &Path) -> StorageResult<u64>;

    /// Makes directory entry changes (creates, renames, deletes) in `dir`
    /// durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be synced.
    fn sync_directory(&self, _dir: &Path) -> StorageResult<()> {
        Ok(())
    }

    /// Reads the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be read.
    fn read_to_vec(&self, path: &Path) -> StorageResult<Vec<u8>> {
        let channel = self.read(path)?;
        let size = usize::try_from(channel.size()?).unwrap_or(usize::MAX);
        channel.read_exact_at(0, size)
    }

    /// Replaces the contents of `path` with `data` so that a crash leaves
    /// either the old or the new contents.
    ///
    /// Uses write-then-rename:
    /// 1. Write to a temporary sibling file
    /// 2. Sync the temporary file
    /// 3. Rename it over `path`
    /// 4. Sync the parent directory
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails.
    fn write_atomically(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(ATOMIC_WRITE_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        {
            let mut channel = self.write(&temp_path)?;
            channel.truncate(0)?;
            channel.write_at(0, data)?;
            channel.sync()?;
        }

        self.rename_file(&temp_path, path)?;
        if let Some(parent) = path.parent() {
            self.sync_directory(parent)?;
        }
        Ok(())
    }
}
