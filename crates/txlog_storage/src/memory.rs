//! In-memory file system for testing.

use crate::channel::StoreChannel;
use crate::error::{StorageError, StorageResult};
use crate::fs::FileSystem;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type FileData = Arc<RwLock<Vec<u8>>>;

/// A channel onto one in-memory file.
///
/// Channels opened on the same path share the file contents, so writes are
/// immediately visible to every other channel on that file.
///
/// # Example
///
/// ```rust
/// use txlog_storage::{MemoryChannel, StoreChannel};
///
/// let mut channel = MemoryChannel::new();
/// channel.write_at(0, b"test data").unwrap();
/// assert_eq!(channel.size().unwrap(), 9);
/// ```
#[derive(Debug)]
pub struct MemoryChannel {
    data: FileData,
    path: PathBuf,
    writable: bool,
}

impl MemoryChannel {
    /// Creates a new empty, writable, detached channel.
    #[must_use]
    pub fn new() -> Self {
        Self::with_data(Vec::new())
    }

    /// Creates a writable, detached channel with pre-existing contents.
    ///
    /// Useful for feeding hand-built byte layouts to readers.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            path: PathBuf::new(),
            writable: true,
        }
    }

    fn attached(data: FileData, path: &Path, writable: bool) -> Self {
        Self {
            data,
            path: path.to_path_buf(),
            writable,
        }
    }

    /// Returns a copy of the channel contents.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreChannel for MemoryChannel {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<usize> {
        let data = self.data.read();
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> StorageResult<()> {
        if !self.writable {
            return Err(StorageError::ReadOnly {
                path: self.path.clone(),
            });
        }
        let start = usize::try_from(offset).map_err(|_| {
            StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "offset exceeds addressable memory",
            ))
        })?;
        let end = start + bytes.len();

        let mut data = self.data.write();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn flush(&mut self) -> StorageResult<()> {
        // In-memory files have no pending writes
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if !self.writable {
            return Err(StorageError::ReadOnly {
                path: self.path.clone(),
            });
        }
        let mut data = self.data.write();
        let current_size = data.len() as u64;

        if new_size > current_size {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "cannot truncate to size {} which is greater than current size {}",
                    new_size, current_size
                ),
            )));
        }

        data.truncate(new_size as usize);
        Ok(())
    }

    fn preallocate(&mut self, len: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        if data.len() < len {
            data.resize(len, 0);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<PathBuf, FileData>,
    dirs: BTreeSet<PathBuf>,
}

impl Tree {
    fn add_dirs(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }
}

/// An in-memory file system.
///
/// Suitable for unit and integration tests. Clones share the same tree, so
/// a test can keep a handle while the code under test owns another.
///
/// Opening a file for writing implicitly creates its parent directories.
#[derive(Debug, Default, Clone)]
pub struct EphemeralFileSystem {
    tree: Arc<RwLock<Tree>>,
}

impl EphemeralFileSystem {
    /// Creates an empty file system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents of `path`, creating the file if needed.
    pub fn put_file(&self, path: &Path, contents: Vec<u8>) {
        let mut tree = self.tree.write();
        if let Some(parent) = path.parent() {
            tree.add_dirs(parent);
        }
        tree.files
            .insert(path.to_path_buf(), Arc::new(RwLock::new(contents)));
    }

    /// Returns a copy of the contents of `path`, if it exists.
    #[must_use]
    pub fn file_contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.tree
            .read()
            .files
            .get(path)
            .map(|data| data.read().clone())
    }
}

impl FileSystem for EphemeralFileSystem {
    fn file_exists(&self, path: &Path) -> bool {
        self.tree.read().files.contains_key(path)
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.tree.read().dirs.contains(path)
    }

    fn mkdirs(&self, path: &Path) -> StorageResult<()> {
        self.tree.write().add_dirs(path);
        Ok(())
    }

    fn write(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>> {
        let mut tree = self.tree.write();
        if let Some(parent) = path.parent() {
            tree.add_dirs(parent);
        }
        let data = Arc::clone(tree.files.entry(path.to_path_buf()).or_default());
        Ok(Box::new(MemoryChannel::attached(data, path, true)))
    }

    fn read(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>> {
        let tree = self.tree.read();
        let data = tree
            .files
            .get(path)
            .ok_or_else(|| StorageError::not_found(path))?;
        Ok(Box::new(MemoryChannel::attached(
            Arc::clone(data),
            path,
            false,
        )))
    }

    fn list_files(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        let tree = self.tree.read();
        let is_child = |p: &&PathBuf| p.parent() == Some(dir);
        let mut entries: Vec<PathBuf> = tree
            .files
            .keys()
            .filter(is_child)
            .chain(tree.dirs.iter().filter(is_child))
            .cloned()
            .collect();
        entries.sort();
        entries.dedup();
        Ok(entries)
    }

    fn rename_file(&self, from: &Path, to: &Path) -> StorageResult<()> {
        let mut tree = self.tree.write();
        let data = tree
            .files
            .remove(from)
            .ok_or_else(|| StorageError::not_found(from))?;
        if let Some(parent) = to.parent() {
            tree.add_dirs(parent);
        }
        tree.files.insert(to.to_path_buf(), data);
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> StorageResult<()> {
        self.tree.write().files.remove(path);
        Ok(())
    }

    fn delete_recursively(&self, dir: &Path) -> StorageResult<()> {
        let mut tree = self.tree.write();
        tree.files.retain(|p, _| !p.starts_with(dir));
        tree.dirs.retain(|p| !p.starts_with(dir));
        Ok(())
    }

    fn file_size(&self, path: &Path) -> StorageResult<u64> {
        self.tree
            .read()
            .files
            .get(path)
            .map(|data| data.read().len() as u64)
            .ok_or_else(|| StorageError::not_found(path))
    }
}
