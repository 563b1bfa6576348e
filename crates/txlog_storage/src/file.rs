//! OS file system and file channels.

use crate::channel::StoreChannel;
use crate::error::{StorageError, StorageResult};
use crate::fs::FileSystem;
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A channel onto one OS file.
///
/// The size is always taken from file metadata, so a reader sees data
/// appended by a writer holding a different channel on the same file.
///
/// # Durability
///
/// - `flush()` calls `File::flush()` to push data to the OS
/// - `sync()` calls `File::sync_all()` to ensure data is on disk
#[derive(Debug)]
pub struct FileChannel {
    path: PathBuf,
    file: RwLock<File>,
    writable: bool,
}

impl FileChannel {
    /// Opens or creates a read-write channel at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            writable: true,
        })
    }

    /// Opens an existing file read-only.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::not_found(path)
            } else {
                StorageError::Io(e)
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            writable: false,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(StorageError::ReadOnly {
                path: self.path.clone(),
            })
        }
    }
}

impl StoreChannel for FileChannel {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        self.ensure_writable()?;
        if data.is_empty() {
            return Ok(());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.file.read().metadata()?.len())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.write().flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.write().sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.ensure_writable()?;
        let file = self.file.write();
        let size = file.metadata()?.len();

        if new_size > size {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "cannot truncate to size {} which is greater than current size {}",
                    new_size, size
                ),
            )));
        }

        file.set_len(new_size)?;
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn advise_sequential_access(&self) -> StorageResult<()> {
        use nix::fcntl::{posix_fadvise, PosixFadviseAdvice};
        use std::os::unix::io::AsRawFd;

        let file = self.file.read();
        posix_fadvise(
            file.as_raw_fd(),
            0,
            0,
            PosixFadviseAdvice::POSIX_FADV_SEQUENTIAL,
        )
        .map_err(io::Error::from)?;
        Ok(())
    }

    fn preallocate(&mut self, len: u64) -> StorageResult<()> {
        self.ensure_writable()?;
        self.file.write().allocate(len)?;
        Ok(())
    }
}

/// The OS file system.
///
/// # Example
///
/// ```no_run
/// use txlog_storage::{DefaultFileSystem, FileSystem};
/// use std::path::Path;
///
/// let fs = DefaultFileSystem::new();
/// let mut channel = fs.write(Path::new("data.bin")).unwrap();
/// channel.write_at(0, b"persistent data").unwrap();
/// channel.sync().unwrap();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFileSystem;

impl DefaultFileSystem {
    /// Creates a handle to the OS file system.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FileSystem for DefaultFileSystem {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn mkdirs(&self, path: &Path) -> StorageResult<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn write(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>> {
        Ok(Box::new(FileChannel::open(path)?))
    }

    fn read(&self, path: &Path) -> StorageResult<Box<dyn StoreChannel>> {
        Ok(Box::new(FileChannel::open_read_only(path)?))
    }

    fn list_files(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();
        Ok(entries)
    }

    fn rename_file(&self, from: &Path, to: &Path) -> StorageResult<()> {
        if !from.exists() {
            return Err(StorageError::not_found(from));
        }
        fs::rename(from, to)?;
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> StorageResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_recursively(&self, dir: &Path) -> StorageResult<()> {
        match fs::remove_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn file_size(&self, path: &Path) -> StorageResult<u64> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::not_found(path)),
            Err(e) => Err(e.into()),
        }
    }

    /// On Windows, directory fsync is not supported the way it is on Unix;
    /// NTFS journals metadata operations, so the sync is skipped there.
    #[cfg(unix)]
    fn sync_directory(&self, dir: &Path) -> StorageResult<()> {
        let dir = File::open(dir)?;
        dir.sync_all()?;
        Ok(())
    }
}
