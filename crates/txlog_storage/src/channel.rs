//! Store channel trait definition.

use crate::error::{StorageError, StorageResult};

/// A byte-addressable handle onto one stored file.
///
/// Channels are **opaque byte stores**. They do not understand log headers,
/// checksums or records; the log layer owns all format interpretation and
/// keeps its own read/write cursor on top of the positional operations here.
///
/// # Invariants
///
/// - `write_at` followed by `read_at` over the same range returns the bytes
///   written
/// - `read_at` never reads past `size()`; a short count means end of file
/// - `flush` pushes buffered writes to the OS, `sync` makes them durable
/// - Channels must be `Send + Sync` so readers can live on other threads
///
/// # Implementors
///
/// - [`super::FileChannel`] - OS files
/// - [`super::MemoryChannel`] - in-memory files of [`super::EphemeralFileSystem`]
pub trait StoreChannel: Send + Sync {
    /// Reads up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read, which is smaller than `buf.len()`
    /// only when the end of the channel was reached.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<usize>;

    /// Writes all of `data` starting at `offset`, extending the channel if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] for channels opened for reading, or
    /// an I/O error.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Returns the current size of the channel in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Flushes pending writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Truncates the channel to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` is greater than the current size or
    /// the truncation fails.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Hints that the channel will be read sequentially and should stay in
    /// the OS cache.
    ///
    /// The default does nothing; the hint never affects correctness.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejected the hint.
    fn advise_sequential_access(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Reserves `len` bytes of disk space for the channel.
    ///
    /// The default does nothing. Reserved space reads back as zeros.
    ///
    /// # Errors
    ///
    /// Returns an error if the space could not be reserved.
    fn preallocate(&mut self, _len: u64) -> StorageResult<()> {
        Ok(())
    }

    /// Reads exactly `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`] if fewer than `len` bytes are
    /// available.
    fn read_exact_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let read = self.read_at(offset, &mut buf)?;
        if read < len {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: self.size()?,
            });
        }
        Ok(buf)
    }
}
