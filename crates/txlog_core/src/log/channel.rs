//! A log file channel with a cursor and checksum framing.

use super::format::LogFormat;
use super::tracer::DatabaseTracer;
use crate::checksum::{Checksum, ChecksumReader, ChecksumWriter, CHECKSUM_SIZE};
use crate::error::{CoreError, CoreResult};
use crate::position::LogPosition;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use txlog_storage::StoreChannel;

/// A channel onto one log file, bound to its log version and header format.
///
/// The channel keeps a cursor that starts just past the header. Writes and
/// reads happen at the cursor and feed the running checksum. Closing the
/// channel (or dropping it) reports a close event to the tracer.
pub struct LogVersionedChannel {
    inner: Box<dyn StoreChannel>,
    path: PathBuf,
    log_version: u64,
    format: LogFormat,
    cursor: u64,
    checksum: Checksum,
    tracer: Arc<dyn DatabaseTracer>,
}

impl LogVersionedChannel {
    pub(crate) fn new(
        inner: Box<dyn StoreChannel>,
        path: PathBuf,
        log_version: u64,
        format: LogFormat,
        tracer: Arc<dyn DatabaseTracer>,
    ) -> Self {
        Self {
            inner,
            path,
            log_version,
            format,
            cursor: format.header_size() as u64,
            checksum: Checksum::new(),
            tracer,
        }
    }

    /// Returns the log version of the file.
    #[must_use]
    pub fn log_version(&self) -> u64 {
        self.log_version
    }

    /// Returns the header format of the file.
    #[must_use]
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Returns the path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cursor position.
    #[must_use]
    pub fn position(&self) -> LogPosition {
        LogPosition::new(self.log_version, self.cursor)
    }

    /// Moves the cursor to `offset`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `offset` lies inside the header.
    pub fn set_position(&mut self, offset: u64) -> CoreResult<()> {
        let header_size = self.format.header_size() as u64;
        if offset < header_size {
            return Err(CoreError::invalid_argument(format!(
                "offset {offset} is inside the {header_size}-byte header"
            )));
        }
        self.cursor = offset;
        Ok(())
    }

    /// Writes `data` at the cursor.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn put(&mut self, data: &[u8]) -> CoreResult<()> {
        self.inner.write_at(self.cursor, data)?;
        self.checksum.update(data);
        self.cursor += data.len() as u64;
        Ok(())
    }

    /// Writes a big-endian `u32` at the cursor.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn put_u32(&mut self, value: u32) -> CoreResult<()> {
        self.put(&value.to_be_bytes())
    }

    /// Writes a big-endian `u64` at the cursor.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn put_u64(&mut self, value: u64) -> CoreResult<()> {
        self.put(&value.to_be_bytes())
    }

    /// Reads exactly `len` bytes at the cursor.
    ///
    /// # Errors
    ///
    /// Returns a `ReadPastEnd` storage error if the file is too short.
    pub fn get(&mut self, len: usize) -> CoreResult<Vec<u8>> {
        let data = self.inner.read_exact_at(self.cursor, len)?;
        self.checksum.update(&data);
        self.cursor += len as u64;
        Ok(data)
    }

    /// Returns the size of the underlying file.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.inner.size()?)
    }

    /// Flushes buffered writes.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn flush(&mut self) -> CoreResult<()> {
        Ok(self.inner.flush()?)
    }

    /// Makes all writes durable.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn sync(&mut self) -> CoreResult<()> {
        Ok(self.inner.sync()?)
    }

    /// Closes the channel.
    pub fn close(self) {}
}

impl ChecksumWriter for LogVersionedChannel {
    fn begin_checksum_for_writing(&mut self) {
        self.checksum.reset();
    }

    fn put_checksum(&mut self) -> CoreResult<u32> {
        let value = self.checksum.value();
        self.inner.write_at(self.cursor, &value.to_le_bytes())?;
        self.cursor += CHECKSUM_SIZE as u64;
        self.checksum.reset();
        Ok(value)
    }
}

impl ChecksumReader for LogVersionedChannel {
    fn begin_checksum_for_reading(&mut self) {
        self.checksum.reset();
    }

    fn end_checksum_and_validate(&mut self) -> CoreResult<u32> {
        let actual = self.checksum.value();
        let trailer = self.inner.read_exact_at(self.cursor, CHECKSUM_SIZE)?;
        let mut raw = [0u8; CHECKSUM_SIZE];
        raw.copy_from_slice(&trailer);
        let expected = u32::from_le_bytes(raw);

        self.cursor += CHECKSUM_SIZE as u64;
        self.checksum.reset();
        if expected != actual {
            return Err(CoreError::ChecksumMismatch { expected, actual });
        }
        Ok(actual)
    }
}

impl Drop for LogVersionedChannel {
    fn drop(&mut self) {
        self.tracer.close_log_file();
    }
}

impl std::fmt::Debug for LogVersionedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogVersionedChannel")
            .field("path", &self.path)
            .field("log_version", &self.log_version)
            .field("format", &self.format)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::compute_checksum;
    use crate::log::tracer::{CountingDatabaseTracer, NullTracer};
    use txlog_storage::{EphemeralFileSystem, FileSystem, MemoryChannel, StorageError};

    fn channel_on(inner: Box<dyn StoreChannel>) -> LogVersionedChannel {
        LogVersionedChannel::new(
            inner,
            PathBuf::from("/db/transaction.db.0"),
            0,
            LogFormat::V9,
            Arc::new(NullTracer),
        )
    }

    #[test]
    fn cursor_starts_after_header() {
        let channel = channel_on(Box::new(MemoryChannel::new()));
        assert_eq!(channel.position(), LogPosition::new(0, 144));
    }

    #[test]
    fn trailer_follows_framed_data() {
        let fs = EphemeralFileSystem::new();
        let path = Path::new("/db/transaction.db.0");
        let mut channel = channel_on(fs.write(path).unwrap());

        channel.begin_checksum_for_writing();
        channel.put(b"record one").unwrap();
        channel.put_u64(7).unwrap();
        let value = channel.put_checksum().unwrap();

        let data = fs.file_contents(path).unwrap();
        let framed = &data[144..144 + 18];
        assert_eq!(value, compute_checksum(framed));
        assert_eq!(&data[162..166], &value.to_le_bytes());
        assert_eq!(channel.position().byte_offset, 166);
    }

    #[test]
    fn each_put_checksum_writes_one_trailer() {
        let mut channel = channel_on(Box::new(MemoryChannel::new()));
        channel.begin_checksum_for_writing();
        channel.put(b"a").unwrap();
        let first = channel.put_checksum().unwrap();
        channel.put(b"a").unwrap();
        let second = channel.put_checksum().unwrap();

        assert_eq!(first, second);
        assert_eq!(channel.position().byte_offset, 144 + 2 * (1 + 4));
    }

    #[test]
    fn reading_validates_trailer() {
        let fs = EphemeralFileSystem::new();
        let path = Path::new("/db/transaction.db.0");
        {
            let mut writer = channel_on(fs.write(path).unwrap());
            writer.begin_checksum_for_writing();
            writer.put(b"payload").unwrap();
            writer.put_checksum().unwrap();
        }

        let mut reader = channel_on(fs.read(path).unwrap());
        reader.begin_checksum_for_reading();
        assert_eq!(reader.get(7).unwrap(), b"payload");
        reader.end_checksum_and_validate().unwrap();
    }

    #[test]
    fn corruption_detected() {
        let fs = EphemeralFileSystem::new();
        let path = Path::new("/db/transaction.db.0");
        {
            let mut writer = channel_on(fs.write(path).unwrap());
            writer.begin_checksum_for_writing();
            writer.put(b"payload").unwrap();
            writer.put_checksum().unwrap();
        }
        let mut data = fs.file_contents(path).unwrap();
        data[146] ^= 0x01;
        fs.put_file(path, data);

        let mut reader = channel_on(fs.read(path).unwrap());
        reader.begin_checksum_for_reading();
        reader.get(7).unwrap();
        assert!(matches!(
            reader.end_checksum_and_validate(),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn truncated_trailer_is_read_past_end() {
        let fs = EphemeralFileSystem::new();
        let path = Path::new("/db/transaction.db.0");
        {
            let mut writer = channel_on(fs.write(path).unwrap());
            writer.begin_checksum_for_writing();
            writer.put(b"payload").unwrap();
            writer.put_checksum().unwrap();
        }
        let mut data = fs.file_contents(path).unwrap();
        data.truncate(data.len() - 2);
        fs.put_file(path, data);

        let mut reader = channel_on(fs.read(path).unwrap());
        reader.begin_checksum_for_reading();
        reader.get(7).unwrap();
        assert!(matches!(
            reader.end_checksum_and_validate(),
            Err(CoreError::Storage(StorageError::ReadPastEnd { .. }))
        ));
    }

    #[test]
    fn position_cannot_enter_header() {
        let mut channel = channel_on(Box::new(MemoryChannel::new()));
        assert!(channel.set_position(100).is_err());
        channel.set_position(200).unwrap();
        assert_eq!(channel.position().byte_offset, 200);
    }

    #[test]
    fn drop_reports_close() {
        let tracer = Arc::new(CountingDatabaseTracer::new());
        let channel = LogVersionedChannel::new(
            Box::new(MemoryChannel::new()),
            PathBuf::from("/x"),
            0,
            LogFormat::V9,
            tracer.clone(),
        );
        channel.close();
        assert_eq!(tracer.closed_files(), 1);
    }
}
