//! The log header value.

use super::format::{LogFormat, BASE_TX_CHECKSUM, UNKNOWN_LOG_SEGMENT_SIZE};
use crate::position::LogPosition;
use crate::store_id::StoreId;
use std::fmt;

/// Metadata at the start of every log file.
///
/// A header is immutable. Its start position always points just past the
/// header, at the first byte of record data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHeader {
    format: LogFormat,
    position: LogPosition,
    last_committed_tx_id: u64,
    store_id: Option<StoreId>,
    segment_size: u32,
    checksum: u32,
}

impl LogHeader {
    /// Creates a header of `format` for log file `log_version`.
    #[must_use]
    pub fn new(
        format: LogFormat,
        log_version: u64,
        last_committed_tx_id: u64,
        store_id: Option<StoreId>,
        segment_size: u32,
        checksum: u32,
    ) -> Self {
        Self {
            format,
            position: LogPosition::new(log_version, format.header_size() as u64),
            last_committed_tx_id,
            store_id,
            segment_size,
            checksum,
        }
    }

    /// Creates a current-format header for a brand new log file.
    #[must_use]
    pub fn for_new_file(
        log_version: u64,
        last_committed_tx_id: u64,
        store_id: Option<StoreId>,
    ) -> Self {
        Self::new(
            LogFormat::CURRENT,
            log_version,
            last_committed_tx_id,
            store_id,
            UNKNOWN_LOG_SEGMENT_SIZE,
            BASE_TX_CHECKSUM,
        )
    }

    /// Returns the header format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// Returns the position of the first record byte.
    #[must_use]
    pub const fn start_position(&self) -> LogPosition {
        self.position
    }

    /// Returns the log version this header belongs to.
    #[must_use]
    pub const fn log_version(&self) -> u64 {
        self.position.log_version
    }

    /// Returns the last transaction committed before this file started.
    #[must_use]
    pub const fn last_committed_tx_id(&self) -> u64 {
        self.last_committed_tx_id
    }

    /// Returns the store identity, if the format records one.
    #[must_use]
    pub fn store_id(&self) -> Option<&StoreId> {
        self.store_id.as_ref()
    }

    /// Returns the segment size.
    #[must_use]
    pub const fn segment_size(&self) -> u32 {
        self.segment_size
    }

    /// Returns the starting checksum of the file.
    #[must_use]
    pub const fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Returns this header rewritten into `format`, keeping every field.
    #[must_use]
    pub fn with_format(&self, format: LogFormat) -> Self {
        Self::new(
            format,
            self.log_version(),
            self.last_committed_tx_id,
            self.store_id.clone(),
            self.segment_size,
            self.checksum,
        )
    }

    /// Returns this header carrying a different store id.
    #[must_use]
    pub fn with_store_id(&self, store_id: Option<StoreId>) -> Self {
        Self {
            store_id,
            ..self.clone()
        }
    }
}

impl fmt::Display for LogHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogHeader{{format={}, startPosition={}, lastCommittedTxId={}, storeId=",
            self.format, self.position, self.last_committed_tx_id
        )?;
        match &self.store_id {
            Some(id) => write!(f, "{id}")?,
            None => f.write_str("none")?,
        }
        write!(
            f,
            ", segmentSize={}, checksum={:#010x}}}",
            self.segment_size, self.checksum
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_offset_follows_format() {
        for format in LogFormat::ALL {
            let header = LogHeader::new(format, 3, 7, None, 0, 0);
            assert_eq!(
                header.start_position(),
                LogPosition::new(3, format.header_size() as u64)
            );
        }
    }

    #[test]
    fn new_file_header_uses_defaults() {
        let header = LogHeader::for_new_file(2, 42, None);
        assert_eq!(header.format(), LogFormat::CURRENT);
        assert_eq!(header.segment_size(), UNKNOWN_LOG_SEGMENT_SIZE);
        assert_eq!(header.checksum(), BASE_TX_CHECKSUM);
        assert_eq!(header.last_committed_tx_id(), 42);
    }

    #[test]
    fn with_format_moves_start_position() {
        let v6 = LogHeader::new(LogFormat::V6, 4, 9, None, 0, BASE_TX_CHECKSUM);
        let v9 = v6.with_format(LogFormat::V9);
        assert_eq!(v9.start_position().byte_offset, 144);
        assert_eq!(v9.log_version(), 4);
        assert_eq!(v9.last_committed_tx_id(), 9);
    }

    #[test]
    fn display_mentions_version() {
        let header = LogHeader::for_new_file(5, 1000, None);
        let text = header.to_string();
        assert!(text.contains("logVersion=5"));
        assert!(text.contains("lastCommittedTxId=1000"));
    }
}
