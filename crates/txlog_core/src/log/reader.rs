//! Reading log headers.
//!
//! Three outcomes are kept apart:
//!
//! - **absent**: no header was ever written (empty or pre-allocated file),
//!   reported as `Ok(None)`
//! - **incomplete**: a header was started but is cut short, reported as
//!   `IncompleteHeader` when strict and as absent otherwise
//! - **unsupported**: the format byte is unknown, always an error

use super::format::{
    decode_log_format_version, decode_log_version, LogFormat, BASE_TX_CHECKSUM, BIGGEST_HEADER,
    ENCODED_VERSION_SIZE, UNKNOWN_LOG_SEGMENT_SIZE,
};
use super::header::LogHeader;
use crate::error::{CoreError, CoreResult};
use crate::store_id::{StoreId, STORE_ID_SERIALIZED_SIZE};
use bytes::Buf;
use std::path::Path;
use txlog_storage::{FileSystem, StoreChannel};

/// Decodes a header from the start of `bytes`.
///
/// # Errors
///
/// Returns `IncompleteHeader` for a short header in strict mode,
/// `UnsupportedFormat` for an unknown format byte, or `InvalidFormat` for
/// a malformed store id.
pub fn decode_log_header(
    bytes: &[u8],
    strict: bool,
    path: Option<&Path>,
) -> CoreResult<Option<LogHeader>> {
    if bytes.len() < ENCODED_VERSION_SIZE {
        return incomplete(strict, path, ENCODED_VERSION_SIZE, bytes.len());
    }

    let mut buf = bytes;
    let encoded = buf.get_u64();
    if encoded == 0 {
        // Never written, e.g. a pre-allocated file.
        return Ok(None);
    }

    let version_byte = decode_log_format_version(encoded);
    let format =
        LogFormat::from_version_byte(version_byte).ok_or_else(|| CoreError::UnsupportedFormat {
            version_byte,
            path: path.map(Path::to_path_buf),
        })?;
    if bytes.len() < format.header_size() {
        return incomplete(strict, path, format.header_size(), bytes.len());
    }

    let log_version = decode_log_version(encoded);
    let last_committed_tx_id = buf.get_u64();

    let header = match format {
        LogFormat::V6 | LogFormat::V7 => LogHeader::new(
            format,
            log_version,
            last_committed_tx_id,
            None,
            UNKNOWN_LOG_SEGMENT_SIZE,
            BASE_TX_CHECKSUM,
        ),
        LogFormat::V8 => {
            let store_id = StoreId::deserialize_fixed(&buf[..STORE_ID_SERIALIZED_SIZE])?;
            LogHeader::new(
                format,
                log_version,
                last_committed_tx_id,
                store_id,
                UNKNOWN_LOG_SEGMENT_SIZE,
                BASE_TX_CHECKSUM,
            )
        }
        LogFormat::V9 => {
            let store_id = StoreId::deserialize_fixed(&buf[..STORE_ID_SERIALIZED_SIZE])?;
            buf.advance(STORE_ID_SERIALIZED_SIZE);
            let segment_size = buf.get_u32();
            let checksum = buf.get_u32();
            LogHeader::new(
                format,
                log_version,
                last_committed_tx_id,
                store_id,
                segment_size,
                checksum,
            )
        }
    };
    Ok(Some(header))
}

fn incomplete(
    strict: bool,
    path: Option<&Path>,
    expected: usize,
    actual: usize,
) -> CoreResult<Option<LogHeader>> {
    if strict {
        Err(CoreError::incomplete_header(path, expected, actual))
    } else {
        Ok(None)
    }
}

/// Reads the header at the start of `channel`.
///
/// `path` is only used to name the file in errors.
///
/// # Errors
///
/// See [`decode_log_header`]; storage errors are propagated.
pub fn read_log_header<C: StoreChannel + ?Sized>(
    channel: &C,
    strict: bool,
    path: Option<&Path>,
) -> CoreResult<Option<LogHeader>> {
    let mut buf = [0u8; BIGGEST_HEADER];
    let read = channel.read_at(0, &mut buf)?;
    decode_log_header(&buf[..read], strict, path)
}

/// Reads the header of the log file at `path`, strictly.
///
/// # Errors
///
/// Returns `NoSuchFile` if the file is missing and `IncompleteHeader`,
/// naming the file, if it is too short.
pub fn read_log_header_from_file(
    fs: &dyn FileSystem,
    path: &Path,
) -> CoreResult<Option<LogHeader>> {
    let channel = fs.read(path).map_err(|e| {
        if e.is_not_found() {
            CoreError::NoSuchFile {
                path: path.to_path_buf(),
            }
        } else {
            e.into()
        }
    })?;
    read_log_header(channel.as_ref(), true, Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_storage::{EphemeralFileSystem, MemoryChannel};

    fn v6_bytes(log_version: u64, tx: u64) -> Vec<u8> {
        let mut bytes = (log_version | (6u64 << 56)).to_be_bytes().to_vec();
        bytes.extend_from_slice(&tx.to_be_bytes());
        bytes
    }

    #[test]
    fn single_byte_is_incomplete_when_strict() {
        let channel = MemoryChannel::with_data(vec![0xAF]);
        assert!(matches!(
            read_log_header(&channel, true, None),
            Err(CoreError::IncompleteHeader { actual: 1, .. })
        ));
        assert_eq!(read_log_header(&channel, false, None).unwrap(), None);
    }

    #[test]
    fn zeroed_prefix_is_absent_even_when_strict() {
        let channel = MemoryChannel::with_data(vec![0u8; 9]);
        assert_eq!(read_log_header(&channel, true, None).unwrap(), None);
    }

    #[test]
    fn unknown_format_byte_is_unsupported() {
        let mut bytes = vec![0u8; BIGGEST_HEADER];
        bytes[..8].copy_from_slice(&(1u64 | (42u64 << 56)).to_be_bytes());

        let err = decode_log_header(&bytes, false, None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnsupportedFormat {
                version_byte: 42,
                ..
            }
        ));
    }

    #[test]
    fn v6_header_decodes() {
        let header = decode_log_header(&v6_bytes(3, 77), true, None)
            .unwrap()
            .unwrap();
        assert_eq!(header.format(), LogFormat::V6);
        assert_eq!(header.log_version(), 3);
        assert_eq!(header.last_committed_tx_id(), 77);
        assert_eq!(header.start_position().byte_offset, 16);
        assert_eq!(header.store_id(), None);
        assert_eq!(header.checksum(), BASE_TX_CHECKSUM);
    }

    #[test]
    fn truncated_body_depends_on_strictness() {
        let mut bytes = v6_bytes(3, 77);
        bytes.truncate(12);

        assert_eq!(decode_log_header(&bytes, false, None).unwrap(), None);
        assert!(matches!(
            decode_log_header(&bytes, true, None),
            Err(CoreError::IncompleteHeader {
                expected: 16,
                actual: 12,
                ..
            })
        ));
    }

    #[test]
    fn empty_file_error_names_the_file() {
        let fs = EphemeralFileSystem::new();
        let path = Path::new("/db/transactions/ReadLogHeader");
        fs.put_file(path, Vec::new());

        let err = read_log_header_from_file(&fs, path).unwrap_err();
        assert!(err.to_string().contains("ReadLogHeader"));
    }

    #[test]
    fn missing_file_is_no_such_file() {
        let fs = EphemeralFileSystem::new();
        assert!(matches!(
            read_log_header_from_file(&fs, Path::new("/nope")),
            Err(CoreError::NoSuchFile { .. })
        ));
    }
}
