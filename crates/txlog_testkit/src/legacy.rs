//! Independent encoders for every log header format.
//!
//! The log layer only ever writes the current format. These encoders lay
//! out older headers byte by byte so readers and the log migrator can be
//! tested against files written by previous releases.

use txlog_core::log::{BASE_TX_CHECKSUM, UNKNOWN_LOG_SEGMENT_SIZE};
use txlog_core::{LogFormat, LogHeader, StoreId, STORE_ID_SERIALIZED_SIZE};

/// Encodes a `format` header.
///
/// V6 and V7 carry no store id, segment size or checksum; those arguments
/// are ignored for them. V8 carries the store id only.
pub fn encode_legacy_header(
    format: LogFormat,
    log_version: u64,
    last_committed_tx_id: u64,
    store_id: Option<&StoreId>,
    segment_size: u32,
    checksum: u32,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(format.header_size());
    let encoded = log_version | (u64::from(format.version_byte()) << 56);
    out.extend_from_slice(&encoded.to_be_bytes());
    out.extend_from_slice(&last_committed_tx_id.to_be_bytes());

    if format.has_store_id() {
        match store_id {
            Some(id) => out.extend_from_slice(
                &id.serialize_fixed()
                    .expect("Fixture store id must serialize"),
            ),
            None => out.extend_from_slice(&[0u8; STORE_ID_SERIALIZED_SIZE]),
        }
    }
    if format == LogFormat::V9 {
        out.extend_from_slice(&segment_size.to_be_bytes());
        out.extend_from_slice(&checksum.to_be_bytes());
    }
    out.resize(format.header_size(), 0);
    out
}

/// Returns the header a reader should decode from the bytes
/// [`encode_legacy_header`] produces for the same arguments.
pub fn expected_header(
    format: LogFormat,
    log_version: u64,
    last_committed_tx_id: u64,
    store_id: Option<&StoreId>,
    segment_size: u32,
    checksum: u32,
) -> LogHeader {
    let store_id = store_id.filter(|_| format.has_store_id()).cloned();
    let (segment_size, checksum) = if format == LogFormat::V9 {
        (segment_size, checksum)
    } else {
        (UNKNOWN_LOG_SEGMENT_SIZE, BASE_TX_CHECKSUM)
    };
    LogHeader::new(
        format,
        log_version,
        last_committed_tx_id,
        store_id,
        segment_size,
        checksum,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_formats() {
        for format in LogFormat::ALL {
            let bytes = encode_legacy_header(format, 1, 2, None, 3, 4);
            assert_eq!(bytes.len(), format.header_size(), "{format}");
        }
    }

    #[test]
    fn v6_layout() {
        let bytes = encode_legacy_header(LogFormat::V6, 3, 7, None, 0, 0);
        assert_eq!(bytes[0], 6);
        assert_eq!(&bytes[1..8], &[0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(&bytes[8..16], &7u64.to_be_bytes());
    }

    #[test]
    fn v9_trailer_fields() {
        let id = StoreId::new(1, 2, "e", "f", 1, 0);
        let bytes = encode_legacy_header(LogFormat::V9, 0, 0, Some(&id), 256, 0xCAFE_BABE);
        assert_eq!(&bytes[80..84], &256u32.to_be_bytes());
        assert_eq!(&bytes[84..88], &0xCAFE_BABEu32.to_be_bytes());
        assert!(bytes[88..].iter().all(|&b| b == 0));
    }
}
