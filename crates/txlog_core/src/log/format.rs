//! Log header format revisions.

use crate::error::{CoreError, CoreResult};

/// Number of bits the format version byte is shifted by in the encoded
/// version field.
pub const LOG_VERSION_BITS: u32 = 56;

/// Mask selecting the log version from the encoded version field.
pub const LOG_VERSION_MASK: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Segment size reported by formats that do not record one.
pub const UNKNOWN_LOG_SEGMENT_SIZE: u32 = 0;

/// Starting checksum reported by formats that do not record one.
pub const BASE_TX_CHECKSUM: u32 = 0xDEAD_5EED;

/// Size of the largest header of any known format.
pub const BIGGEST_HEADER: usize = 144;

/// Size of the encoded version field that starts every header.
pub const ENCODED_VERSION_SIZE: usize = 8;

/// A revision of the log header layout.
///
/// The revision is identified by the high byte of the first header field;
/// it is the only thing the reader dispatches on.
///
/// | format | byte | header size | store id | segment size and checksum |
/// |--------|------|-------------|----------|---------------------------|
/// | V6     | 6    | 16          | no       | no                        |
/// | V7     | 7    | 64          | no       | no                        |
/// | V8     | 8    | 128         | yes      | no                        |
/// | V9     | 9    | 144         | yes      | yes                       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogFormat {
    /// Version and last committed transaction only.
    V6,
    /// V6 plus legacy padding.
    V7,
    /// Adds the store id.
    V8,
    /// Adds segment size and starting checksum.
    V9,
}

impl LogFormat {
    /// The format new log files are written in.
    pub const CURRENT: Self = Self::V9;

    /// All known formats, oldest first.
    pub const ALL: [Self; 4] = [Self::V6, Self::V7, Self::V8, Self::V9];

    /// Returns the version byte embedded in headers of this format.
    #[must_use]
    pub const fn version_byte(self) -> u8 {
        match self {
            Self::V6 => 6,
            Self::V7 => 7,
            Self::V8 => 8,
            Self::V9 => 9,
        }
    }

    /// Looks up the format for a version byte.
    #[must_use]
    pub const fn from_version_byte(byte: u8) -> Option<Self> {
        match byte {
            6 => Some(Self::V6),
            7 => Some(Self::V7),
            8 => Some(Self::V8),
            9 => Some(Self::V9),
            _ => None,
        }
    }

    /// Returns the fixed header length of this format.
    #[must_use]
    pub const fn header_size(self) -> usize {
        match self {
            Self::V6 => 16,
            Self::V7 => 64,
            Self::V8 => 128,
            Self::V9 => 144,
        }
    }

    /// Returns true if headers of this format carry a store id.
    #[must_use]
    pub const fn has_store_id(self) -> bool {
        matches!(self, Self::V8 | Self::V9)
    }

    /// Returns true for [`LogFormat::CURRENT`].
    #[must_use]
    pub const fn is_current(self) -> bool {
        matches!(self, Self::V9)
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "V{}", self.version_byte())
    }
}

/// Packs a log version and a format byte into the encoded version field.
///
/// # Errors
///
/// Returns `InvalidArgument` if `log_version` does not fit in 56 bits.
pub fn encode_log_version(log_version: u64, version_byte: u8) -> CoreResult<u64> {
    if log_version > LOG_VERSION_MASK {
        return Err(CoreError::invalid_argument(format!(
            "log version {log_version} exceeds maximum {LOG_VERSION_MASK}"
        )));
    }
    Ok(log_version | (u64::from(version_byte) << LOG_VERSION_BITS))
}

/// Extracts the log version from an encoded version field.
#[must_use]
pub const fn decode_log_version(encoded: u64) -> u64 {
    encoded & LOG_VERSION_MASK
}

/// Extracts the format byte from an encoded version field.
#[must_use]
pub const fn decode_log_format_version(encoded: u64) -> u8 {
    (encoded >> LOG_VERSION_BITS) as u8
}
