//! Positions within the sequence of log files.

use std::fmt;

/// A byte position inside one log file.
///
/// Positions order by log version first and byte offset second, which is
/// the order in which bytes were appended to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition {
    /// Ordinal of the log file.
    pub log_version: u64,
    /// Offset of the byte inside that file.
    pub byte_offset: u64,
}

impl LogPosition {
    /// Marker for a position that has not been determined.
    pub const UNSPECIFIED: Self = Self {
        log_version: u64::MAX,
        byte_offset: u64::MAX,
    };

    /// Creates a new position.
    #[must_use]
    pub const fn new(log_version: u64, byte_offset: u64) -> Self {
        Self {
            log_version,
            byte_offset,
        }
    }

    /// Returns true unless this is [`LogPosition::UNSPECIFIED`].
    #[must_use]
    pub const fn is_specified(&self) -> bool {
        !(self.log_version == u64::MAX && self.byte_offset == u64::MAX)
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogPosition{{logVersion={}, byteOffset={}}}",
            self.log_version, self.byte_offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_version_then_offset() {
        let a = LogPosition::new(1, 500);
        let b = LogPosition::new(2, 16);
        let c = LogPosition::new(2, 64);

        assert!(a < b);
        assert!(b < c);
        assert_eq!(b.max(a), b);
    }

    #[test]
    fn display_format() {
        assert_eq!(
            LogPosition::new(5, 144).to_string(),
            "LogPosition{logVersion=5, byteOffset=144}"
        );
    }

    #[test]
    fn unspecified_marker() {
        assert!(!LogPosition::UNSPECIFIED.is_specified());
        assert!(LogPosition::new(0, 0).is_specified());
    }
}
