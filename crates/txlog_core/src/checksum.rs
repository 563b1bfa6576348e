//! Running CRC32C checksums that frame spans of log data.
//!
//! A writer calls [`ChecksumWriter::begin_checksum_for_writing`] before the
//! first byte of a span and [`ChecksumWriter::put_checksum`] after the last
//! one. The 4-byte little-endian trailer lands directly after the span.

use crate::error::CoreResult;

/// Size of the checksum trailer in bytes.
pub const CHECKSUM_SIZE: usize = 4;

/// A running CRC32C accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum {
    value: u32,
}

impl Checksum {
    /// Creates an accumulator with no bytes fed.
    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Discards everything fed so far.
    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Feeds `data` into the accumulator.
    pub fn update(&mut self, data: &[u8]) {
        self.value = crc32c::crc32c_append(self.value, data);
    }

    /// Returns the checksum of everything fed since the last reset.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }
}

/// Computes the CRC32C of `data` in one go.
#[must_use]
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// A channel that can frame what it writes with checksums.
pub trait ChecksumWriter {
    /// Resets the accumulator; subsequent writes feed it.
    fn begin_checksum_for_writing(&mut self);

    /// Appends the accumulated checksum as a trailer, resets the
    /// accumulator and returns the value written.
    ///
    /// Without a preceding begin, the trailer covers everything written
    /// since the channel was created or last framed.
    ///
    /// # Errors
    ///
    /// Returns an error if the trailer cannot be written.
    fn put_checksum(&mut self) -> CoreResult<u32>;
}

/// A channel that can validate checksum trailers while reading.
pub trait ChecksumReader {
    /// Resets the accumulator; subsequent reads feed it.
    fn begin_checksum_for_reading(&mut self);

    /// Reads the trailer and compares it with the accumulated value.
    ///
    /// # Errors
    ///
    /// Returns `ChecksumMismatch` when the trailer differs, or a storage
    /// error when the trailer is cut off.
    fn end_checksum_and_validate(&mut self) -> CoreResult<u32>;
}
