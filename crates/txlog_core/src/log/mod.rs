//! Transaction log files.
//!
//! Every log file starts with a fixed-size header followed by checksum
//! framed record data:
//!
//! ```text
//! | header (16/64/128/144) | record ... | crc32c (4) | record ... | crc32c (4) |
//! ```
//!
//! ## Header Formats
//!
//! The first eight bytes of every header hold the log version in the low
//! 56 bits and the format byte in the high 8 bits. The format byte alone
//! decides how the rest of the header is decoded; see [`LogFormat`].
//! Only [`LogFormat::CURRENT`] is ever written.
//!
//! ## Reading Policy
//!
//! - **Zero version field**: the file was never written (or pre-allocated)
//!   and has no header, even for strict reads
//! - **Short header**: an `IncompleteHeader` error for strict reads,
//!   otherwise no header (the allocator then rewrites it)
//! - **Unknown format byte**: always `UnsupportedFormat`
//!
//! ## Invariants
//!
//! - A header is written once, at offset 0, before any record data
//! - `header.start_position().byte_offset == header.format().header_size()`
//! - Headers are immutable, so cached headers are never invalidated

mod allocator;
mod cache;
mod channel;
mod context;
mod files;
mod format;
mod header;
mod reader;
mod tracer;
mod writer;

pub use allocator::LogChannelAllocator;
pub use cache::LogHeaderCache;
pub use channel::LogVersionedChannel;
pub use context::LogFilesContext;
pub use files::{LogFilesHelper, DEFAULT_LOG_NAME};
pub use format::{
    decode_log_format_version, decode_log_version, encode_log_version, LogFormat,
    BASE_TX_CHECKSUM, BIGGEST_HEADER, LOG_VERSION_BITS, LOG_VERSION_MASK,
    UNKNOWN_LOG_SEGMENT_SIZE,
};
pub use header::LogHeader;
pub use reader::{decode_log_header, read_log_header, read_log_header_from_file};
pub use tracer::{CountingDatabaseTracer, DatabaseTracer, NullTracer, TraceEvent};
pub use writer::{encode_log_header, write_log_header};
