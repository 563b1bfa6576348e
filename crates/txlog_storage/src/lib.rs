//! # txlog Storage
//!
//! File system abstraction for the txlog transaction-log subsystem.
//!
//! This crate provides the lowest-level storage layer. Channels are
//! **opaque byte stores** - they do not interpret the data they hold.
//!
//! ## Design Principles
//!
//! - Channels are positional byte stores (read at, write at, flush, sync)
//! - No knowledge of log headers, checksums or migration state
//! - Must be `Send + Sync` for concurrent access
//! - The log layer owns all file format interpretation
//!
//! ## Available File Systems
//!
//! - [`DefaultFileSystem`] - OS files, with pre-allocation and read-ahead hints
//! - [`EphemeralFileSystem`] - in-memory files for testing
//!
//! ## Example
//!
//! ```rust
//! use txlog_storage::{EphemeralFileSystem, FileSystem, StoreChannel};
//! use std::path::Path;
//!
//! let fs = EphemeralFileSystem::new();
//! let mut channel = fs.write(Path::new("/db/data.bin")).unwrap();
//! channel.write_at(0, b"hello world").unwrap();
//! let data = channel.read_exact_at(0, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod error;
mod file;
mod fs;
mod memory;

pub use channel::StoreChannel;
pub use error::{StorageError, StorageResult};
pub use file::{DefaultFileSystem, FileChannel};
pub use fs::FileSystem;
pub use memory::{EphemeralFileSystem, MemoryChannel};
