//! # txlog Testkit
//!
//! Test utilities for txlog.
//!
//! This crate provides:
//! - Fixtures that lay out legacy stores on any file system
//! - Independent encoders for every legacy log header format
//! - Migration participants that fail on demand, and counting wrappers
//! - Property-based test generators using proptest
//! - A progress monitor that records and checks migration progress
//!
//! ## Usage
//!
//! ```rust
//! use txlog_testkit::prelude::*;
//! use txlog_core::LogFormat;
//! use txlog_storage::{EphemeralFileSystem, FileSystem};
//!
//! let fs = EphemeralFileSystem::new();
//! let store = LegacyStoreBuilder::new("/db")
//!     .log_file(0, LogFormat::V6, 10, b"tx")
//!     .with_record_files()
//!     .build(&fs);
//! assert!(fs.is_directory(&store.transaction_logs_directory()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod legacy;
pub mod progress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::legacy::*;
    pub use crate::progress::*;
}

pub use fixtures::init_test_logging;
