//! # txlog Core
//!
//! Transaction log files and store upgrades for an embedded graph store.
//!
//! This crate provides:
//! - The versioned log header format and its codec ([`log`])
//! - Checksum framing of log data ([`ChecksumWriter`], [`ChecksumReader`])
//! - The channel allocator that creates and opens log files
//! - A per-database header cache
//! - The store's metadata and version marker
//! - Store upgrades through migration participants ([`migration`])

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checksum;
mod config;
mod error;
mod layout;
pub mod log;
mod metadata;
pub mod migration;
mod position;
mod store_id;

pub use checksum::{compute_checksum, Checksum, ChecksumReader, ChecksumWriter, CHECKSUM_SIZE};
pub use config::{Config, DEFAULT_PREALLOCATION_SIZE};
pub use error::{CoreError, CoreResult, MigrationPhase};
pub use layout::DatabaseLayout;
pub use log::{
    LogChannelAllocator, LogFilesContext, LogFilesHelper, LogFormat, LogHeader, LogHeaderCache,
    LogVersionedChannel,
};
pub use metadata::{MetadataStore, METADATA_MAGIC, METADATA_VERSION};
pub use position::LogPosition;
pub use store_id::{
    StoreId, StoreVersion, MAX_NAMES_LENGTH, MAX_VERSION_COMPONENT, STORE_ID_SERIALIZED_SIZE,
};
