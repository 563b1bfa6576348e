//! Per-database memoization of log headers.

use super::header::LogHeader;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Caches headers by log version.
///
/// Headers are immutable once written, so entries are never invalidated.
/// Each open database owns one cache and hands it to its allocator.
#[derive(Debug, Default)]
pub struct LogHeaderCache {
    headers: RwLock<HashMap<u64, LogHeader>>,
}

impl LogHeaderCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached header for `log_version`.
    #[must_use]
    pub fn get_header(&self, log_version: u64) -> Option<LogHeader> {
        self.headers.read().get(&log_version).cloned()
    }

    /// Publishes the header for `log_version`.
    pub fn put_header(&self, log_version: u64, header: LogHeader) {
        tracing::debug!(version = log_version, "caching log header");
        self.headers.write().insert(log_version, header);
    }

    /// Drops all entries.
    pub fn clear(&self) {
        self.headers.write().clear();
    }

    /// Returns the number of cached headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.read().is_empty()
    }
}
