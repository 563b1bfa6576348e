//! Naming and discovery of log files.

use crate::error::CoreResult;
use std::path::{Path, PathBuf};
use txlog_storage::FileSystem;

/// Base name of transaction log files.
pub const DEFAULT_LOG_NAME: &str = "transaction.db";

/// Maps log versions to file paths inside one logs directory.
///
/// Log file `v` is named `transaction.db.<v>`.
#[derive(Debug, Clone)]
pub struct LogFilesHelper {
    directory: PathBuf,
}

impl LogFilesHelper {
    /// Creates a helper for the logs in `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the logs directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the path of log file `version`.
    #[must_use]
    pub fn log_file_for_version(&self, version: u64) -> PathBuf {
        self.directory.join(format!("{DEFAULT_LOG_NAME}.{version}"))
    }

    /// Parses the log version out of a log file name.
    #[must_use]
    pub fn version_from_file_name(name: &str) -> Option<u64> {
        name.strip_prefix(DEFAULT_LOG_NAME)?
            .strip_prefix('.')?
            .parse()
            .ok()
    }

    /// Parses the log version out of a log file path.
    #[must_use]
    pub fn version_of(path: &Path) -> Option<u64> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(Self::version_from_file_name)
    }

    /// Returns the versions of all existing log files, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn existing_versions(&self, fs: &dyn FileSystem) -> CoreResult<Vec<u64>> {
        let mut versions: Vec<u64> = fs
            .list_files(&self.directory)?
            .iter()
            .filter(|p| fs.file_exists(p))
            .filter_map(|p| Self::version_of(p))
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }

    /// Returns the paths of all existing log files, ascending by version.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn log_files(&self, fs: &dyn FileSystem) -> CoreResult<Vec<PathBuf>> {
        Ok(self
            .existing_versions(fs)?
            .into_iter()
            .map(|v| self.log_file_for_version(v))
            .collect())
    }

    /// Returns the highest existing log version.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn highest_version(&self, fs: &dyn FileSystem) -> CoreResult<Option<u64>> {
        Ok(self.existing_versions(fs)?.last().copied())
    }

    /// Returns the lowest existing log version.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn lowest_version(&self, fs: &dyn FileSystem) -> CoreResult<Option<u64>> {
        Ok(self.existing_versions(fs)?.first().copied())
    }
}
