//! Error types for txlog core.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The migration phase in which a participant failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    /// Writing converted artifacts into the migration directory.
    Migrate,
    /// Replacing source artifacts with migrated ones.
    MoveFiles,
    /// Removing leftovers after a completed upgrade.
    Cleanup,
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Migrate => "migrate",
            Self::MoveFiles => "move migrated files",
            Self::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

fn describe_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

/// Errors that can occur in txlog core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] txlog_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Fewer bytes were available than the header layout requires.
    #[error(
        "unable to read log header{}: expected {expected} bytes, found {actual}",
        describe_path(.path)
    )]
    IncompleteHeader {
        /// The log file, when reading from a file.
        path: Option<PathBuf>,
        /// Bytes required by the layout.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The header carries a format version byte this build does not know.
    #[error("unsupported log format version {version_byte}{}", describe_path(.path))]
    UnsupportedFormat {
        /// The format byte found in the header.
        version_byte: u8,
        /// The log file, when reading from a file.
        path: Option<PathBuf>,
    },

    /// A log file that was asked for does not exist.
    #[error("no such log file: {}", path.display())]
    NoSuchFile {
        /// The missing file.
        path: PathBuf,
    },

    /// On-disk state contradicts what the caller asked for.
    #[error("illegal state: {message}")]
    IllegalState {
        /// Description of the contradiction.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum stored in the trailer.
        expected: u32,
        /// Checksum computed over the framed bytes.
        actual: u32,
    },

    /// Invalid on-disk format.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Invalid argument supplied by the caller.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The store's version is not one this upgrader can migrate from.
    #[error("store version mismatch: {message}")]
    VersionMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// The store is newer than the version being migrated to.
    #[error("downgrade from {from} to {to} is not supported")]
    DowngradeNotSupported {
        /// Version found on disk.
        from: String,
        /// Version that was requested.
        to: String,
    },

    /// An upgrade is required but not enabled in the configuration.
    #[error("store needs upgrade from {from} to {to} but allow_upgrade is disabled")]
    UpgradeNotPermitted {
        /// Version found on disk.
        from: String,
        /// Version that was requested.
        to: String,
    },

    /// A migration participant failed.
    #[error("migration participant '{participant}' failed during {phase}: {source}")]
    ParticipantFailure {
        /// Name of the failing participant.
        participant: String,
        /// Phase in which it failed.
        phase: MigrationPhase,
        /// The underlying error.
        #[source]
        source: Box<CoreError>,
    },

    /// The store failed a post-migration consistency check.
    #[error("store is inconsistent after migration: {message}")]
    InconsistentStore {
        /// Description of the inconsistency.
        message: String,
    },

    /// The upgrade was cancelled between participants.
    #[error("store upgrade cancelled before participant '{next_participant}'")]
    UpgradeCancelled {
        /// The participant that was not started.
        next_participant: String,
    },
}

impl CoreError {
    /// Creates an incomplete header error.
    pub fn incomplete_header(path: Option<&Path>, expected: usize, actual: usize) -> Self {
        Self::IncompleteHeader {
            path: path.map(Path::to_path_buf),
            expected,
            actual,
        }
    }

    /// Creates an illegal state error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a version mismatch error.
    pub fn version_mismatch(message: impl Into<String>) -> Self {
        Self::VersionMismatch {
            message: message.into(),
        }
    }

    /// Creates an inconsistent store error.
    pub fn inconsistent_store(message: impl Into<String>) -> Self {
        Self::InconsistentStore {
            message: message.into(),
        }
    }

    /// Wraps `source` as a failure of `participant` in `phase`.
    pub fn participant_failure(
        participant: impl Into<String>,
        phase: MigrationPhase,
        source: CoreError,
    ) -> Self {
        Self::ParticipantFailure {
            participant: participant.into(),
            phase,
            source: Box::new(source),
        }
    }

    /// Returns the innermost error, looking through participant failures.
    #[must_use]
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::ParticipantFailure { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_header_names_file() {
        let err = CoreError::incomplete_header(Some(Path::new("/logs/transaction.db.3")), 16, 0);
        let message = err.to_string();
        assert!(message.contains("transaction.db.3"));
        assert!(message.contains("expected 16 bytes, found 0"));
    }

    #[test]
    fn participant_failure_keeps_cause_message() {
        let cause = CoreError::illegal_state("This upgrade is failing");
        let err = CoreError::participant_failure("records", MigrationPhase::MoveFiles, cause);

        let message = err.to_string();
        assert!(message.contains("records"));
        assert!(message.contains("move migrated files"));
        assert!(message.contains("This upgrade is failing"));
        assert!(matches!(err.root_cause(), CoreError::IllegalState { .. }));
    }
}
