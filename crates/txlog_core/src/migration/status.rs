//! The persisted phase marker of an in-flight upgrade.
//!
//! The marker is a small text file in the migration directory:
//!
//! ```text
//! moving
//! record-aligned-1.1
//! record-aligned-2.0
//! ```
//!
//! It is the only state that survives a crash. `migrating` means the
//! source is untouched and migration restarts from scratch; `moving` means
//! some source artifacts may already be replaced by artifacts of the
//! recorded target, so only the moves to that same target may run again.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::path::{Path, PathBuf};
use txlog_storage::FileSystem;

/// File name of the phase marker.
pub const MIGRATION_STATUS_FILE: &str = "_migration_status";

/// The upgrade phase recorded in the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhaseMarker {
    /// Participants are writing into the migration directory.
    Migrating,
    /// Participants are replacing source artifacts.
    Moving,
}

impl MigrationPhaseMarker {
    fn as_str(self) -> &'static str {
        match self {
            Self::Migrating => "migrating",
            Self::Moving => "moving",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "migrating" => Some(Self::Migrating),
            "moving" => Some(Self::Moving),
            _ => None,
        }
    }
}

impl fmt::Display for MigrationPhaseMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content of the phase marker file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// The recorded phase.
    pub phase: MigrationPhaseMarker,
    /// Label of the version the upgrade started from.
    pub from: String,
    /// Label of the version the upgrade migrates to.
    pub to: String,
}

impl MigrationStatus {
    /// Creates a marker.
    pub fn new(
        phase: MigrationPhaseMarker,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Returns true if this marker belongs to an upgrade from `from` to `to`.
    #[must_use]
    pub fn is_upgrade(&self, from: &str, to: &str) -> bool {
        self.from == from && self.to == to
    }

    /// Returns the marker path inside `migration_dir`.
    #[must_use]
    pub fn path_in(migration_dir: &Path) -> PathBuf {
        migration_dir.join(MIGRATION_STATUS_FILE)
    }

    /// Reads the marker from `migration_dir`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the marker exists but cannot be parsed.
    pub fn read(fs: &dyn FileSystem, migration_dir: &Path) -> CoreResult<Option<Self>> {
        let path = Self::path_in(migration_dir);
        if !fs.file_exists(&path) {
            return Ok(None);
        }
        let data = fs.read_to_vec(&path)?;
        let text = std::str::from_utf8(&data)
            .map_err(|_| CoreError::invalid_format("migration status is not UTF-8"))?;
        let mut lines = text.lines();
        let phase = lines
            .next()
            .and_then(MigrationPhaseMarker::parse)
            .ok_or_else(|| CoreError::invalid_format(format!("bad migration status: {text:?}")))?;
        let mut version = |what: &str| {
            lines.next().filter(|l| !l.is_empty()).ok_or_else(|| {
                CoreError::invalid_format(format!("migration status has no {what} version"))
            })
        };
        let from = version("from")?;
        let to = version("to")?;
        Ok(Some(Self::new(phase, from, to)))
    }

    /// Writes the marker into `migration_dir` atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn write(&self, fs: &dyn FileSystem, migration_dir: &Path) -> CoreResult<()> {
        let text = format!("{}\n{}\n{}\n", self.phase, self.from, self.to);
        fs.write_atomically(&Self::path_in(migration_dir), text.as_bytes())?;
        Ok(())
    }
}
