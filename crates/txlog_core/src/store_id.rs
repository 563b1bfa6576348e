//! Store identity and store version values.
//!
//! A [`StoreId`] is created once, when a store is first initialized, and is
//! stamped into every log header from V8 onwards. It is serialized into a
//! fixed 64-byte region:
//!
//! ```text
//! | ver (1) | creation_time (8) | random (8) | engine_len (1) | engine |
//! | format_len (1) | format | major (1) | minor (1) | zero padding |
//! ```
//!
//! An all-zero region means "no store id".

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Size of the fixed store id serialization in bytes.
pub const STORE_ID_SERIALIZED_SIZE: usize = 64;

/// Serialization format version written in the first byte.
const SERIALIZATION_VERSION: u8 = 1;

/// Bytes used by everything except the two names.
const FIXED_PART: usize = 1 + 8 + 8 + 1 + 1 + 1 + 1;

/// Maximum combined length of the engine and format names.
pub const MAX_NAMES_LENGTH: usize = STORE_ID_SERIALIZED_SIZE - FIXED_PART;

/// Largest major or minor version a store version may carry.
pub const MAX_VERSION_COMPONENT: u8 = 127;

/// The on-disk format a store is written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreVersion {
    /// Name of the storage engine.
    pub storage_engine: String,
    /// Name of the format family.
    pub format_name: String,
    /// Major format version.
    pub major: u8,
    /// Minor format version.
    pub minor: u8,
}

impl StoreVersion {
    /// Creates a new store version.
    pub fn new(
        storage_engine: impl Into<String>,
        format_name: impl Into<String>,
        major: u8,
        minor: u8,
    ) -> Self {
        Self {
            storage_engine: storage_engine.into(),
            format_name: format_name.into(),
            major,
            minor,
        }
    }

    /// Returns true if both versions belong to the same engine and format
    /// family, so that one can be migrated into the other.
    #[must_use]
    pub fn same_family(&self, other: &StoreVersion) -> bool {
        self.storage_engine == other.storage_engine && self.format_name == other.format_name
    }

    /// Returns `(major, minor)` for ordering within a family.
    #[must_use]
    pub const fn ordinal(&self) -> (u8, u8) {
        (self.major, self.minor)
    }
}

impl fmt::Display for StoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}.{}",
            self.storage_engine, self.format_name, self.major, self.minor
        )
    }
}

/// Identity of one store creation event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreId {
    /// Creation time in milliseconds since the Unix epoch.
    pub creation_time: i64,
    /// Random discriminator.
    pub random: i64,
    /// Name of the storage engine.
    pub storage_engine: String,
    /// Name of the format family.
    pub format_name: String,
    /// Major format version.
    pub major: u8,
    /// Minor format version.
    pub minor: u8,
}

impl StoreId {
    /// Creates a store id from its parts.
    pub fn new(
        creation_time: i64,
        random: i64,
        storage_engine: impl Into<String>,
        format_name: impl Into<String>,
        major: u8,
        minor: u8,
    ) -> Self {
        Self {
            creation_time,
            random,
            storage_engine: storage_engine.into(),
            format_name: format_name.into(),
            major,
            minor,
        }
    }

    /// Generates a fresh store id for `version` using the wall clock and a
    /// random discriminator.
    #[must_use]
    pub fn generate(version: &StoreVersion) -> Self {
        let creation_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self::new(
            creation_time,
            rand::random::<i64>(),
            version.storage_engine.clone(),
            version.format_name.clone(),
            version.major,
            version.minor,
        )
    }

    /// Returns the store version this id was stamped with.
    #[must_use]
    pub fn store_version(&self) -> StoreVersion {
        StoreVersion::new(
            self.storage_engine.clone(),
            self.format_name.clone(),
            self.major,
            self.minor,
        )
    }

    /// Returns the same identity stamped with a different store version.
    #[must_use]
    pub fn with_version(&self, version: &StoreVersion) -> Self {
        Self::new(
            self.creation_time,
            self.random,
            version.storage_engine.clone(),
            version.format_name.clone(),
            version.major,
            version.minor,
        )
    }

    /// Serializes into the fixed 64-byte layout.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the names exceed [`MAX_NAMES_LENGTH`]
    /// bytes together or a version component exceeds
    /// [`MAX_VERSION_COMPONENT`].
    pub fn serialize_fixed(&self) -> CoreResult<[u8; STORE_ID_SERIALIZED_SIZE]> {
        let engine = self.storage_engine.as_bytes();
        let format = self.format_name.as_bytes();
        if engine.len() + format.len() > MAX_NAMES_LENGTH {
            return Err(CoreError::invalid_argument(format!(
                "store id names '{}' and '{}' exceed {} bytes",
                self.storage_engine, self.format_name, MAX_NAMES_LENGTH
            )));
        }
        if self.major > MAX_VERSION_COMPONENT || self.minor > MAX_VERSION_COMPONENT {
            return Err(CoreError::invalid_argument(format!(
                "store id version {}.{} out of range",
                self.major, self.minor
            )));
        }

        let mut out = [0u8; STORE_ID_SERIALIZED_SIZE];
        out[0] = SERIALIZATION_VERSION;
        out[1..9].copy_from_slice(&self.creation_time.to_be_bytes());
        out[9..17].copy_from_slice(&self.random.to_be_bytes());
        let mut pos = 17;
        for name in [engine, format] {
            // Lengths fit in u8, bounded by MAX_NAMES_LENGTH above.
            out[pos] = name.len() as u8;
            pos += 1;
            out[pos..pos + name.len()].copy_from_slice(name);
            pos += name.len();
        }
        out[pos] = self.major;
        out[pos + 1] = self.minor;
        Ok(out)
    }

    /// Deserializes from the fixed 64-byte layout.
    ///
    /// Returns `None` for an all-zero region.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the region is too short, carries an
    /// unknown serialization version, or its name lengths run past the end.
    pub fn deserialize_fixed(bytes: &[u8]) -> CoreResult<Option<Self>> {
        let Some(region) = bytes.get(..STORE_ID_SERIALIZED_SIZE) else {
            return Err(CoreError::invalid_format(format!(
                "store id needs {} bytes, got {}",
                STORE_ID_SERIALIZED_SIZE,
                bytes.len()
            )));
        };
        if region.iter().all(|&b| b == 0) {
            return Ok(None);
        }
        if region[0] != SERIALIZATION_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unknown store id serialization version {}",
                region[0]
            )));
        }

        let creation_time = i64::from_be_bytes(read_array(region, 1)?);
        let random = i64::from_be_bytes(read_array(region, 9)?);
        let mut pos = 17;
        let storage_engine = read_name(region, &mut pos)?;
        let format_name = read_name(region, &mut pos)?;
        let [major, minor] = read_array(region, pos)?;

        Ok(Some(Self {
            creation_time,
            random,
            storage_engine,
            format_name,
            major,
            minor,
        }))
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreId{{creationTime={}, random={}, version={}}}",
            self.creation_time,
            self.random,
            self.store_version()
        )
    }
}

fn read_array<const N: usize>(region: &[u8], at: usize) -> CoreResult<[u8; N]> {
    region
        .get(at..at + N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| CoreError::invalid_format("store id truncated"))
}

fn read_name(region: &[u8], pos: &mut usize) -> CoreResult<String> {
    let [len] = read_array::<1>(region, *pos)?;
    let start = *pos + 1;
    let end = start + usize::from(len);
    let raw = region
        .get(start..end)
        .ok_or_else(|| CoreError::invalid_format("store id name runs past the end"))?;
    let name = std::str::from_utf8(raw)
        .map_err(|_| CoreError::invalid_format("store id name is not UTF-8"))?;
    *pos = end;
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoreId {
        StoreId::new(12345, 56789, "engine-1", "format-1", 1, 1)
    }

    #[test]
    fn fixed_serialization_roundtrip() {
        let id = sample();
        let bytes = id.serialize_fixed().unwrap();

        assert_eq!(bytes[0], SERIALIZATION_VERSION);
        assert_eq!(&bytes[1..9], &12345i64.to_be_bytes());
        assert_eq!(StoreId::deserialize_fixed(&bytes).unwrap(), Some(id));
    }

    #[test]
    fn zero_region_is_absent() {
        let zeros = [0u8; STORE_ID_SERIALIZED_SIZE];
        assert_eq!(StoreId::deserialize_fixed(&zeros).unwrap(), None);
    }

    #[test]
    fn names_longer_than_limit_rejected() {
        let engine = "e".repeat(30);
        let format = "f".repeat(14);
        let id = StoreId::new(1, 2, engine, format, 1, 0);
        assert!(matches!(
            id.serialize_fixed(),
            Err(CoreError::InvalidArgument { .. })
        ));

        let fits = StoreId::new(1, 2, "e".repeat(30), "f".repeat(13), 1, 0);
        let bytes = fits.serialize_fixed().unwrap();
        assert_eq!(StoreId::deserialize_fixed(&bytes).unwrap(), Some(fits));
    }

    #[test]
    fn version_component_range_checked() {
        let id = StoreId::new(1, 2, "e", "f", 128, 0);
        assert!(id.serialize_fixed().is_err());
    }

    #[test]
    fn unknown_serialization_version_rejected() {
        let mut bytes = sample().serialize_fixed().unwrap();
        bytes[0] = 9;
        assert!(matches!(
            StoreId::deserialize_fixed(&bytes),
            Err(CoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn store_version_label_and_family() {
        let v1 = StoreVersion::new("record", "aligned", 1, 1);
        let v2 = StoreVersion::new("record", "aligned", 2, 0);
        let other = StoreVersion::new("record", "block", 2, 0);

        assert_eq!(v1.to_string(), "record-aligned-1.1");
        assert!(v1.same_family(&v2));
        assert!(!v1.same_family(&other));
        assert!(v1.ordinal() < v2.ordinal());
    }

    #[test]
    fn with_version_keeps_identity() {
        let id = sample();
        let target = StoreVersion::new("engine-1", "format-1", 2, 0);
        let upgraded = id.with_version(&target);

        assert_eq!(upgraded.creation_time, id.creation_time);
        assert_eq!(upgraded.random, id.random);
        assert_eq!(upgraded.store_version(), target);
    }

    #[test]
    fn generate_stamps_version() {
        let version = StoreVersion::new("engine-1", "format-1", 1, 1);
        let a = StoreId::generate(&version);
        assert_eq!(a.store_version(), version);
        assert!(a.creation_time > 0);
    }
}
