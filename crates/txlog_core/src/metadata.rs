//! The metadata store holding the store's version marker.
//!
//! ## Format
//!
//! ```text
//! | magic "TXMD" (4) | version (2) | store id (64) | crc32c (4) |
//! ```
//!
//! The store id doubles as the version marker: its engine, format name and
//! major/minor version say which format the store's files are in. The file
//! is always replaced atomically.

use crate::checksum::{compute_checksum, CHECKSUM_SIZE};
use crate::error::{CoreError, CoreResult};
use crate::layout::DatabaseLayout;
use crate::store_id::{StoreId, STORE_ID_SERIALIZED_SIZE};
use txlog_storage::FileSystem;

/// Magic bytes at the start of the metadata store.
pub const METADATA_MAGIC: [u8; 4] = *b"TXMD";

/// Current metadata store format version.
pub const METADATA_VERSION: u16 = 1;

const METADATA_SIZE: usize = 4 + 2 + STORE_ID_SERIALIZED_SIZE + CHECKSUM_SIZE;

/// Reads and writes the metadata store of one layout.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    layout: DatabaseLayout,
}

impl MetadataStore {
    /// Creates a metadata store handle for `layout`.
    #[must_use]
    pub fn new(layout: DatabaseLayout) -> Self {
        Self { layout }
    }

    /// Encodes a store id into the metadata store format.
    ///
    /// # Errors
    ///
    /// Propagates store id serialization errors.
    pub fn encode(store_id: &StoreId) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(METADATA_SIZE);
        buf.extend_from_slice(&METADATA_MAGIC);
        buf.extend_from_slice(&METADATA_VERSION.to_le_bytes());
        buf.extend_from_slice(&store_id.serialize_fixed()?);
        let crc = compute_checksum(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Decodes the metadata store format.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for a bad magic, version or length, and
    /// `ChecksumMismatch` if the trailer does not match.
    pub fn decode(data: &[u8]) -> CoreResult<StoreId> {
        if data.len() < 4 || data[0..4] != METADATA_MAGIC {
            return Err(CoreError::invalid_format("invalid metadata store magic"));
        }
        if data.len() != METADATA_SIZE {
            return Err(CoreError::invalid_format(format!(
                "metadata store has {} bytes, expected {METADATA_SIZE}",
                data.len()
            )));
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        if version > METADATA_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported metadata store version: {version}"
            )));
        }

        let body_end = METADATA_SIZE - CHECKSUM_SIZE;
        let expected = u32::from_le_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        let actual = compute_checksum(&data[..body_end]);
        if expected != actual {
            return Err(CoreError::ChecksumMismatch { expected, actual });
        }

        StoreId::deserialize_fixed(&data[6..body_end])?
            .ok_or_else(|| CoreError::invalid_format("metadata store has an empty store id"))
    }

    /// Returns true if the metadata store file exists.
    #[must_use]
    pub fn exists(&self, fs: &dyn FileSystem) -> bool {
        fs.file_exists(&self.layout.metadata_store())
    }

    /// Loads the store id.
    ///
    /// Returns `None` if the metadata store does not exist (no store).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn read(&self, fs: &dyn FileSystem) -> CoreResult<Option<StoreId>> {
        let path = self.layout.metadata_store();
        if !fs.file_exists(&path) {
            return Ok(None);
        }
        let data = fs.read_to_vec(&path)?;
        Self::decode(&data).map(Some)
    }

    /// Replaces the store id atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, fs: &dyn FileSystem, store_id: &StoreId) -> CoreResult<()> {
        let data = Self::encode(store_id)?;
        fs.mkdirs(self.layout.root())?;
        fs.write_atomically(&self.layout.metadata_store(), &data)?;
        tracing::debug!(version = %store_id.store_version(), "wrote metadata store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_storage::EphemeralFileSystem;

    fn sample() -> StoreId {
        StoreId::new(100, 200, "record", "aligned", 1, 2)
    }

    #[test]
    fn encode_decode_roundtrip() {
        let data = MetadataStore::encode(&sample()).unwrap();
        assert_eq!(data.len(), METADATA_SIZE);
        assert_eq!(MetadataStore::decode(&data).unwrap(), sample());
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut data = MetadataStore::encode(&sample()).unwrap();
        data[0] = b'X';
        assert!(matches!(
            MetadataStore::decode(&data),
            Err(CoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn corruption_detected() {
        let mut data = MetadataStore::encode(&sample()).unwrap();
        data[20] ^= 0xFF;
        assert!(matches!(
            MetadataStore::decode(&data),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn read_missing_is_none() {
        let fs = EphemeralFileSystem::new();
        let store = MetadataStore::new(DatabaseLayout::new("/db"));
        assert!(!store.exists(&fs));
        assert_eq!(store.read(&fs).unwrap(), None);
    }

    #[test]
    fn write_then_read() {
        let fs = EphemeralFileSystem::new();
        let store = MetadataStore::new(DatabaseLayout::new("/db"));

        store.write(&fs, &sample()).unwrap();
        assert_eq!(store.read(&fs).unwrap(), Some(sample()));

        let upgraded = StoreId::new(100, 200, "record", "aligned", 2, 0);
        store.write(&fs, &upgraded).unwrap();
        assert_eq!(store.read(&fs).unwrap(), Some(upgraded));
    }
}
