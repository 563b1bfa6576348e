//! Deciding whether a store needs an upgrade.

use crate::error::{CoreError, CoreResult};
use crate::layout::DatabaseLayout;
use crate::metadata::MetadataStore;
use crate::store_id::{StoreId, StoreVersion};
use std::sync::Arc;
use txlog_storage::FileSystem;

/// The outcome of checking a store against a target version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeCheck {
    /// There is no store at the layout.
    NoStore,
    /// The store is already at the target version.
    UpToDate,
    /// The store is older than the target and can be migrated.
    Upgrade {
        /// The store id currently on disk.
        from: StoreId,
    },
}

/// Reads and records a store's version marker.
pub trait StoreVersionCheck: Send + Sync {
    /// Returns the store id recorded for `layout`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker exists but cannot be read.
    fn stored_version(&self, layout: &DatabaseLayout) -> CoreResult<Option<StoreId>>;

    /// Records `store_id` as the store's marker. Must be atomic.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    fn record_version(&self, layout: &DatabaseLayout, store_id: &StoreId) -> CoreResult<()>;

    /// Compares the recorded marker with `target`.
    ///
    /// # Errors
    ///
    /// Returns `VersionMismatch` for a different engine or format family
    /// and `DowngradeNotSupported` when the store is newer than `target`.
    fn check_upgrade(
        &self,
        layout: &DatabaseLayout,
        target: &StoreVersion,
    ) -> CoreResult<UpgradeCheck> {
        let Some(stored) = self.stored_version(layout)? else {
            return Ok(UpgradeCheck::NoStore);
        };
        let current = stored.store_version();
        if !current.same_family(target) {
            return Err(CoreError::version_mismatch(format!(
                "store is {current}, which cannot be migrated to {target}"
            )));
        }
        match current.ordinal().cmp(&target.ordinal()) {
            std::cmp::Ordering::Equal => Ok(UpgradeCheck::UpToDate),
            std::cmp::Ordering::Greater => Err(CoreError::DowngradeNotSupported {
                from: current.to_string(),
                to: target.to_string(),
            }),
            std::cmp::Ordering::Less => Ok(UpgradeCheck::Upgrade { from: stored }),
        }
    }
}

/// A version check backed by the store's metadata file.
#[derive(Debug, Clone)]
pub struct MetadataVersionCheck {
    fs: Arc<dyn FileSystem>,
}

impl MetadataVersionCheck {
    /// Creates a version check using `fs`.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl StoreVersionCheck for MetadataVersionCheck {
    fn stored_version(&self, layout: &DatabaseLayout) -> CoreResult<Option<StoreId>> {
        MetadataStore::new(layout.clone()).read(self.fs.as_ref())
    }

    fn record_version(&self, layout: &DatabaseLayout, store_id: &StoreId) -> CoreResult<()> {
        MetadataStore::new(layout.clone()).write(self.fs.as_ref(), store_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_storage::EphemeralFileSystem;

    fn setup(stored: Option<StoreId>) -> (MetadataVersionCheck, DatabaseLayout) {
        let fs = Arc::new(EphemeralFileSystem::new());
        let layout = DatabaseLayout::new("/db");
        let check = MetadataVersionCheck::new(fs);
        if let Some(id) = stored {
            check.record_version(&layout, &id).unwrap();
        }
        (check, layout)
    }

    fn target() -> StoreVersion {
        StoreVersion::new("record", "aligned", 2, 0)
    }

    #[test]
    fn no_store() {
        let (check, layout) = setup(None);
        assert_eq!(
            check.check_upgrade(&layout, &target()).unwrap(),
            UpgradeCheck::NoStore
        );
    }

    #[test]
    fn up_to_date() {
        let (check, layout) = setup(Some(StoreId::new(1, 1, "record", "aligned", 2, 0)));
        assert_eq!(
            check.check_upgrade(&layout, &target()).unwrap(),
            UpgradeCheck::UpToDate
        );
    }

    #[test]
    fn older_store_upgrades() {
        let stored = StoreId::new(1, 1, "record", "aligned", 1, 5);
        let (check, layout) = setup(Some(stored.clone()));
        assert_eq!(
            check.check_upgrade(&layout, &target()).unwrap(),
            UpgradeCheck::Upgrade { from: stored }
        );
    }

    #[test]
    fn newer_store_is_downgrade() {
        let (check, layout) = setup(Some(StoreId::new(1, 1, "record", "aligned", 2, 1)));
        assert!(matches!(
            check.check_upgrade(&layout, &target()),
            Err(CoreError::DowngradeNotSupported { .. })
        ));
    }

    #[test]
    fn other_family_is_mismatch() {
        let (check, layout) = setup(Some(StoreId::new(1, 1, "record", "block", 1, 0)));
        assert!(matches!(
            check.check_upgrade(&layout, &target()),
            Err(CoreError::VersionMismatch { .. })
        ));
    }
}
