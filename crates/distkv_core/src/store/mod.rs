//! Store variants selected by configuration.
//!
//! Both variants expose the same capabilities through [`RdbStore`]. The
//! closed [`Store`] enum dispatches to them, so callers never see which one
//! they hold unless they ask.

mod device;
mod local;

pub use device::DeviceStore;
pub use local::LocalStore;

use crate::config::{Config, StoreKind};
use crate::error::CoreResult;
use distkv_storage::StorageEngine;
use std::sync::Arc;

/// Capabilities shared by every store variant.
pub trait RdbStore: Send + Sync {
    /// Attaches the store to its engine. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be attached.
    fn init(&self) -> CoreResult<()>;

    /// Marks tables as distributed so their changes can be synced.
    ///
    /// # Errors
    ///
    /// Fails before [`RdbStore::init`], when the variant cannot distribute
    /// tables, or when the engine rejects a table.
    fn set_distributed_tables(&self, tables: &[String]) -> CoreResult<()>;

    /// Which variant this is.
    fn kind(&self) -> StoreKind;
}

/// A store of either variant.
#[derive(Debug)]
pub enum Store {
    /// Sync-capable store.
    Device(DeviceStore),
    /// Device-local store.
    Local(LocalStore),
}

impl Store {
    /// Builds the variant `config` selects. Only device stores keep `engine`.
    pub fn create(config: &Config, engine: Arc<dyn StorageEngine>) -> Self {
        match config.store_kind {
            StoreKind::Device => Self::Device(DeviceStore::new(engine)),
            StoreKind::Local => Self::Local(LocalStore::new()),
        }
    }

    fn inner(&self) -> &dyn RdbStore {
        match self {
            Self::Device(store) => store,
            Self::Local(store) => store,
        }
    }
}

impl RdbStore for Store {
    fn init(&self) -> CoreResult<()> {
        self.inner().init()
    }

    fn set_distributed_tables(&self, tables: &[String]) -> CoreResult<()> {
        self.inner().set_distributed_tables(tables)
    }

    fn kind(&self) -> StoreKind {
        self.inner().kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::status::Status;
    use distkv_storage::InMemoryEngine;

    fn engine() -> Arc<InMemoryEngine> {
        Arc::new(InMemoryEngine::new())
    }

    #[test]
    fn config_selects_variant() {
        let store = Store::create(&Config::default(), engine());
        assert_eq!(store.kind(), StoreKind::Device);
        assert!(matches!(store, Store::Device(_)));

        let store = Store::create(&Config::new().store_kind(StoreKind::Local), engine());
        assert_eq!(store.kind(), StoreKind::Local);
    }

    #[test]
    fn calls_before_init_fail() {
        for kind in [StoreKind::Device, StoreKind::Local] {
            let store = Store::create(&Config::new().store_kind(kind), engine());
            let err = store.set_distributed_tables(&["T".to_string()]).unwrap_err();
            assert!(matches!(err, CoreError::NotInitialized));
            assert_eq!(err.status(), Status::Error);
        }
    }

    #[test]
    fn dispatch_reaches_variant() {
        let store = Store::create(&Config::default(), engine());
        store.init().unwrap();
        store.set_distributed_tables(&["T".to_string()]).unwrap();

        let store = Store::create(&Config::new().store_kind(StoreKind::Local), engine());
        store.init().unwrap();
        let err = store.set_distributed_tables(&["T".to_string()]).unwrap_err();
        assert_eq!(err.status(), Status::NotSupported);
    }
}
