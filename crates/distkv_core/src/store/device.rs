//! Sync-capable store.

use super::RdbStore;
use crate::config::StoreKind;
use crate::error::{CoreError, CoreResult};
use distkv_storage::StorageEngine;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A store whose tables can be distributed to other devices.
pub struct DeviceStore {
    engine: Arc<dyn StorageEngine>,
    attached: Mutex<Option<Arc<dyn StorageEngine>>>,
}

impl DeviceStore {
    /// Creates an uninitialized store over `engine`.
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            engine,
            attached: Mutex::new(None),
        }
    }
}

impl RdbStore for DeviceStore {
    fn init(&self) -> CoreResult<()> {
        let mut attached = self.attached.lock();
        if attached.is_none() {
            *attached = Some(Arc::clone(&self.engine));
            tracing::debug!("device store initialized");
        }
        Ok(())
    }

    fn set_distributed_tables(&self, tables: &[String]) -> CoreResult<()> {
        let attached = self.attached.lock();
        let engine = attached.as_ref().ok_or(CoreError::NotInitialized)?;
        for table in tables {
            engine.create_distributed_table(table).map_err(|e| {
                tracing::error!(table = %table, error = %e, "failed to distribute table");
                CoreError::from(e)
            })?;
        }
        tracing::debug!(count = tables.len(), "distributed tables set");
        Ok(())
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Device
    }
}

impl fmt::Debug for DeviceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceStore")
            .field("initialized", &self.attached.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use distkv_storage::{changelog_table_name, InMemoryEngine, StorageError, TOMBSTONE_RANGE_PREDICATE};

    #[test]
    fn distributing_creates_changelogs() {
        let engine = Arc::new(InMemoryEngine::new());
        let store = DeviceStore::new(engine.clone());
        store.init().unwrap();
        store.init().unwrap();
        store
            .set_distributed_tables(&["A".to_string(), "B".to_string()])
            .unwrap();

        for table in ["A", "B"] {
            let sql = format!(
                "SELECT * FROM {} WHERE {TOMBSTONE_RANGE_PREDICATE} ORDER BY timestamp ASC;",
                changelog_table_name(table)
            );
            assert!(engine.prepare(&sql).is_ok());
        }
    }

    #[test]
    fn engine_rejection_propagates() {
        let store = DeviceStore::new(Arc::new(InMemoryEngine::new()));
        store.init().unwrap();
        let err = store
            .set_distributed_tables(&["ok".to_string(), "not ok".to_string()])
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage(StorageError::InvalidArgs(_))));
    }
}
