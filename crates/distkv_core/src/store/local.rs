//! Device-local store.

use super::RdbStore;
use crate::config::StoreKind;
use crate::error::{CoreError, CoreResult};
use std::sync::atomic::{AtomicBool, Ordering};

/// A store that never leaves this device.
#[derive(Debug, Default)]
pub struct LocalStore {
    initialized: AtomicBool,
}

impl LocalStore {
    /// Creates an uninitialized store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RdbStore for LocalStore {
    fn init(&self) -> CoreResult<()> {
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    fn set_distributed_tables(&self, _tables: &[String]) -> CoreResult<()> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(CoreError::NotInitialized);
        }
        Err(CoreError::Unsupported {
            capability: "set_distributed_tables",
        })
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }
}
