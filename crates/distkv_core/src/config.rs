//! Store configuration.

use distkv_storage::{Timestamp, MAX_TIMESTAMP};

/// Which store variant to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// A store that participates in cross-device sync.
    #[default]
    Device,
    /// A store that stays on this device.
    Local,
}

/// Configuration for a DistKV store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store variant.
    pub store_kind: StoreKind,

    /// Maximum number of rows returned by one sync poll.
    pub sync_batch_size: usize,

    /// Inclusive lower bound of a fresh sync window.
    pub sync_window_begin: Timestamp,

    /// Exclusive upper bound of a fresh sync window.
    pub sync_window_end: Timestamp,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_kind: StoreKind::Device,
            sync_batch_size: 128,
            sync_window_begin: 0,
            sync_window_end: MAX_TIMESTAMP,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store variant.
    #[must_use]
    pub const fn store_kind(mut self, kind: StoreKind) -> Self {
        self.store_kind = kind;
        self
    }

    /// Sets the sync batch size.
    #[must_use]
    pub const fn sync_batch_size(mut self, size: usize) -> Self {
        self.sync_batch_size = size;
        self
    }

    /// Sets the window a fresh sync session covers, `[begin, end)`.
    #[must_use]
    pub const fn sync_window(mut self, begin: Timestamp, end: Timestamp) -> Self {
        self.sync_window_begin = begin;
        self.sync_window_end = end;
        self
    }
}
