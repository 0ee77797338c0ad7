//! Timestamp windows scanned by a sync session.

use distkv_storage::Timestamp;
use serde::{Deserialize, Serialize};

/// The live and deleted windows of a sync session, both half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncTimeRange {
    /// Inclusive lower bound for live rows.
    pub begin_time: Timestamp,
    /// Exclusive upper bound for live rows.
    pub end_time: Timestamp,
    /// Inclusive lower bound for tombstones.
    pub delete_begin_time: Timestamp,
    /// Exclusive upper bound for tombstones.
    pub delete_end_time: Timestamp,
}

impl SyncTimeRange {
    /// Creates a range covering `[begin, end)` for both live rows and
    /// tombstones.
    #[must_use]
    pub const fn new(begin: Timestamp, end: Timestamp) -> Self {
        Self {
            begin_time: begin,
            end_time: end,
            delete_begin_time: begin,
            delete_end_time: end,
        }
    }

    /// Returns true when no live rows remain to scan.
    #[must_use]
    pub const fn is_live_exhausted(&self) -> bool {
        self.begin_time >= self.end_time
    }

    /// Returns true when no tombstones remain to scan.
    #[must_use]
    pub const fn is_deleted_exhausted(&self) -> bool {
        self.delete_begin_time >= self.delete_end_time
    }

    /// Returns true when both windows are exhausted.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.is_live_exhausted() && self.is_deleted_exhausted()
    }
}
