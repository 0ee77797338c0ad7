//! Materialized result handle for the in-memory engine.

use crate::engine::ResultHandle;
use crate::error::{StorageError, StorageResult};
use distkv_codec::Entry;
use parking_lot::Mutex;

/// A result set whose rows were materialized when the query ran.
#[derive(Debug)]
pub struct MemoryResultSet {
    id: u64,
    entries: Vec<Entry>,
    position: Mutex<i64>,
}

impl MemoryResultSet {
    pub(crate) fn new(id: u64, entries: Vec<Entry>) -> Self {
        Self {
            id,
            entries,
            position: Mutex::new(-1),
        }
    }

    fn len(&self) -> i64 {
        i64::try_from(self.entries.len()).unwrap_or(i64::MAX)
    }
}

impl ResultHandle for MemoryResultSet {
    fn id(&self) -> u64 {
        self.id
    }

    fn count(&self) -> usize {
        self.entries.len()
    }

    fn position(&self) -> i64 {
        *self.position.lock()
    }

    fn move_to_position(&self, position: i64) -> bool {
        let len = self.len();
        let mut current = self.position.lock();
        if position < 0 {
            *current = -1;
            return false;
        }
        if position >= len {
            *current = len;
            return false;
        }
        *current = position;
        true
    }

    fn move_by(&self, offset: i64) -> bool {
        // Read and move under one lock so concurrent readers cannot interleave.
        let len = self.len();
        let mut current = self.position.lock();
        let target = current.saturating_add(offset);
        if target < 0 {
            *current = -1;
            false
        } else if target >= len {
            *current = len;
            false
        } else {
            *current = target;
            true
        }
    }

    fn entry(&self) -> StorageResult<Entry> {
        let position = *self.position.lock();
        usize::try_from(position)
            .ok()
            .and_then(|i| self.entries.get(i))
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_set(n: usize) -> MemoryResultSet {
        let entries = (0..n)
            .map(|i| Entry::new(vec![i as u8], vec![i as u8 * 10]))
            .collect();
        MemoryResultSet::new(1, entries)
    }

    #[test]
    fn starts_before_first() {
        let rs = result_set(3);
        assert_eq!(rs.position(), -1);
        assert!(rs.is_before_first());
        assert!(!rs.is_after_last());
        assert!(matches!(rs.entry(), Err(StorageError::NotFound)));
    }

    #[test]
    fn forward_iteration() {
        let rs = result_set(3);
        let mut seen = Vec::new();
        while rs.move_to_next() {
            seen.push(rs.entry().unwrap().key[0]);
        }
        assert_eq!(seen, vec![0, 1, 2]);
        assert!(rs.is_after_last());
        assert_eq!(rs.position(), 3);
    }

    #[test]
    fn first_last_and_relative_moves() {
        let rs = result_set(4);
        assert!(rs.move_to_last());
        assert!(rs.is_last());
        assert_eq!(rs.position(), 3);

        assert!(rs.move_to_previous());
        assert_eq!(rs.position(), 2);

        assert!(rs.move_by(-2));
        assert!(rs.is_first());

        assert!(!rs.move_by(-5));
        assert_eq!(rs.position(), -1);

        assert!(!rs.move_to_position(10));
        assert_eq!(rs.position(), 4);
        assert!(rs.move_to_first());
        assert_eq!(rs.entry().unwrap().value, vec![0]);
    }

    #[test]
    fn empty_result() {
        let rs = result_set(0);
        assert!(rs.is_before_first());
        assert!(rs.is_after_last());
        assert!(!rs.is_first());
        assert!(!rs.is_last());
        assert!(!rs.move_to_first());
        assert!(!rs.move_to_last());
    }
}
