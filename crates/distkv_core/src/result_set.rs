//! Thread-safe cursor over a storage result handle.
//!
//! A [`ResultCursor`] owns the handle produced by executing a query and keeps
//! a reference to the engine that must release it. Reads share a read lock;
//! [`ResultCursor::close`] takes the write lock. Once closed, every read
//! returns [`CoreError::AlreadyClosed`].

use crate::error::{CoreError, CoreResult};
use distkv_codec::Entry;
use distkv_storage::{ResultHandle, StorageEngine};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

struct Open {
    handle: Box<dyn ResultHandle>,
    store: Arc<dyn StorageEngine>,
}

/// A cursor over the rows selected by a query.
///
/// # Thread Safety
///
/// `ResultCursor` is `Send + Sync`. Any number of threads may navigate and
/// read concurrently; position changes are serialized by the handle.
pub struct ResultCursor {
    state: RwLock<Option<Open>>,
}

impl ResultCursor {
    /// Wraps a handle that `store` produced and must later release.
    pub fn new(handle: Box<dyn ResultHandle>, store: Arc<dyn StorageEngine>) -> Self {
        Self {
            state: RwLock::new(Some(Open { handle, store })),
        }
    }

    fn read<T>(&self, op: &'static str, f: impl FnOnce(&dyn ResultHandle) -> T) -> CoreResult<T> {
        let state = self.state.read();
        let open = state.as_ref().ok_or(CoreError::AlreadyClosed)?;
        tracing::trace!(op, id = open.handle.id(), "result set read");
        Ok(f(open.handle.as_ref()))
    }

    /// Number of rows.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn count(&self) -> CoreResult<usize> {
        self.read("count", |h| h.count())
    }

    /// Current position, `-1` before the first row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn position(&self) -> CoreResult<i64> {
        self.read("position", |h| h.position())
    }

    /// Moves to the first row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn move_to_first(&self) -> CoreResult<bool> {
        self.read("move_to_first", |h| h.move_to_first())
    }

    /// Moves to the last row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn move_to_last(&self) -> CoreResult<bool> {
        self.read("move_to_last", |h| h.move_to_last())
    }

    /// Moves to the next row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn move_to_next(&self) -> CoreResult<bool> {
        self.read("move_to_next", |h| h.move_to_next())
    }

    /// Moves to the previous row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn move_to_previous(&self) -> CoreResult<bool> {
        self.read("move_to_previous", |h| h.move_to_previous())
    }

    /// Moves `offset` rows from the current position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn move_by(&self, offset: i64) -> CoreResult<bool> {
        self.read("move_by", |h| h.move_by(offset))
    }

    /// Moves to an absolute position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn move_to_position(&self, position: i64) -> CoreResult<bool> {
        self.read("move_to_position", |h| h.move_to_position(position))
    }

    /// Returns true on the first row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn is_first(&self) -> CoreResult<bool> {
        self.read("is_first", |h| h.is_first())
    }

    /// Returns true on the last row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn is_last(&self) -> CoreResult<bool> {
        self.read("is_last", |h| h.is_last())
    }

    /// Returns true before the first row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn is_before_first(&self) -> CoreResult<bool> {
        self.read("is_before_first", |h| h.is_before_first())
    }

    /// Returns true after the last row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close.
    pub fn is_after_last(&self) -> CoreResult<bool> {
        self.read("is_after_last", |h| h.is_after_last())
    }

    /// Reads the entry at the current position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyClosed`] after a successful close, or
    /// [`CoreError::ReadEntry`] carrying the position if the read fails.
    pub fn entry(&self) -> CoreResult<Entry> {
        self.read("entry", |h| {
            h.entry().map_err(|source| {
                let position = h.position();
                let err = CoreError::ReadEntry { position, source };
                tracing::error!(status = %err.status(), position, "failed to read entry");
                err
            })
        })?
    }

    /// Releases the handle.
    ///
    /// Closing an already closed cursor succeeds without doing anything. If
    /// the engine refuses the release the cursor stays open and the call can
    /// be retried.
    ///
    /// # Errors
    ///
    /// Propagates the engine's release failure.
    pub fn close(&self) -> CoreResult<()> {
        let mut state = self.state.write();
        let Some(open) = state.as_ref() else {
            return Ok(());
        };

        if let Err(e) = open.store.close_result_set(open.handle.as_ref()) {
            tracing::error!(id = open.handle.id(), error = %e, "failed to close result set");
            return Err(e.into());
        }
        tracing::debug!(id = open.handle.id(), "result set closed");
        *state = None;
        Ok(())
    }

    /// Returns true once the cursor has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.read().is_none()
    }
}

impl Drop for ResultCursor {
    fn drop(&mut self) {
        if let Some(open) = self.state.get_mut().take() {
            if let Err(e) = open.store.close_result_set(open.handle.as_ref()) {
                tracing::warn!(id = open.handle.id(), error = %e, "result set dropped without release");
            }
        }
    }
}

impl fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        let mut s = f.debug_struct("ResultCursor");
        match state.as_ref() {
            Some(open) => s.field("id", &open.handle.id()).field("count", &open.handle.count()),
            None => s.field("closed", &true),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;
    use distkv_storage::{InMemoryEngine, Query};
    use std::thread;

    fn engine_with(n: u8) -> Arc<InMemoryEngine> {
        let engine = Arc::new(InMemoryEngine::new());
        for i in 0..n {
            engine.put(vec![i], vec![i + 100], Default::default());
        }
        engine
    }

    fn cursor(engine: &Arc<InMemoryEngine>) -> ResultCursor {
        let handle = engine.open_result_set(&Query::new()).unwrap();
        ResultCursor::new(handle, engine.clone())
    }

    #[test]
    fn navigation_and_entries() {
        let engine = engine_with(3);
        let cursor = cursor(&engine);

        assert_eq!(cursor.count().unwrap(), 3);
        assert!(cursor.is_before_first().unwrap());
        assert!(cursor.move_to_next().unwrap());
        assert!(cursor.is_first().unwrap());
        assert_eq!(cursor.entry().unwrap(), Entry::new(vec![0], vec![100]));

        assert!(cursor.move_to_last().unwrap());
        assert!(cursor.is_last().unwrap());
        assert!(!cursor.move_to_next().unwrap());
        assert!(cursor.is_after_last().unwrap());

        assert!(cursor.move_to_position(1).unwrap());
        assert!(cursor.move_to_previous().unwrap());
        assert!(cursor.move_by(2).unwrap());
        assert_eq!(cursor.position().unwrap(), 2);
    }

    #[test]
    fn entry_failure_carries_position() {
        let engine = engine_with(1);
        let cursor = cursor(&engine);
        let err = cursor.entry().unwrap_err();
        assert!(matches!(err, CoreError::ReadEntry { position: -1, .. }));
        assert_eq!(err.status(), Status::NotFound);
    }

    #[test]
    fn reads_after_close_are_already_closed() {
        let engine = engine_with(2);
        let cursor = cursor(&engine);
        cursor.close().unwrap();

        assert!(cursor.is_closed());
        assert!(matches!(cursor.count(), Err(CoreError::AlreadyClosed)));
        assert!(matches!(cursor.move_to_next(), Err(CoreError::AlreadyClosed)));
        assert!(matches!(cursor.entry(), Err(CoreError::AlreadyClosed)));
        assert_eq!(cursor.count().unwrap_err().status(), Status::AlreadyClosed);

        // Second close is a no-op.
        cursor.close().unwrap();
        assert_eq!(engine.open_result_set_count(), 0);
    }

    #[test]
    fn failed_close_keeps_cursor_open() {
        let engine = engine_with(2);
        let cursor = cursor(&engine);

        engine.fail_next_close();
        assert!(cursor.close().is_err());
        assert!(!cursor.is_closed());
        assert_eq!(cursor.count().unwrap(), 2);
        assert_eq!(engine.open_result_set_count(), 1);

        cursor.close().unwrap();
        assert_eq!(engine.open_result_set_count(), 0);
    }

    #[test]
    fn drop_releases_handle() {
        let engine = engine_with(1);
        {
            let _cursor = cursor(&engine);
            assert_eq!(engine.open_result_set_count(), 1);
        }
        assert_eq!(engine.open_result_set_count(), 0);

        let closed = cursor(&engine);
        closed.close().unwrap();
        drop(closed);
        assert_eq!(engine.open_result_set_count(), 0);
    }

    #[test]
    fn concurrent_readers_and_close() {
        let engine = engine_with(50);
        let cursor = Arc::new(cursor(&engine));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cursor = Arc::clone(&cursor);
                thread::spawn(move || {
                    let mut reads = 0;
                    loop {
                        match cursor.move_to_next() {
                            Ok(true) => reads += 1,
                            Ok(false) => {
                                cursor.move_to_first().ok();
                            }
                            Err(CoreError::AlreadyClosed) => return reads,
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                        if reads > 500 {
                            return reads;
                        }
                    }
                })
            })
            .collect();

        cursor.close().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert!(matches!(cursor.position(), Err(CoreError::AlreadyClosed)));
        assert_eq!(engine.open_result_set_count(), 0);
    }
}
