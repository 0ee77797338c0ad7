//! Entry point tying translation, cursors and sync together.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::predicate::{extract_keys, translate, Operation};
use crate::result_set::ResultCursor;
use crate::sync::{fetch_sync_data, ContinueToken, SyncTimeRange};
use distkv_codec::{decode_entries, Entry, FieldRecord};
use distkv_storage::{DataItem, Query, StorageEngine};
use std::fmt;
use std::sync::Arc;

/// A key/value store over a storage engine.
///
/// # Example
///
/// ```rust
/// use distkv_core::{KvStore, Operation};
/// use distkv_storage::InMemoryEngine;
/// use std::sync::Arc;
///
/// let engine = Arc::new(InMemoryEngine::new());
/// engine.put(b"a".to_vec(), b"1".to_vec(), Default::default());
///
/// let store = KvStore::new(engine);
/// let cursor = store.result_set_for(&[Operation::key_prefix("a")]).unwrap();
/// assert_eq!(cursor.count().unwrap(), 1);
/// cursor.close().unwrap();
/// ```
pub struct KvStore {
    engine: Arc<dyn StorageEngine>,
    config: Config,
}

impl KvStore {
    /// Creates a store with default configuration.
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self::with_config(engine, Config::default())
    }

    /// Creates a store with the given configuration.
    pub fn with_config(engine: Arc<dyn StorageEngine>, config: Config) -> Self {
        Self { engine, config }
    }

    /// The store configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Executes a query and returns a cursor over its rows.
    ///
    /// # Errors
    ///
    /// Propagates engine failures, including the open result set limit.
    pub fn result_set(&self, query: &Query) -> CoreResult<ResultCursor> {
        let handle = self.engine.open_result_set(query).map_err(|e| {
            tracing::error!(error = %e, "failed to open result set");
            CoreError::from(e)
        })?;
        Ok(ResultCursor::new(handle, Arc::clone(&self.engine)))
    }

    /// Translates a predicate and executes it.
    ///
    /// # Errors
    ///
    /// Fails on translation errors before anything is executed, then as
    /// [`KvStore::result_set`].
    pub fn result_set_for(&self, operations: &[Operation]) -> CoreResult<ResultCursor> {
        let query = translate(operations)?;
        self.result_set(&query)
    }

    /// Extracts the keys of a key-set predicate.
    ///
    /// # Errors
    ///
    /// See [`extract_keys`].
    pub fn keys_for(&self, operations: &[Operation]) -> CoreResult<Vec<Vec<u8>>> {
        extract_keys(operations)
    }

    /// Converts field records into entries.
    ///
    /// # Errors
    ///
    /// Fails at the first record missing `key` or `value`.
    pub fn entries_from(&self, records: &[FieldRecord]) -> CoreResult<Vec<Entry>> {
        Ok(decode_entries(records)?)
    }

    /// Starts a sync session over `table` covering the configured window.
    ///
    /// # Errors
    ///
    /// See [`ContinueToken::new`].
    pub fn start_sync(&self, table: impl Into<String>, query: Query) -> CoreResult<ContinueToken> {
        let range = SyncTimeRange::new(self.config.sync_window_begin, self.config.sync_window_end);
        ContinueToken::new(table, query, range)
    }

    /// Pulls the next batch of changes using the configured batch size.
    ///
    /// # Errors
    ///
    /// See [`fetch_sync_data`].
    pub fn pull(&self, token: &mut ContinueToken) -> CoreResult<Vec<DataItem>> {
        fetch_sync_data(self.engine.as_ref(), token, self.config.sync_batch_size)
    }
}

impl fmt::Debug for KvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvStore").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use distkv_codec::{encode_field, FieldValue};
    use distkv_storage::{EngineConfig, InMemoryEngine, StorageError};

    #[test]
    fn translation_errors_open_nothing() {
        let engine = Arc::new(InMemoryEngine::new());
        let store = KvStore::new(engine.clone());
        let err = store
            .result_set_for(&[Operation::with_code(99, "", Vec::new())])
            .unwrap_err();
        assert!(matches!(err, CoreError::NotSupported { code: 99 }));
        assert_eq!(engine.open_result_set_count(), 0);
    }

    #[test]
    fn open_limit_surfaces_as_storage_error() {
        let engine = Arc::new(InMemoryEngine::with_config(EngineConfig::new().max_result_sets(1)));
        let store = KvStore::new(engine);
        let _held = store.result_set(&Query::new()).unwrap();
        assert!(matches!(
            store.result_set(&Query::new()),
            Err(CoreError::Storage(StorageError::OverMaxLimits { limit: 1 }))
        ));
    }

    #[test]
    fn entries_from_records() {
        let store = KvStore::new(Arc::new(InMemoryEngine::new()));
        let mut record = FieldRecord::new();
        record.insert("key".into(), FieldValue::Text("k".into()));
        record.insert("value".into(), FieldValue::Integer(7));

        let entries = store.entries_from(&[record.clone()]).unwrap();
        assert_eq!(entries[0].key, encode_field(&FieldValue::Text("k".into())));
        assert_eq!(entries[0].value, encode_field(&FieldValue::Integer(7)));

        record.remove("value");
        assert!(matches!(store.entries_from(&[record]), Err(CoreError::Codec(_))));
    }

    #[test]
    fn sync_uses_configured_window_and_batch() {
        let engine = Arc::new(InMemoryEngine::new());
        engine.create_distributed_table("T").unwrap();
        for ts in [5u64, 15, 25] {
            engine.put_row("T", vec![ts as u8], vec![], Default::default(), ts);
        }

        let config = Config::new().sync_window(10, 100).sync_batch_size(1);
        let store = KvStore::with_config(engine, config);
        let mut token = store.start_sync("T", Query::new()).unwrap();
        assert_eq!(token.time_range().begin_time, 10);

        assert_eq!(store.pull(&mut token).unwrap()[0].timestamp, 15);
        assert_eq!(store.pull(&mut token).unwrap()[0].timestamp, 25);
        assert!(store.pull(&mut token).unwrap().is_empty());
        assert!(token.is_finished());
    }
}
