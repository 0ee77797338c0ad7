//! In-memory storage engine for tests and tooling.

mod eval;
mod result_set;

pub use result_set::MemoryResultSet;

use crate::engine::{EngineConfig, ResultHandle, StorageEngine};
use crate::error::{StorageError, StorageResult};
use crate::query::Query;
use crate::statement::{
    changelog_table_name, DataItem, Statement, StatementSource, Timestamp, LOCAL_FLAG,
    RELATIONAL_PREFIX, TOMBSTONE_MASK, TOMBSTONE_RANGE_PREDICATE,
};
use distkv_codec::{Entry, FieldRecord};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct Row {
    value: Vec<u8>,
    fields: FieldRecord,
    timestamp: Timestamp,
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<Vec<u8>, Row>,
    /// One changelog row per key, present once the table is distributed.
    changelog: Option<BTreeMap<Vec<u8>, DataItem>>,
}

/// An in-memory storage engine.
///
/// Holds a key/value space plus named relational tables. Distributed tables
/// keep a changelog where deletes leave tombstones.
///
/// # Thread Safety
///
/// All state sits behind locks; the engine can be shared across threads.
///
/// # Example
///
/// ```rust
/// use distkv_storage::{InMemoryEngine, Query, ResultHandle, StorageEngine};
///
/// let engine = InMemoryEngine::new();
/// engine.put(b"k1".to_vec(), b"v1".to_vec(), Default::default());
///
/// let handle = engine.open_result_set(&Query::new()).unwrap();
/// assert_eq!(handle.count(), 1);
/// engine.close_result_set(handle.as_ref()).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    config: EngineConfig,
    kv: RwLock<BTreeMap<Vec<u8>, Row>>,
    tables: RwLock<HashMap<String, Table>>,
    open_handles: Mutex<HashSet<u64>>,
    next_handle: AtomicU64,
    fail_next_close: AtomicBool,
}

impl InMemoryEngine {
    /// Creates an empty engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty engine with the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Inserts or replaces a key/value entry with its typed fields.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>, fields: FieldRecord) {
        self.kv.write().insert(
            key,
            Row {
                value,
                fields,
                timestamp: 0,
            },
        );
    }

    /// Removes a key/value entry. Returns true if it existed.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.kv.write().remove(key).is_some()
    }

    /// Inserts or replaces a row in a relational table, creating the table
    /// if needed. Distributed tables record the write in their changelog.
    pub fn put_row(
        &self,
        table: &str,
        key: Vec<u8>,
        value: Vec<u8>,
        fields: FieldRecord,
        timestamp: Timestamp,
    ) {
        let mut tables = self.tables.write();
        let t = tables.entry(table.to_string()).or_default();
        if let Some(log) = t.changelog.as_mut() {
            log.insert(key.clone(), DataItem::live(key.clone(), value.clone(), timestamp));
        }
        t.rows.insert(
            key,
            Row {
                value,
                fields,
                timestamp,
            },
        );
    }

    /// Deletes a row from a relational table. Distributed tables keep a
    /// tombstone stamped with `timestamp`. Returns true if the row existed.
    pub fn delete_row(&self, table: &str, key: &[u8], timestamp: Timestamp) -> bool {
        let mut tables = self.tables.write();
        let Some(t) = tables.get_mut(table) else {
            return false;
        };
        let existed = t.rows.remove(key).is_some();
        if existed {
            if let Some(log) = t.changelog.as_mut() {
                log.insert(key.to_vec(), DataItem::tombstone(key.to_vec(), timestamp));
            }
        }
        existed
    }

    /// Number of result sets currently open.
    #[must_use]
    pub fn open_result_set_count(&self) -> usize {
        self.open_handles.lock().len()
    }

    /// Makes the next [`StorageEngine::close_result_set`] call fail with
    /// [`StorageError::Busy`].
    pub fn fail_next_close(&self) {
        self.fail_next_close.store(true, Ordering::SeqCst);
    }

    fn select_entries(&self, query: &Query) -> StorageResult<Vec<Entry>> {
        let mut rows: Vec<(Vec<u8>, Row)> = match query.table_name() {
            None => self
                .kv
                .read()
                .iter()
                .map(|(k, r)| (k.clone(), r.clone()))
                .collect(),
            Some(name) => {
                let tables = self.tables.read();
                let table = tables
                    .get(name)
                    .ok_or_else(|| StorageError::table_not_found(name))?;
                table
                    .rows
                    .iter()
                    .map(|(k, r)| (k.clone(), r.clone()))
                    .collect()
            }
        };

        rows.retain(|(key, row)| {
            eval::matches_key(query.key_filter(), key) && eval::matches_nodes(query.nodes(), &row.fields)
        });

        if !query.order().is_empty() {
            // Stable sort keeps key order between equal rows.
            rows.sort_by(|(_, a), (_, b)| eval::compare_records(query.order(), &a.fields, &b.fields));
        }

        let (offset, count) = query
            .result_limit()
            .map_or((0, usize::MAX), |l| (l.offset, l.count));

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(count)
            .map(|(key, row)| Entry::new(key, row.value))
            .collect())
    }

    fn step_query_range(
        &self,
        query: &Query,
        begin: i64,
        end: i64,
        limit: usize,
    ) -> StorageResult<Vec<DataItem>> {
        let name = query
            .table_name()
            .ok_or_else(|| StorageError::invalid_args("range query has no table"))?;
        let tables = self.tables.read();
        let table = tables
            .get(name)
            .ok_or_else(|| StorageError::table_not_found(name))?;

        let mut items: Vec<DataItem> = table
            .rows
            .iter()
            .filter(|(_, row)| in_window(row.timestamp, begin, end))
            .filter(|(key, row)| {
                eval::matches_key(query.key_filter(), key)
                    && eval::matches_nodes(query.nodes(), &row.fields)
            })
            .map(|(key, row)| DataItem {
                key: key.clone(),
                value: row.value.clone(),
                timestamp: row.timestamp,
                flag: LOCAL_FLAG,
            })
            .collect();
        items.sort_by_key(|item| item.timestamp);
        items.truncate(limit);
        Ok(items)
    }

    fn step_changelog(
        &self,
        table: &str,
        begin: i64,
        end: i64,
        limit: usize,
    ) -> StorageResult<Vec<DataItem>> {
        let tables = self.tables.read();
        let log = tables
            .get(table)
            .and_then(|t| t.changelog.as_ref())
            .ok_or_else(|| StorageError::table_not_found(changelog_table_name(table)))?;

        let mut items: Vec<DataItem> = log
            .values()
            .filter(|item| in_window(item.timestamp, begin, end))
            .filter(|item| item.flag & TOMBSTONE_MASK == TOMBSTONE_MASK)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.timestamp);
        items.truncate(limit);
        Ok(items)
    }

    /// Resolves the SQL shapes this engine understands to a distributed
    /// table name.
    fn parse_changelog_sql(&self, sql: &str) -> StorageResult<String> {
        let unsupported = || StorageError::not_supported(format!("statement: {sql}"));

        let rest = sql.strip_prefix("SELECT * FROM ").ok_or_else(unsupported)?;
        let (log_name, clause) = rest.split_once(' ').ok_or_else(unsupported)?;
        let expected = format!("WHERE {TOMBSTONE_RANGE_PREDICATE} ORDER BY timestamp ASC;");
        if clause != expected {
            return Err(unsupported());
        }

        let table = log_name
            .strip_prefix(RELATIONAL_PREFIX)
            .and_then(|s| s.strip_suffix("_log"))
            .ok_or_else(|| StorageError::table_not_found(log_name))?;

        let tables = self.tables.read();
        match tables.get(table) {
            Some(t) if t.changelog.is_some() => Ok(table.to_string()),
            _ => Err(StorageError::table_not_found(log_name)),
        }
    }
}

fn in_window(timestamp: Timestamp, begin: i64, end: i64) -> bool {
    let Ok(ts) = i64::try_from(timestamp) else {
        return false;
    };
    ts >= begin && ts < end
}

fn bound_window(statement: &Statement) -> StorageResult<(i64, i64)> {
    match (statement.param(1), statement.param(2)) {
        (Some(begin), Some(end)) if statement.is_fully_bound() => Ok((begin, end)),
        _ => Err(StorageError::invalid_args("statement has unbound parameters")),
    }
}

impl StorageEngine for InMemoryEngine {
    fn open_result_set(&self, query: &Query) -> StorageResult<Box<dyn ResultHandle>> {
        let entries = self.select_entries(query)?;

        let mut open = self.open_handles.lock();
        if open.len() >= self.config.max_result_sets {
            return Err(StorageError::OverMaxLimits {
                limit: self.config.max_result_sets,
            });
        }
        let id = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        open.insert(id);
        tracing::trace!(id, rows = entries.len(), "opened result set");

        Ok(Box::new(MemoryResultSet::new(id, entries)))
    }

    fn close_result_set(&self, handle: &dyn ResultHandle) -> StorageResult<()> {
        if self.fail_next_close.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Busy);
        }
        let id = handle.id();
        if self.open_handles.lock().remove(&id) {
            tracing::trace!(id, "closed result set");
            Ok(())
        } else {
            Err(StorageError::HandleNotOpen { id })
        }
    }

    fn prepare(&self, sql: &str) -> StorageResult<Statement> {
        self.parse_changelog_sql(sql)?;
        Ok(Statement::sql(sql))
    }

    fn prepare_query_range(
        &self,
        query: &Query,
        begin: Timestamp,
        end: Timestamp,
    ) -> StorageResult<Statement> {
        let name = query
            .table_name()
            .ok_or_else(|| StorageError::invalid_args("range query has no table"))?;
        if !self.tables.read().contains_key(name) {
            return Err(StorageError::table_not_found(name));
        }

        let mut statement = Statement::query_range(query.clone());
        statement.bind_timestamp(1, begin)?;
        statement.bind_timestamp(2, end)?;
        Ok(statement)
    }

    fn step(&self, statement: &Statement, limit: usize) -> StorageResult<Vec<DataItem>> {
        let (begin, end) = bound_window(statement)?;
        match statement.source() {
            StatementSource::QueryRange(query) => self.step_query_range(query, begin, end, limit),
            StatementSource::Sql => {
                let table = self.parse_changelog_sql(statement.sql_text())?;
                self.step_changelog(&table, begin, end, limit)
            }
        }
    }

    fn create_distributed_table(&self, table: &str) -> StorageResult<()> {
        if table.is_empty() || table.contains(char::is_whitespace) {
            return Err(StorageError::invalid_args(format!("invalid table name: {table:?}")));
        }

        let mut tables = self.tables.write();
        let t = tables.entry(table.to_string()).or_default();
        if t.changelog.is_none() {
            // Existing rows enter the changelog at their current timestamps.
            let log = t
                .rows
                .iter()
                .map(|(k, r)| (k.clone(), DataItem::live(k.clone(), r.value.clone(), r.timestamp)))
                .collect();
            t.changelog = Some(log);
            tracing::debug!(table, "created changelog");
        }
        Ok(())
    }
}
