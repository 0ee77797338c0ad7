//! Prepared statements and the rows they yield.

use crate::error::{StorageError, StorageResult};
use crate::query::Query;
use serde::{Deserialize, Serialize};

/// Logical timestamp of a row modification.
pub type Timestamp = u64;

/// Largest timestamp a statement parameter can carry.
///
/// Parameters are bound as signed 64-bit integers, so timestamps saturate
/// here rather than at `u64::MAX`.
pub const MAX_TIMESTAMP: Timestamp = i64::MAX as Timestamp;

/// Flag bit marking a row as deleted.
pub const DELETE_FLAG: u64 = 0x01;

/// Flag bit marking a row as written on this device.
pub const LOCAL_FLAG: u64 = 0x02;

/// Flag pattern identifying a tombstone in a changelog.
pub const TOMBSTONE_MASK: u64 = DELETE_FLAG | LOCAL_FLAG;

/// Prefix of every auxiliary table the relational engine maintains.
pub const RELATIONAL_PREFIX: &str = "naturalbase_rdb_aux_";

/// Selection predicate for rows inside a timestamp window.
pub const TIME_WINDOW_PREDICATE: &str = "timestamp >= ? AND timestamp < ?";

/// Selection predicate for tombstones inside a timestamp window.
pub const TOMBSTONE_RANGE_PREDICATE: &str =
    "timestamp >= ? AND timestamp < ? AND (flag&0x03 = 0x03)";

/// Returns the name of the changelog table that tracks `table`.
#[must_use]
pub fn changelog_table_name(table: &str) -> String {
    format!("{RELATIONAL_PREFIX}{table}_log")
}

/// A row produced by a sync statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    /// Row key.
    pub key: Vec<u8>,
    /// Row value, empty for tombstones.
    pub value: Vec<u8>,
    /// Modification timestamp.
    pub timestamp: Timestamp,
    /// Flag bits, see [`DELETE_FLAG`] and [`LOCAL_FLAG`].
    pub flag: u64,
}

impl DataItem {
    /// Creates a live row.
    pub fn live(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, timestamp: Timestamp) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            timestamp,
            flag: LOCAL_FLAG,
        }
    }

    /// Creates a tombstone.
    pub fn tombstone(key: impl Into<Vec<u8>>, timestamp: Timestamp) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            timestamp,
            flag: TOMBSTONE_MASK,
        }
    }

    /// Returns true if the delete bit is set.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.flag & DELETE_FLAG != 0
    }

    /// Returns true if the flag matches the tombstone pattern.
    #[must_use]
    pub const fn is_tombstone(&self) -> bool {
        self.flag & TOMBSTONE_MASK == TOMBSTONE_MASK
    }
}

/// What a statement reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementSource {
    /// A structured query restricted to a timestamp window.
    QueryRange(Query),
    /// Raw SQL text understood by the engine.
    Sql,
}

/// A prepared statement with positional `i64` parameters.
///
/// Parameters are numbered from 1, matching SQL placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    source: StatementSource,
    params: Vec<Option<i64>>,
}

impl Statement {
    /// Prepares a raw SQL statement with one parameter slot per `?`.
    pub fn sql(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let slots = sql.matches('?').count();
        Self {
            sql,
            source: StatementSource::Sql,
            params: vec![None; slots],
        }
    }

    /// Prepares a time-windowed query statement with two unbound parameters:
    /// the inclusive lower and exclusive upper timestamp.
    ///
    /// Only the query's filters carry over. Rows always come back ascending
    /// by timestamp, so the query's own ordering and limit are dropped.
    #[must_use]
    pub fn query_range(query: Query) -> Self {
        let table = query.table_name().unwrap_or("kv");
        let filter = query.filter_clause();
        let sql = if filter.is_empty() {
            format!("SELECT * FROM {table} WHERE {TIME_WINDOW_PREDICATE} ORDER BY timestamp ASC")
        } else {
            format!(
                "SELECT * FROM {table} WHERE {filter} AND {TIME_WINDOW_PREDICATE} \
                 ORDER BY timestamp ASC"
            )
        };
        Self {
            sql,
            source: StatementSource::QueryRange(query),
            params: vec![None; 2],
        }
    }

    /// Binds `value` to parameter `index` (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgs`] if the index is out of range.
    pub fn bind_i64(&mut self, index: usize, value: i64) -> StorageResult<()> {
        let count = self.params.len();
        let slot = index
            .checked_sub(1)
            .and_then(|i| self.params.get_mut(i))
            .ok_or_else(|| {
                StorageError::invalid_args(format!(
                    "parameter index {index} out of range 1..={count}"
                ))
            })?;
        *slot = Some(value);
        Ok(())
    }

    /// Binds a timestamp, clamping it to [`MAX_TIMESTAMP`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgs`] if the index is out of range.
    pub fn bind_timestamp(&mut self, index: usize, value: Timestamp) -> StorageResult<()> {
        let clamped = i64::try_from(value).unwrap_or(i64::MAX);
        self.bind_i64(index, clamped)
    }

    /// Returns the bound value of parameter `index` (1-based).
    #[must_use]
    pub fn param(&self, index: usize) -> Option<i64> {
        index
            .checked_sub(1)
            .and_then(|i| self.params.get(i))
            .copied()
            .flatten()
    }

    /// Number of parameter slots.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Returns true when every parameter slot has a value.
    #[must_use]
    pub fn is_fully_bound(&self) -> bool {
        self.params.iter().all(Option::is_some)
    }

    /// SQL text of the statement.
    #[must_use]
    pub fn sql_text(&self) -> &str {
        &self.sql
    }

    /// What the statement reads from.
    #[must_use]
    pub fn source(&self) -> &StatementSource {
        &self.source
    }
}
