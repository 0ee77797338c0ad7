//! Storage engine and result handle traits.

use crate::error::StorageResult;
use crate::query::Query;
use crate::statement::{DataItem, Statement, Timestamp};
use distkv_codec::Entry;

/// A positional result handle produced by executing a [`Query`].
///
/// Positions follow cursor conventions: `-1` is before the first row and
/// `count()` is after the last. Navigation methods take `&self` so a handle
/// can be driven from behind a shared lock; implementations synchronize
/// their own position.
pub trait ResultHandle: Send + Sync {
    /// Engine-unique identifier, used when the handle is closed.
    fn id(&self) -> u64;

    /// Number of rows in the result.
    fn count(&self) -> usize;

    /// Current position.
    fn position(&self) -> i64;

    /// Moves to an absolute position.
    ///
    /// Positions outside `0..count` clamp to `-1` or `count` and return
    /// false.
    fn move_to_position(&self, position: i64) -> bool;

    /// Reads the entry at the current position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] when the position is not on
    /// a row.
    fn entry(&self) -> StorageResult<Entry>;

    /// Moves relative to the current position.
    fn move_by(&self, offset: i64) -> bool {
        self.move_to_position(self.position().saturating_add(offset))
    }

    /// Moves to the first row.
    fn move_to_first(&self) -> bool {
        self.move_to_position(0)
    }

    /// Moves to the last row.
    fn move_to_last(&self) -> bool {
        self.move_to_position(row_count(self) - 1)
    }

    /// Moves to the next row.
    fn move_to_next(&self) -> bool {
        self.move_by(1)
    }

    /// Moves to the previous row.
    fn move_to_previous(&self) -> bool {
        self.move_by(-1)
    }

    /// Returns true on the first row.
    fn is_first(&self) -> bool {
        self.count() > 0 && self.position() == 0
    }

    /// Returns true on the last row.
    fn is_last(&self) -> bool {
        self.count() > 0 && self.position() == row_count(self) - 1
    }

    /// Returns true before the first row, or for an empty result.
    fn is_before_first(&self) -> bool {
        self.count() == 0 || self.position() < 0
    }

    /// Returns true after the last row, or for an empty result.
    fn is_after_last(&self) -> bool {
        self.count() == 0 || self.position() >= row_count(self)
    }
}

fn row_count<H: ResultHandle + ?Sized>(handle: &H) -> i64 {
    i64::try_from(handle.count()).unwrap_or(i64::MAX)
}

/// The storage engine seen from the query and sync layers.
///
/// The engine owns row materialization, result handles and changelog
/// tables. Callers only execute, step and close.
pub trait StorageEngine: Send + Sync {
    /// Executes a query and returns a handle positioned before the first row.
    ///
    /// # Errors
    ///
    /// Fails if the query cannot be executed or too many handles are open.
    fn open_result_set(&self, query: &Query) -> StorageResult<Box<dyn ResultHandle>>;

    /// Releases a handle returned by [`StorageEngine::open_result_set`].
    ///
    /// The caller keeps ownership of the handle when this fails.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unknown or the engine cannot release it now.
    fn close_result_set(&self, handle: &dyn ResultHandle) -> StorageResult<()>;

    /// Prepares raw SQL.
    ///
    /// # Errors
    ///
    /// Fails if the engine does not understand the statement or a referenced
    /// table does not exist.
    fn prepare(&self, sql: &str) -> StorageResult<Statement>;

    /// Prepares a statement selecting the query's rows whose timestamp lies in
    /// `[begin, end)`, ascending by timestamp, with both bounds bound.
    ///
    /// # Errors
    ///
    /// Fails if the query cannot be scoped to a table.
    fn prepare_query_range(
        &self,
        query: &Query,
        begin: Timestamp,
        end: Timestamp,
    ) -> StorageResult<Statement>;

    /// Runs a fully bound statement and returns at most `limit` rows.
    ///
    /// Fewer than `limit` rows means the statement is exhausted.
    ///
    /// # Errors
    ///
    /// Fails if parameters are unbound or the source cannot be read.
    fn step(&self, statement: &Statement, limit: usize) -> StorageResult<Vec<DataItem>>;

    /// Marks a table as distributed, creating its changelog.
    ///
    /// # Errors
    ///
    /// Fails if the table name is invalid.
    fn create_distributed_table(&self, table: &str) -> StorageResult<()>;
}

/// Configuration for the in-memory engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of result sets open at the same time.
    pub max_result_sets: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_result_sets: 8 }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of simultaneously open result sets.
    #[must_use]
    pub const fn max_result_sets(mut self, value: usize) -> Self {
        self.max_result_sets = value;
        self
    }
}
