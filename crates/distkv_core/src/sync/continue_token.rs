//! Resumable two-phase change scan over one table.
//!
//! A [`ContinueToken`] first walks a table's live rows by timestamp, then
//! the tombstones in its changelog. Each consumed row moves the matching
//! watermark past its timestamp, so the next statement never returns it
//! again. The token is driven by one sync session at a time and carries no
//! lock of its own.

use super::time_range::SyncTimeRange;
use crate::error::{CoreError, CoreResult};
use distkv_codec::{from_cbor, to_cbor};
use distkv_storage::{
    changelog_table_name, DataItem, Query, Statement, StorageEngine, Timestamp, MAX_TIMESTAMP,
    TOMBSTONE_RANGE_PREDICATE,
};
use serde::{Deserialize, Serialize};

/// Marker written at the start of every valid token.
pub const MAGIC_BEGIN: u32 = 0x600D_0AC7;

/// Marker written at the end of every valid token.
pub const MAGIC_END: u32 = 0x0AC7_600D;

/// Which part of the change history a token is scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Live rows, by row timestamp.
    Live,
    /// Tombstones, from the changelog.
    Deleted,
}

/// Continuation state of an incremental sync over one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueToken {
    magic_begin: u32,
    query: Query,
    table: String,
    range: SyncTimeRange,
    phase: Phase,
    magic_end: u32,
}

impl ContinueToken {
    /// Creates a token in the live phase.
    ///
    /// A query without a table is scoped to `table`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgs`] if the query is already scoped to
    /// another table: both phases must read the same table.
    pub fn new(
        table: impl Into<String>,
        mut query: Query,
        range: SyncTimeRange,
    ) -> CoreResult<Self> {
        let table = table.into();
        match query.table_name() {
            None => {
                query.from_table(table.as_str());
            }
            Some(scoped) if scoped != table => {
                return Err(CoreError::invalid_args(format!(
                    "query is scoped to table {scoped}, not {table}"
                )));
            }
            Some(_) => {}
        }
        Ok(Self {
            magic_begin: MAGIC_BEGIN,
            query,
            table,
            range,
            phase: Phase::Live,
            magic_end: MAGIC_END,
        })
    }

    /// Returns true if both markers hold their expected values.
    ///
    /// A token failing this check must not be used further.
    #[must_use]
    pub fn check_valid(&self) -> bool {
        let valid = self.magic_begin == MAGIC_BEGIN && self.magic_end == MAGIC_END;
        if !valid {
            tracing::error!(
                magic_begin = self.magic_begin,
                magic_end = self.magic_end,
                "continuation token failed validation"
            );
        }
        valid
    }

    /// Like [`ContinueToken::check_valid`], as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidToken`] if a marker does not match.
    pub fn ensure_valid(&self) -> CoreResult<()> {
        if self.check_valid() {
            Ok(())
        } else {
            Err(CoreError::invalid_token("marker mismatch"))
        }
    }

    /// Builds the bound statement for the current phase.
    ///
    /// The live phase selects the query's rows in `[begin_time, end_time)`.
    /// The deleted phase selects changelog tombstones in
    /// `[delete_begin_time, delete_end_time)`. Both are ascending by
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Propagates engine failures to prepare or bind the statement.
    pub fn next_statement(&self, engine: &dyn StorageEngine) -> CoreResult<Statement> {
        match self.phase {
            Phase::Live => {
                let stmt =
                    engine.prepare_query_range(&self.query, self.range.begin_time, self.range.end_time)?;
                Ok(stmt)
            }
            Phase::Deleted => {
                let sql = format!(
                    "SELECT * FROM {} WHERE {TOMBSTONE_RANGE_PREDICATE} ORDER BY timestamp ASC;",
                    changelog_table_name(&self.table)
                );
                let mut stmt = engine.prepare(&sql)?;
                stmt.bind_timestamp(1, self.range.delete_begin_time)?;
                stmt.bind_timestamp(2, self.range.delete_end_time)?;
                Ok(stmt)
            }
        }
    }

    /// Advances the current phase's watermark past a consumed row.
    ///
    /// In the deleted phase only rows carrying the delete flag move the
    /// watermark: a tombstone sharing the timestamp of a flagless row may
    /// still be pending.
    pub fn record_consumed(&mut self, item: &DataItem) {
        let next = next_watermark(item.timestamp);
        match self.phase {
            Phase::Live => {
                self.range.begin_time = self.range.begin_time.max(next);
            }
            Phase::Deleted if item.is_deleted() => {
                self.range.delete_begin_time = self.range.delete_begin_time.max(next);
            }
            Phase::Deleted => {}
        }
    }

    /// Closes the current phase once its statement is exhausted.
    ///
    /// Finishing the live phase moves the token to the deleted phase.
    pub fn finish_current_phase(&mut self) {
        match self.phase {
            Phase::Live => {
                self.range.end_time = 0;
                self.phase = Phase::Deleted;
                tracing::debug!(table = %self.table, "live phase finished");
            }
            Phase::Deleted => {
                self.range.delete_end_time = 0;
                tracing::debug!(table = %self.table, "deleted phase finished");
            }
        }
    }

    /// Returns true once both phases are exhausted.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.range.is_finished()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Current windows.
    #[must_use]
    pub const fn time_range(&self) -> &SyncTimeRange {
        &self.range
    }

    /// Table being synchronized.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Query scoping the live phase.
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Serializes the token for resumption in a later session.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidToken`] for a token failing validation, or
    /// a codec error if encoding fails.
    pub fn to_checkpoint(&self) -> CoreResult<Vec<u8>> {
        self.ensure_valid()?;
        Ok(to_cbor(self)?)
    }

    /// Restores a token written by [`ContinueToken::to_checkpoint`].
    ///
    /// # Errors
    ///
    /// Returns a codec error for malformed bytes and
    /// [`CoreError::InvalidToken`] if the restored markers do not match.
    pub fn from_checkpoint(bytes: &[u8]) -> CoreResult<Self> {
        let token: Self = from_cbor(bytes)?;
        token.ensure_valid()?;
        Ok(token)
    }
}

fn next_watermark(timestamp: Timestamp) -> Timestamp {
    timestamp.saturating_add(1).min(MAX_TIMESTAMP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use distkv_storage::{InMemoryEngine, StatementSource, DELETE_FLAG, LOCAL_FLAG};
    use proptest::prelude::*;

    fn token(begin: Timestamp, end: Timestamp) -> ContinueToken {
        ContinueToken::new("T", Query::new(), SyncTimeRange::new(begin, end)).unwrap()
    }

    fn engine_with_table() -> InMemoryEngine {
        let engine = InMemoryEngine::new();
        for ts in [10, 20, 30] {
            engine.put_row("T", vec![ts as u8], vec![1], Default::default(), ts);
        }
        engine.create_distributed_table("T").unwrap();
        engine
    }

    #[test]
    fn new_token_is_valid_and_scoped() {
        let token = token(0, 100);
        assert!(token.check_valid());
        assert_eq!(token.phase(), Phase::Live);
        assert_eq!(token.query().table_name(), Some("T"));
        assert_eq!(token.table_name(), "T");
    }

    #[test]
    fn query_scoped_to_other_table_is_rejected() {
        let mut query = Query::new();
        query.from_table("U");
        let err = ContinueToken::new("T", query.clone(), SyncTimeRange::new(0, 10)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgs { .. }));

        let token = ContinueToken::new("U", query, SyncTimeRange::new(0, 10)).unwrap();
        assert_eq!(token.table_name(), "U");
        assert_eq!(token.query().table_name(), Some("U"));
    }

    #[test]
    fn corrupted_markers_fail_validation() {
        let mut bad = token(0, 100);
        bad.magic_end = 0xDEAD_BEEF;
        assert!(!bad.check_valid());
        assert!(matches!(bad.ensure_valid(), Err(CoreError::InvalidToken { .. })));
        assert!(bad.to_checkpoint().is_err());

        let mut bad = token(0, 100);
        bad.magic_begin = 0;
        let bytes = to_cbor(&bad).unwrap();
        assert!(matches!(
            ContinueToken::from_checkpoint(&bytes),
            Err(CoreError::InvalidToken { .. })
        ));
    }

    #[test]
    fn checkpoint_resumes_state() {
        let mut token = token(0, 100);
        token.record_consumed(&DataItem::live(b"k".to_vec(), b"v".to_vec(), 41));
        token.finish_current_phase();

        let restored = ContinueToken::from_checkpoint(&token.to_checkpoint().unwrap()).unwrap();
        assert_eq!(restored, token);
        assert_eq!(restored.phase(), Phase::Deleted);
        assert!(ContinueToken::from_checkpoint(b"garbage").is_err());
    }

    #[test]
    fn live_then_deleted_scenario() {
        let engine = engine_with_table();
        let mut token = token(0, 100);

        let live = token.next_statement(&engine).unwrap();
        assert!(matches!(live.source(), StatementSource::QueryRange(_)));
        assert_eq!((live.param(1), live.param(2)), (Some(0), Some(100)));

        for item in engine.step(&live, 10).unwrap() {
            token.record_consumed(&item);
        }
        assert_eq!(token.time_range().begin_time, 31);

        token.finish_current_phase();
        assert_eq!(token.time_range().end_time, 0);
        assert_eq!(token.phase(), Phase::Deleted);
        assert!(!token.is_finished());

        let deleted = token.next_statement(&engine).unwrap();
        assert_eq!(
            deleted.sql_text(),
            "SELECT * FROM naturalbase_rdb_aux_T_log WHERE timestamp >= ? AND timestamp < ? \
             AND (flag&0x03 = 0x03) ORDER BY timestamp ASC;"
        );
        assert_eq!((deleted.param(1), deleted.param(2)), (Some(0), Some(100)));
        assert!(engine.step(&deleted, 10).unwrap().is_empty());

        token.finish_current_phase();
        assert_eq!(token.time_range().delete_end_time, 0);
        assert!(token.is_finished());
    }

    #[test]
    fn flagless_row_does_not_move_delete_watermark() {
        let mut token = token(0, 100);
        token.finish_current_phase();

        let flagless = DataItem {
            key: b"k".to_vec(),
            value: Vec::new(),
            timestamp: 50,
            flag: LOCAL_FLAG,
        };
        token.record_consumed(&flagless);
        assert_eq!(token.time_range().delete_begin_time, 0);

        token.record_consumed(&DataItem::tombstone(b"k".to_vec(), 50));
        assert_eq!(token.time_range().delete_begin_time, 51);

        let remote_delete = DataItem {
            flag: DELETE_FLAG,
            timestamp: 60,
            ..DataItem::default()
        };
        token.record_consumed(&remote_delete);
        assert_eq!(token.time_range().delete_begin_time, 61);
    }

    #[test]
    fn watermark_saturates_at_max() {
        let mut token = token(0, MAX_TIMESTAMP);
        token.record_consumed(&DataItem::live(b"k".to_vec(), b"v".to_vec(), MAX_TIMESTAMP));
        assert_eq!(token.time_range().begin_time, MAX_TIMESTAMP);
        token.record_consumed(&DataItem::live(b"k".to_vec(), b"v".to_vec(), u64::MAX));
        assert_eq!(token.time_range().begin_time, MAX_TIMESTAMP);
        assert!(token.time_range().is_live_exhausted());
    }

    #[test]
    fn deleted_statement_requires_changelog() {
        let engine = InMemoryEngine::new();
        engine.put_row("T", b"a".to_vec(), vec![], Default::default(), 1);
        let mut token = token(0, 10);
        assert!(token.next_statement(&engine).is_ok());
        token.finish_current_phase();
        assert!(token.next_statement(&engine).is_err());
    }

    fn data_item() -> impl Strategy<Value = DataItem> {
        (any::<u64>(), 0..4u64).prop_map(|(timestamp, flag)| DataItem {
            key: Vec::new(),
            value: Vec::new(),
            timestamp,
            flag,
        })
    }

    proptest! {
        #[test]
        fn watermarks_never_decrease(
            items in prop::collection::vec(data_item(), 0..40),
            switch_at in 0usize..40,
        ) {
            let mut token = token(0, MAX_TIMESTAMP);
            let mut last = *token.time_range();
            for (i, item) in items.iter().enumerate() {
                if i == switch_at {
                    token.finish_current_phase();
                    last = *token.time_range();
                }
                token.record_consumed(item);
                let now = *token.time_range();
                prop_assert!(now.begin_time >= last.begin_time);
                prop_assert!(now.delete_begin_time >= last.delete_begin_time);
                prop_assert!(now.begin_time <= MAX_TIMESTAMP);
                prop_assert!(now.delete_begin_time <= MAX_TIMESTAMP);
                last = now;
            }
        }
    }
}
