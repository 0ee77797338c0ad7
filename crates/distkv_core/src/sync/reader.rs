//! Batch pulls driven by a continuation token.

use super::continue_token::ContinueToken;
use crate::error::{CoreError, CoreResult};
use distkv_storage::{DataItem, Statement, StorageEngine, Timestamp};

/// Pulls up to `batch_size` changed rows, advancing `token`.
///
/// Live rows come first, then tombstones. A statement returning fewer rows
/// than asked for closes its phase, and the pull continues into the next
/// phase while the batch has room. An empty result with a finished token
/// means the session is complete.
///
/// A batch never ends inside a run of rows sharing one timestamp, since the
/// watermark moves past the whole timestamp. Such a run is held back for
/// the next pull, or delivered whole when it alone is wider than the batch.
///
/// # Errors
///
/// Returns [`CoreError::InvalidToken`] if the token fails validation,
/// [`CoreError::InvalidArgs`] for a zero batch size, and propagates engine
/// failures. On error the token is left unchanged.
pub fn fetch_sync_data(
    engine: &dyn StorageEngine,
    token: &mut ContinueToken,
    batch_size: usize,
) -> CoreResult<Vec<DataItem>> {
    token.ensure_valid()?;
    if batch_size == 0 {
        return Err(CoreError::invalid_args("batch size must be positive"));
    }

    let mut working = token.clone();
    let mut batch = Vec::new();
    while !working.is_finished() && batch.len() < batch_size {
        let remaining = batch_size - batch.len();
        let statement = working.next_statement(engine)?;
        // One extra row shows whether the cut splits a timestamp.
        let mut rows = engine.step(&statement, remaining.saturating_add(1))?;

        if rows.len() <= remaining {
            consume(&mut working, &mut batch, rows);
            working.finish_current_phase();
            continue;
        }

        let overflow = rows.split_off(remaining);
        let boundary = match (rows.last(), overflow.first()) {
            (Some(last), Some(next)) if last.timestamp == next.timestamp => last.timestamp,
            _ => {
                consume(&mut working, &mut batch, rows);
                break;
            }
        };

        let run_start = rows
            .iter()
            .position(|row| row.timestamp == boundary)
            .unwrap_or(0);
        if run_start > 0 {
            rows.truncate(run_start);
            consume(&mut working, &mut batch, rows);
        } else if batch.is_empty() {
            let run = whole_run(engine, &statement, remaining, boundary)?;
            tracing::debug!(
                table = working.table_name(),
                timestamp = boundary,
                rows = run.len(),
                "batch extended over shared timestamp"
            );
            consume(&mut working, &mut batch, run);
        }
        break;
    }

    tracing::debug!(
        table = working.table_name(),
        rows = batch.len(),
        finished = working.is_finished(),
        "fetched sync batch"
    );
    *token = working;
    Ok(batch)
}

fn consume(token: &mut ContinueToken, batch: &mut Vec<DataItem>, rows: Vec<DataItem>) {
    for row in rows {
        token.record_consumed(&row);
        batch.push(row);
    }
}

/// Reads every leading row of `statement` stamped `timestamp`.
fn whole_run(
    engine: &dyn StorageEngine,
    statement: &Statement,
    mut limit: usize,
    timestamp: Timestamp,
) -> CoreResult<Vec<DataItem>> {
    loop {
        limit = limit.saturating_mul(2);
        let rows = engine.step(statement, limit)?;
        let run_continues = rows.last().is_some_and(|row| row.timestamp == timestamp);
        if rows.len() < limit || !run_continues {
            return Ok(rows
                .into_iter()
                .take_while(|row| row.timestamp == timestamp)
                .collect());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{Phase, SyncTimeRange};
    use distkv_storage::{InMemoryEngine, Query};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn engine() -> InMemoryEngine {
        let engine = InMemoryEngine::new();
        engine.create_distributed_table("T").unwrap();
        for ts in 1..=5u64 {
            engine.put_row("T", vec![ts as u8], vec![0], Default::default(), ts * 10);
        }
        engine.delete_row("T", &[2], 60);
        engine.delete_row("T", &[4], 70);
        engine
    }

    fn token() -> ContinueToken {
        ContinueToken::new("T", Query::new(), SyncTimeRange::new(0, 1000)).unwrap()
    }

    #[test]
    fn pulls_live_then_tombstones_in_batches() {
        let engine = engine();
        let mut token = token();

        let first = fetch_sync_data(&engine, &mut token, 2).unwrap();
        let stamps: Vec<u64> = first.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![10, 30]);
        assert_eq!(token.phase(), Phase::Live);

        // One live row left, then the batch spills into tombstones.
        let second = fetch_sync_data(&engine, &mut token, 2).unwrap();
        assert_eq!(second[0].timestamp, 50);
        assert!(second[1].is_tombstone());
        assert_eq!(second[1].timestamp, 60);
        assert_eq!(token.phase(), Phase::Deleted);

        let third = fetch_sync_data(&engine, &mut token, 2).unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].timestamp, 70);
        assert!(token.is_finished());

        assert!(fetch_sync_data(&engine, &mut token, 2).unwrap().is_empty());
    }

    #[test]
    fn single_large_batch_delivers_everything_once() {
        let engine = engine();
        let mut token = token();
        let all = fetch_sync_data(&engine, &mut token, 100).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all.iter().filter(|r| r.is_tombstone()).count(), 2);
        assert!(token.is_finished());
    }

    fn pull_all(engine: &InMemoryEngine, batch_size: usize) -> Vec<Vec<DataItem>> {
        let mut token = token();
        let mut batches = Vec::new();
        while !token.is_finished() {
            batches.push(fetch_sync_data(engine, &mut token, batch_size).unwrap());
            assert!(batches.len() < 100, "sync did not converge");
        }
        batches
    }

    fn keys(batch: &[DataItem]) -> Vec<&[u8]> {
        batch.iter().map(|r| r.key.as_slice()).collect()
    }

    #[test]
    fn live_rows_sharing_a_timestamp_are_not_split() {
        let engine = InMemoryEngine::new();
        engine.create_distributed_table("T").unwrap();
        engine.put_row("T", b"a".to_vec(), vec![], Default::default(), 10);
        engine.put_row("T", b"b".to_vec(), vec![], Default::default(), 10);
        engine.put_row("T", b"c".to_vec(), vec![], Default::default(), 20);

        // The run at 10 is wider than the batch and is delivered whole.
        let batches = pull_all(&engine, 1);
        assert_eq!(keys(&batches[0]), vec![b"a".as_slice(), b"b"]);
        assert_eq!(keys(&batches[1]), vec![b"c".as_slice()]);
        assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 3);
    }

    #[test]
    fn trailing_run_is_held_for_next_batch() {
        let engine = InMemoryEngine::new();
        engine.create_distributed_table("T").unwrap();
        engine.put_row("T", b"a".to_vec(), vec![], Default::default(), 10);
        engine.put_row("T", b"b".to_vec(), vec![], Default::default(), 20);
        engine.put_row("T", b"c".to_vec(), vec![], Default::default(), 20);

        let mut token = token();
        let first = fetch_sync_data(&engine, &mut token, 2).unwrap();
        assert_eq!(keys(&first), vec![b"a".as_slice()]);
        assert_eq!(token.time_range().begin_time, 11);

        let second = fetch_sync_data(&engine, &mut token, 2).unwrap();
        assert_eq!(keys(&second), vec![b"b".as_slice(), b"c"]);
    }

    #[test]
    fn tombstones_sharing_a_timestamp_are_not_split() {
        let engine = InMemoryEngine::new();
        engine.create_distributed_table("T").unwrap();
        for key in [b"a", b"b", b"c"] {
            engine.put_row("T", key.to_vec(), vec![], Default::default(), 1);
        }
        engine.delete_row("T", b"a", 50);
        engine.delete_row("T", b"b", 50);
        engine.delete_row("T", b"c", 60);

        let batches = pull_all(&engine, 1);
        let tombstones: Vec<&[u8]> = batches
            .iter()
            .flatten()
            .filter(|r| r.is_tombstone())
            .map(|r| r.key.as_slice())
            .collect();
        assert_eq!(tombstones, vec![b"a".as_slice(), b"b", b"c"]);
    }

    #[test]
    fn rejects_bad_input() {
        let engine = engine();
        let mut token = token();
        assert!(matches!(
            fetch_sync_data(&engine, &mut token, 0),
            Err(CoreError::InvalidArgs { .. })
        ));
    }

    #[test]
    fn failure_leaves_token_untouched() {
        let engine = InMemoryEngine::new();
        engine.put_row("T", vec![1], vec![0], Default::default(), 5);
        let mut token = token();
        // No changelog: the deleted phase cannot be prepared.
        assert!(fetch_sync_data(&engine, &mut token, 10).is_err());
        assert_eq!(token.phase(), Phase::Live);
        assert_eq!(token.time_range().begin_time, 0);
    }

    proptest! {
        #[test]
        fn every_change_is_delivered_once(
            stamps in prop::collection::vec(0..4u64, 1..24),
            deletes in prop::collection::vec((any::<bool>(), 0..3u64), 24),
            batch_size in 1usize..6,
        ) {
            let engine = InMemoryEngine::new();
            engine.create_distributed_table("T").unwrap();
            for (i, ts) in stamps.iter().enumerate() {
                engine.put_row("T", vec![i as u8], vec![], Default::default(), *ts);
            }
            let mut expected = HashMap::new();
            for (i, &(delete, ts)) in deletes.iter().take(stamps.len()).enumerate() {
                let deleted = delete && engine.delete_row("T", &[i as u8], 100 + ts);
                expected.insert(vec![i as u8], deleted);
            }

            let mut token = token();
            let mut seen = HashMap::new();
            let mut pulls = 0;
            while !token.is_finished() {
                for row in fetch_sync_data(&engine, &mut token, batch_size).unwrap() {
                    let previous = seen.insert(row.key.clone(), row.is_tombstone());
                    prop_assert!(previous.is_none(), "row {:?} delivered twice", row.key);
                }
                pulls += 1;
                prop_assert!(pulls <= 2 * stamps.len() + 4);
            }
            prop_assert_eq!(seen, expected);
        }
    }
}
