//! Pull command implementation.
//!
//! Loads a JSON fixture into an in-memory engine and drives an incremental
//! sync over one table, optionally stopping early and leaving a checkpoint
//! to resume from.

use super::display_bytes;
use distkv_codec::FieldRecord;
use distkv_core::{Config, ContinueToken, KvStore, RdbStore, Store};
use distkv_storage::{InMemoryEngine, Query, StorageEngine, Timestamp};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Fixture file contents.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    /// Tables to create.
    #[serde(default)]
    pub tables: Vec<TableFixture>,
}

/// One table of a fixture.
#[derive(Debug, Deserialize)]
pub struct TableFixture {
    /// Table name.
    pub name: String,
    /// Whether the table keeps a changelog.
    #[serde(default)]
    pub distributed: bool,
    /// Rows written in order.
    #[serde(default)]
    pub rows: Vec<RowFixture>,
    /// Deletes applied after all rows.
    #[serde(default)]
    pub deletes: Vec<DeleteFixture>,
}

/// A row write.
#[derive(Debug, Deserialize)]
pub struct RowFixture {
    /// Row key.
    pub key: String,
    /// Row value.
    #[serde(default)]
    pub value: String,
    /// Modification timestamp.
    pub timestamp: Timestamp,
    /// Typed fields used by scoped queries.
    #[serde(default)]
    pub fields: FieldRecord,
}

/// A row delete.
#[derive(Debug, Deserialize)]
pub struct DeleteFixture {
    /// Row key.
    pub key: String,
    /// Delete timestamp.
    pub timestamp: Timestamp,
}

/// One printed row.
#[derive(Debug, Serialize)]
pub struct PulledRow {
    /// Row key.
    pub key: String,
    /// Row value.
    pub value: String,
    /// Modification timestamp.
    pub timestamp: Timestamp,
    /// True for tombstones.
    pub deleted: bool,
}

/// Options for the pull command.
#[derive(Debug)]
pub struct PullOptions<'a> {
    /// Table to pull.
    pub table: &'a str,
    /// Rows per batch.
    pub batch_size: usize,
    /// Stop after this many batches.
    pub max_batches: Option<usize>,
    /// Checkpoint to resume from and write back to.
    pub checkpoint: Option<&'a Path>,
    /// Output format (text, json).
    pub format: &'a str,
}

/// Builds an engine holding the fixture's tables.
pub fn load_fixture(fixture: &Fixture) -> Result<Arc<InMemoryEngine>, Box<dyn std::error::Error>> {
    let engine = Arc::new(InMemoryEngine::new());
    let store = Store::create(&Config::default(), engine.clone());
    store.init()?;

    let distributed: Vec<String> = fixture
        .tables
        .iter()
        .filter(|t| t.distributed)
        .map(|t| t.name.clone())
        .collect();
    store.set_distributed_tables(&distributed)?;

    for table in &fixture.tables {
        for row in &table.rows {
            engine.put_row(
                &table.name,
                row.key.as_bytes().to_vec(),
                row.value.as_bytes().to_vec(),
                row.fields.clone(),
                row.timestamp,
            );
        }
        for delete in &table.deletes {
            engine.delete_row(&table.name, delete.key.as_bytes(), delete.timestamp);
        }
    }
    Ok(engine)
}

/// Pulls batches until the token finishes or the batch limit is reached.
///
/// Returns the rows and the token state afterwards.
pub fn pull(
    engine: Arc<dyn StorageEngine>,
    options: &PullOptions<'_>,
    resume: Option<ContinueToken>,
) -> Result<(Vec<PulledRow>, ContinueToken), Box<dyn std::error::Error>> {
    let store = KvStore::with_config(engine, Config::new().sync_batch_size(options.batch_size));
    let mut token = match resume {
        Some(token) => {
            if token.table_name() != options.table {
                return Err(format!(
                    "checkpoint is for table {}, not {}",
                    token.table_name(),
                    options.table
                )
                .into());
            }
            token
        }
        None => store.start_sync(options.table, Query::new())?,
    };

    let mut rows = Vec::new();
    let mut batches = 0;
    while !token.is_finished() && options.max_batches.is_none_or(|max| batches < max) {
        let batch = store.pull(&mut token)?;
        batches += 1;
        info!(batch = batches, rows = batch.len(), "pulled batch");
        rows.extend(batch.into_iter().map(|item| PulledRow {
            key: display_bytes(&item.key),
            value: display_bytes(&item.value),
            timestamp: item.timestamp,
            deleted: item.is_tombstone(),
        }));
    }
    Ok((rows, token))
}

/// Runs the pull command.
pub fn run(fixture_path: &Path, options: &PullOptions<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read_to_string(fixture_path)
        .map_err(|e| format!("cannot read {}: {e}", fixture_path.display()))?;
    let fixture: Fixture = serde_json::from_str(&data)?;
    let engine = load_fixture(&fixture)?;

    let resume = match options.checkpoint {
        Some(path) if path.exists() => Some(ContinueToken::from_checkpoint(&fs::read(path)?)?),
        _ => None,
    };

    let (rows, token) = pull(engine, options, resume)?;

    match options.format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => {
            for row in &rows {
                let marker = if row.deleted { "-" } else { "+" };
                println!("{marker} {:>20} {} = {}", row.timestamp, row.key, row.value);
            }
            println!("{} rows, finished: {}", rows.len(), token.is_finished());
        }
    }

    if let Some(path) = options.checkpoint {
        if token.is_finished() {
            if path.exists() {
                fs::remove_file(path)?;
            }
        } else {
            fs::write(path, token.to_checkpoint()?)?;
            println!("checkpoint written to {}", path.display());
        }
    }
    Ok(())
}
