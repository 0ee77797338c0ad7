//! # DistKV Storage
//!
//! Storage engine interface and query model for DistKV.
//!
//! The query and sync layers never touch rows directly. They build a
//! [`Query`], hand it to a [`StorageEngine`], and walk the
//! [`ResultHandle`] or [`Statement`] rows the engine produces.
//!
//! ## Design Principles
//!
//! - A [`Query`] is built by appending; it is never rewritten in place
//! - Result handles are owned by the caller and released through the engine
//! - Sync statements carry `i64` parameters bound before stepping
//! - Engines must be `Send + Sync` for concurrent access
//!
//! ## Available Engines
//!
//! - [`InMemoryEngine`] - key/value space plus relational tables with
//!   changelogs, for tests and tooling
//!
//! ## Example
//!
//! ```rust
//! use distkv_storage::{InMemoryEngine, Query, ResultHandle, StorageEngine};
//!
//! let engine = InMemoryEngine::new();
//! engine.put(b"user:1".to_vec(), b"alice".to_vec(), Default::default());
//!
//! let mut query = Query::new();
//! query.key_prefix("user:");
//! let handle = engine.open_result_set(&query).unwrap();
//! assert!(handle.move_to_first());
//! assert_eq!(handle.entry().unwrap().value, b"alice".to_vec());
//! engine.close_result_set(handle.as_ref()).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod memory;
mod query;
mod statement;

pub use engine::{EngineConfig, ResultHandle, StorageEngine};
pub use error::{StorageError, StorageResult};
pub use memory::{InMemoryEngine, MemoryResultSet};
pub use query::{CompareOp, Condition, KeyFilter, Limit, OrderBy, Query, QueryNode};
pub use statement::{
    changelog_table_name, DataItem, Statement, StatementSource, Timestamp, DELETE_FLAG,
    LOCAL_FLAG, MAX_TIMESTAMP, RELATIONAL_PREFIX, TIME_WINDOW_PREDICATE, TOMBSTONE_MASK,
    TOMBSTONE_RANGE_PREDICATE,
};
