//! # DistKV Core
//!
//! Query translation and incremental retrieval for DistKV.
//!
//! This crate provides:
//! - **Predicate translation**: an ordered, code-based predicate language
//!   turned into a storage [`Query`](distkv_storage::Query)
//! - **Result cursors**: [`ResultCursor`], a thread-safe cursor that releases
//!   its handle exactly once
//! - **Incremental sync**: [`ContinueToken`], a two-phase watermark scan over
//!   live rows and then tombstones, resumable across polls
//! - **Store variants**: [`Store`], selected by [`Config`]
//!
//! ## Example
//!
//! ```rust
//! use distkv_core::{translate, Operation};
//!
//! let query = translate(&[
//!     Operation::equal_to("city", "Oslo"),
//!     Operation::or(),
//!     Operation::like("name", "A%"),
//!     Operation::limit(10, 0),
//! ])
//! .unwrap();
//!
//! assert_eq!(query.where_clause(), "city = 'Oslo' OR name LIKE 'A%'");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod kv_store;
mod predicate;
mod result_set;
mod status;
mod store;
mod sync;

pub use config::{Config, StoreKind};
pub use error::{CoreError, CoreResult};
pub use kv_store::KvStore;
pub use predicate::{extract_keys, translate, Operand, Operation, OperationKind};
pub use result_set::ResultCursor;
pub use status::Status;
pub use store::{DeviceStore, LocalStore, RdbStore, Store};
pub use sync::{fetch_sync_data, ContinueToken, Phase, SyncTimeRange, MAGIC_BEGIN, MAGIC_END};
