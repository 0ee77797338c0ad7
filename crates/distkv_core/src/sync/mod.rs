//! Incremental change retrieval for sync sessions.

mod continue_token;
mod reader;
mod time_range;

pub use continue_token::{ContinueToken, Phase, MAGIC_BEGIN, MAGIC_END};
pub use reader::fetch_sync_data;
pub use time_range::SyncTimeRange;
