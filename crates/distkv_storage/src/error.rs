//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors reported by a storage engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested row or cursor position does not exist.
    #[error("not found")]
    NotFound,

    /// The named table does not exist.
    #[error("table not found: {name}")]
    TableNotFound {
        /// Table name.
        name: String,
    },

    /// An argument was rejected.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// The statement or query shape is not supported by this engine.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Too many result sets are open at once.
    #[error("too many open result sets (limit {limit})")]
    OverMaxLimits {
        /// Configured limit.
        limit: usize,
    },

    /// A result handle is unknown to the engine.
    #[error("result handle {id} is not open")]
    HandleNotOpen {
        /// Handle identifier.
        id: u64,
    },

    /// The engine is busy and could not complete the request.
    #[error("storage engine busy")]
    Busy,
}

impl StorageError {
    /// Creates an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }

    /// Creates a not supported error.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported(message.into())
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::TableNotFound { name: name.into() }
    }
}
