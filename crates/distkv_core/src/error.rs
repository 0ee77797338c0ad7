//! Error types for DistKV core.

use crate::status::Status;
use distkv_codec::CodecError;
use distkv_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in DistKV core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage engine error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Field codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// An operation kind is not supported here.
    #[error("operation not supported: code {code}")]
    NotSupported {
        /// Numeric operation code.
        code: i32,
    },

    /// The store variant does not offer a capability.
    #[error("{capability} is not supported by this store")]
    Unsupported {
        /// Name of the capability.
        capability: &'static str,
    },

    /// An operation carried operands of the wrong shape.
    #[error("invalid arguments: {message}")]
    InvalidArgs {
        /// Description of the problem.
        message: String,
    },

    /// The input was empty.
    #[error("empty input")]
    Empty,

    /// The cursor has already been closed.
    #[error("result set already closed")]
    AlreadyClosed,

    /// Reading the entry at the cursor position failed.
    #[error("failed to read entry at position {position}: {source}")]
    ReadEntry {
        /// Cursor position at the time of the failure.
        position: i64,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// A continuation token failed validation.
    #[error("invalid continuation token: {message}")]
    InvalidToken {
        /// Description of the failure.
        message: String,
    },

    /// The store was used before `init`.
    #[error("store not initialized")]
    NotInitialized,
}

impl CoreError {
    /// Creates a not supported error.
    pub fn not_supported(code: i32) -> Self {
        Self::NotSupported { code }
    }

    /// Creates an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs {
            message: message.into(),
        }
    }

    /// Creates an invalid token error.
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Maps the error onto its outcome code.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::Storage(e) | Self::ReadEntry { source: e, .. } => storage_status(e),
            Self::Codec(_) => Status::InvalidArgs,
            Self::NotSupported { .. } | Self::Unsupported { .. } => Status::NotSupported,
            Self::InvalidArgs { .. } => Status::InvalidArgs,
            Self::AlreadyClosed => Status::AlreadyClosed,
            Self::Empty | Self::InvalidToken { .. } | Self::NotInitialized => Status::Error,
        }
    }
}

fn storage_status(error: &StorageError) -> Status {
    match error {
        StorageError::NotFound | StorageError::TableNotFound { .. } => Status::NotFound,
        StorageError::InvalidArgs(_) => Status::InvalidArgs,
        StorageError::NotSupported(_) => Status::NotSupported,
        StorageError::OverMaxLimits { .. } => Status::OverMaxLimits,
        StorageError::HandleNotOpen { .. } | StorageError::Busy => Status::Error,
    }
}
