//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A required field is absent from a field record.
    #[error("missing field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// The leading type tag of an encoded value is not recognized.
    #[error("unknown value tag: {tag}")]
    UnknownTag {
        /// The tag byte found.
        tag: u8,
    },

    /// The payload length does not match what the tag requires.
    #[error("invalid payload for {tag_name}: expected {expected} bytes, got {actual}")]
    InvalidPayload {
        /// Name of the tag being decoded.
        tag_name: &'static str,
        /// Expected payload length.
        expected: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// An encoded value has no tag byte at all.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Invalid UTF-8 string payload.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Failed to encode a value.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },
}

impl CodecError {
    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}
