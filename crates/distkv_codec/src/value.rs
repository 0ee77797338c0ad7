//! Typed scalar values and their wire tags.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Wire tag that precedes every encoded field value.
///
/// The numeric values are a storage contract shared with other
/// implementations and must never change. Tag `2` belongs to 32-bit
/// floats, which this layer never produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueTag {
    /// UTF-8 string, raw bytes follow.
    String = 0,
    /// 64-bit signed integer, 8 bytes big-endian follow.
    Integer = 1,
    /// Raw byte array.
    ByteArray = 3,
    /// Boolean, a single `0` or `1` byte follows.
    Boolean = 4,
    /// IEEE-754 double, 8 bytes big-endian follow.
    Double = 5,
}

impl ValueTag {
    /// Returns the tag byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Parses a tag byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::String),
            1 => Some(Self::Integer),
            3 => Some(Self::ByteArray),
            4 => Some(Self::Boolean),
            5 => Some(Self::Double),
            _ => None,
        }
    }

    /// Human readable name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::ByteArray => "byte array",
            Self::Boolean => "boolean",
            Self::Double => "double",
        }
    }
}

/// A typed scalar carried by field records and predicate operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent value.
    Null,
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Signed 64-bit integer.
    Integer(i64),
    /// IEEE-754 double.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 text.
    Text(String),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the wire tag of this value, `None` for null.
    #[must_use]
    pub const fn tag(&self) -> Option<ValueTag> {
        match self {
            Self::Null => None,
            Self::Bytes(_) => Some(ValueTag::ByteArray),
            Self::Integer(_) => Some(ValueTag::Integer),
            Self::Double(_) => Some(ValueTag::Double),
            Self::Bool(_) => Some(ValueTag::Boolean),
            Self::Text(_) => Some(ValueTag::String),
        }
    }

    /// Returns the integer if this is an integer value.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the raw bytes of a byte or text value.
    ///
    /// Keys may be supplied either way, so both are accepted.
    #[must_use]
    pub fn as_key_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Compares two values of compatible types.
    ///
    /// Integers and doubles compare numerically with each other. Any other
    /// pairing of different types, and any comparison involving null, is
    /// unordered.
    #[must_use]
    pub fn partial_cmp_value(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Double(a), Self::Double(b)) => a.partial_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Self::Integer(a), Self::Double(b)) => (*a as f64).partial_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Self::Double(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}
