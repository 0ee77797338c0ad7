//! Key/value entries and conversion from field records.

use crate::error::{CodecError, CodecResult};
use crate::field::encode_field;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the record field that supplies the entry key.
pub const KEY_FIELD: &str = "key";

/// Name of the record field that supplies the entry value.
pub const VALUE_FIELD: &str = "value";

/// A generic record of named, typed fields.
pub type FieldRecord = BTreeMap<String, FieldValue>;

/// The external unit of storage.
///
/// Keys are arbitrary byte strings, values are opaque encoded bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Entry key.
    pub key: Vec<u8>,
    /// Entry value.
    pub value: Vec<u8>,
}

impl Entry {
    /// Creates an entry.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Converts a field record into a binary entry.
///
/// Both the `key` and `value` fields are required; each is stored in its
/// tagged encoding.
///
/// # Errors
///
/// Returns [`CodecError::MissingField`] naming the first missing field. An
/// empty record reports `key`.
pub fn decode_entry(record: &FieldRecord) -> CodecResult<Entry> {
    let key = encoded_field(record, KEY_FIELD)?;
    let value = encoded_field(record, VALUE_FIELD)?;
    Ok(Entry { key, value })
}

/// Converts a batch of field records, stopping at the first failure.
///
/// # Errors
///
/// Propagates the first [`decode_entry`] error.
pub fn decode_entries(records: &[FieldRecord]) -> CodecResult<Vec<Entry>> {
    records.iter().map(decode_entry).collect()
}

fn encoded_field(record: &FieldRecord, name: &str) -> CodecResult<Vec<u8>> {
    record
        .get(name)
        .map(encode_field)
        .ok_or_else(|| CodecError::missing_field(name))
}
