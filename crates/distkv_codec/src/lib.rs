//! # DistKV Codec
//!
//! Typed field values and their binary encodings for DistKV.
//!
//! This crate provides:
//! - [`FieldValue`], the typed scalar used by records and predicates
//! - Tagged field encoding (`tag + payload`, big-endian numerics)
//! - [`Entry`] and conversion from generic field records
//! - CBOR helpers for persisted state
//!
//! ## Usage
//!
//! ```
//! use distkv_codec::{encode_field, FieldValue, ValueTag};
//!
//! let bytes = encode_field(&FieldValue::Integer(-1));
//! assert_eq!(bytes[0], ValueTag::Integer.to_byte());
//! assert_eq!(&bytes[1..], &[0xFF; 8]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod entry;
mod error;
mod field;
mod value;

pub use cbor::{from_cbor, to_cbor};
pub use entry::{decode_entries, decode_entry, Entry, FieldRecord, KEY_FIELD, VALUE_FIELD};
pub use error::{CodecError, CodecResult};
pub use field::{
    decode_field, double_from_wire_bits, double_to_wire_bits, encode_field, int_from_wire_bits,
    int_to_wire_bits,
};
pub use value::{FieldValue, ValueTag};
