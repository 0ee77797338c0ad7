//! Tagged binary encoding of field values.
//!
//! Layout: one [`ValueTag`] byte followed by the payload.
//!
//! | Tag | Payload |
//! |---|---|
//! | integer | 8 bytes, big-endian two's complement |
//! | double | 8 bytes, big-endian IEEE-754 bit pattern |
//! | boolean | 1 byte, `0` or `1` |
//! | byte array | raw bytes |
//! | string | raw UTF-8 bytes |
//!
//! Null has no tag and encodes to an empty byte string.

use crate::error::{CodecError, CodecResult};
use crate::value::{FieldValue, ValueTag};

/// Reinterprets the bits of a signed integer as unsigned.
#[must_use]
pub const fn int_to_wire_bits(value: i64) -> u64 {
    u64::from_ne_bytes(value.to_ne_bytes())
}

/// Reinterprets the IEEE-754 bits of a double as unsigned.
#[must_use]
pub fn double_to_wire_bits(value: f64) -> u64 {
    value.to_bits()
}

/// Inverse of [`int_to_wire_bits`].
#[must_use]
pub const fn int_from_wire_bits(bits: u64) -> i64 {
    i64::from_ne_bytes(bits.to_ne_bytes())
}

/// Inverse of [`double_to_wire_bits`].
#[must_use]
pub fn double_from_wire_bits(bits: u64) -> f64 {
    f64::from_bits(bits)
}

/// Encodes a field value as tag + payload.
#[must_use]
pub fn encode_field(value: &FieldValue) -> Vec<u8> {
    let Some(tag) = value.tag() else {
        return Vec::new();
    };

    let mut out = vec![tag.to_byte()];
    match value {
        FieldValue::Null => {}
        FieldValue::Bytes(b) => out.extend_from_slice(b),
        FieldValue::Integer(n) => out.extend_from_slice(&int_to_wire_bits(*n).to_be_bytes()),
        FieldValue::Double(d) => out.extend_from_slice(&double_to_wire_bits(*d).to_be_bytes()),
        FieldValue::Bool(b) => out.push(u8::from(*b)),
        FieldValue::Text(s) => out.extend_from_slice(s.as_bytes()),
    }
    out
}

/// Decodes a tagged value produced by [`encode_field`].
///
/// # Errors
///
/// Fails on an unknown tag, a payload of the wrong length, or a string
/// payload that is not UTF-8.
pub fn decode_field(bytes: &[u8]) -> CodecResult<FieldValue> {
    if bytes.is_empty() {
        return Ok(FieldValue::Null);
    }

    let (tag_byte, payload) = (bytes[0], &bytes[1..]);
    let tag = ValueTag::from_byte(tag_byte).ok_or(CodecError::UnknownTag { tag: tag_byte })?;

    match tag {
        ValueTag::ByteArray => Ok(FieldValue::Bytes(payload.to_vec())),
        ValueTag::String => String::from_utf8(payload.to_vec())
            .map(FieldValue::Text)
            .map_err(|_| CodecError::InvalidUtf8),
        ValueTag::Integer => {
            let bits = read_u64(tag, payload)?;
            Ok(FieldValue::Integer(int_from_wire_bits(bits)))
        }
        ValueTag::Double => {
            let bits = read_u64(tag, payload)?;
            Ok(FieldValue::Double(double_from_wire_bits(bits)))
        }
        ValueTag::Boolean => match payload {
            [0] => Ok(FieldValue::Bool(false)),
            [1] => Ok(FieldValue::Bool(true)),
            [_] => Err(CodecError::decoding_failed("boolean payload must be 0 or 1")),
            _ => Err(CodecError::InvalidPayload {
                tag_name: tag.name(),
                expected: 1,
                actual: payload.len(),
            }),
        },
    }
}

fn read_u64(tag: ValueTag, payload: &[u8]) -> CodecResult<u64> {
    let arr: [u8; 8] = payload
        .try_into()
        .map_err(|_| CodecError::InvalidPayload {
            tag_name: tag.name(),
            expected: 8,
            actual: payload.len(),
        })?;
    Ok(u64::from_be_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn minus_one_is_all_ones() {
        let encoded = encode_field(&FieldValue::Integer(-1));
        assert_eq!(
            encoded,
            vec![ValueTag::Integer.to_byte(), 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn integer_is_big_endian() {
        let encoded = encode_field(&FieldValue::Integer(0x0102));
        assert_eq!(&encoded[1..], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
    }

    #[test]
    fn bool_true_is_one_byte() {
        assert_eq!(
            encode_field(&FieldValue::Bool(true)),
            vec![ValueTag::Boolean.to_byte(), 0x01]
        );
        assert_eq!(
            encode_field(&FieldValue::Bool(false)),
            vec![ValueTag::Boolean.to_byte(), 0x00]
        );
    }

    #[test]
    fn double_uses_ieee_bits() {
        let encoded = encode_field(&FieldValue::Double(1.0));
        assert_eq!(encoded[0], ValueTag::Double.to_byte());
        assert_eq!(&encoded[1..], &0x3FF0_0000_0000_0000u64.to_be_bytes());
    }

    #[test]
    fn string_keeps_its_tag() {
        let encoded = encode_field(&FieldValue::Text("id".into()));
        assert_eq!(encoded, vec![ValueTag::String.to_byte(), b'i', b'd']);
    }

    #[test]
    fn null_encodes_empty() {
        assert!(encode_field(&FieldValue::Null).is_empty());
        assert_eq!(decode_field(&[]).unwrap(), FieldValue::Null);
    }

    #[test]
    fn decode_rejects_bad_input() {
        assert_eq!(decode_field(&[2]), Err(CodecError::UnknownTag { tag: 2 }));
        assert!(matches!(
            decode_field(&[ValueTag::Integer.to_byte(), 1, 2]),
            Err(CodecError::InvalidPayload { expected: 8, actual: 2, .. })
        ));
        assert_eq!(
            decode_field(&[ValueTag::String.to_byte(), 0xFF]),
            Err(CodecError::InvalidUtf8)
        );
        assert!(decode_field(&[ValueTag::Boolean.to_byte(), 7]).is_err());
    }

    proptest! {
        #[test]
        fn integer_payload_matches_to_be_bytes(n in any::<i64>()) {
            let encoded = encode_field(&FieldValue::Integer(n));
            prop_assert_eq!(encoded.len(), 9);
            prop_assert_eq!(&encoded[1..], &n.to_be_bytes()[..]);
            prop_assert_eq!(decode_field(&encoded).unwrap(), FieldValue::Integer(n));
        }
    }
}
