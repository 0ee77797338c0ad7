//! CBOR helpers for persisted state such as sync checkpoints.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializes a value to CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if serialization fails.
pub fn to_cbor<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::into_writer(value, &mut buffer)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buffer)
}

/// Deserializes a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if the bytes are not valid CBOR
/// for `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    #[test]
    fn roundtrip_field_values() {
        let values = vec![
            FieldValue::Integer(-5),
            FieldValue::Text("x".into()),
            FieldValue::Null,
        ];
        let bytes = to_cbor(&values).unwrap();
        let decoded: Vec<FieldValue> = from_cbor(&bytes).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let result: CodecResult<Vec<FieldValue>> = from_cbor(&[0xFF, 0x00, 0x13]);
        assert!(matches!(result, Err(CodecError::DecodingFailed { .. })));
    }
}
