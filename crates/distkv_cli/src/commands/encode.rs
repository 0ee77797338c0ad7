//! Encode command implementation.

use distkv_codec::{encode_field, FieldValue};

/// Encodes a JSON field value and returns the bytes as hex.
pub fn encode_hex(value: &str) -> Result<String, Box<dyn std::error::Error>> {
    let value: FieldValue = serde_json::from_str(value)?;
    Ok(encode_field(&value).iter().map(|b| format!("{b:02x}")).collect())
}

/// Runs the encode command.
pub fn run(value: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", encode_hex(value)?);
    Ok(())
}
