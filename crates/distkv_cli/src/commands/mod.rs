//! CLI command implementations.

pub mod encode;
pub mod keys;
pub mod pull;
pub mod translate;

use distkv_core::Operation;
use std::fs;
use std::path::Path;

/// Reads a JSON array of predicate operations.
pub fn read_operations(path: &Path) -> Result<Vec<Operation>, Box<dyn std::error::Error>> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&data)?)
}

/// Renders bytes as text when printable, hex otherwise.
pub fn display_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.chars().all(|c| !c.is_control()) => s.to_string(),
        _ => bytes.iter().map(|b| format!("{b:02x}")).collect(),
    }
}
