//! Translate command implementation.

use super::read_operations;
use distkv_core::translate;
use std::path::Path;

/// Runs the translate command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let operations = read_operations(path)?;
    let query = translate(&operations)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&query)?),
        _ => println!("{query}"),
    }
    Ok(())
}
