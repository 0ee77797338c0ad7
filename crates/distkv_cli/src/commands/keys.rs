//! Keys command implementation.

use super::{display_bytes, read_operations};
use distkv_core::extract_keys;
use std::path::Path;

/// Runs the keys command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let operations = read_operations(path)?;
    for key in extract_keys(&operations)? {
        println!("{}", display_bytes(&key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use distkv_core::Operation;

    #[test]
    fn prints_key_sets_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.json");

        let ops = vec![Operation::in_keys(vec![b"a".to_vec(), b"b".to_vec()])];
        std::fs::write(&path, serde_json::to_string(&ops).unwrap()).unwrap();
        run(&path).unwrap();

        let ops = vec![Operation::equal_to("x", 1i64)];
        std::fs::write(&path, serde_json::to_string(&ops).unwrap()).unwrap();
        assert!(run(&path).is_err());

        std::fs::write(&path, "[]").unwrap();
        assert!(run(&path).is_err());
    }
}
