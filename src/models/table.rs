use std::{fs, path};

use anyhow::{Context, bail};
use serde_json::{Map, Value};
use tracing::{Span, field, trace_span};
use xxhash_rust::xxh3::xxh3_64;

/// One record of a table
pub type Row = Map<String, Value>;

/// A table loaded from a JSON file
#[derive(Clone, Debug)]
pub struct Table {
    pub name: String,
    pub rows: Vec<Row>,
    /// Changes whenever the file content changes
    pub version: String,
}

/// Hash file content into a version string
pub fn content_version(bytes: &[u8]) -> String {
    format!("{:x}", xxh3_64(bytes))
}

impl Table {
    /// Load a table from a file holding a JSON array of objects. The table is
    /// named after the file stem.
    pub fn load(span: &Span, path: &path::Path) -> anyhow::Result<Self> {
        let s = trace_span!(parent: span, "load table", ?path, rows = field::Empty).entered();
        if !path.is_file() {
            bail!("Not a file: {}", path.display());
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str().map(ToString::to_string))
            .with_context(|| format!("Invalid path: {}", path.display()))?;
        let bytes = fs::read(path)?;
        let rows: Vec<Row> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Not a JSON array of objects: {}", path.display()))?;
        s.record("rows", rows.len());
        Ok(Table {
            name,
            rows,
            version: content_version(&bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn load_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.json");
        fs::write(&path, r#"[{"name":"Ann","age":30},{"name":"Bob","age":25}]"#).unwrap();
        let table = Table::load(&Span::none(), &path).unwrap();
        assert_eq!("people", table.name);
        assert_eq!(2, table.rows.len());
        assert_eq!(Some(&Value::from("Bob")), table.rows[1].get("name"));
    }

    #[test]
    fn version_follows_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.json");
        fs::write(&path, "[]").unwrap();
        let before = Table::load(&Span::none(), &path).unwrap().version;
        fs::write(&path, r#"[{"a":1}]"#).unwrap();
        let after = Table::load(&Span::none(), &path).unwrap().version;
        assert_ne!(before, after);
        assert_eq!(before, content_version(b"[]"));
    }

    #[test]
    fn rejects_non_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{"name":"Ann"}"#).unwrap();
        assert!(Table::load(&Span::none(), &path).is_err());
        assert!(Table::load(&Span::none(), dir.path()).is_err());
    }
}
