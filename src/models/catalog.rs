use std::{collections::HashMap, fs, path};

use chrono::{DateTime, Duration, Utc};
use rayon::iter::{IntoParallelIterator as _, ParallelIterator as _};
use tracing::{error, trace_span};

use super::table::Table;

/// Every table found in the data directory
#[derive(Debug)]
pub struct Catalog {
    pub tables: Vec<Table>,
    pub tables_map: HashMap<String, usize>,
    pub load_duration: Duration,
    pub loaded_at: DateTime<Utc>,
}

impl Catalog {
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables_map.get(name).and_then(|idx| self.tables.get(*idx))
    }

    pub fn rows_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}

fn is_json(path: &path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load all `*.json` tables in the data directory
pub fn load_catalog(data_path: &path::Path) -> anyhow::Result<Catalog> {
    let span = trace_span!("load catalog");
    let _entered = span.enter();
    let loaded_at = Utc::now();
    let entries: Vec<_> = fs::read_dir(data_path)?.collect();
    let mut tables: Vec<Table> = entries
        .into_par_iter()
        .filter_map(|entry| {
            if let Err(ref err) = entry {
                error!(%err, "skip file");
            }
            entry.ok()
        })
        .map(|entry| entry.path())
        .filter(|path| is_json(path))
        .filter_map(|path| {
            let table = Table::load(&span, &path);
            if let Err(err) = &table {
                error!(%err, "failed to load table");
            }
            table.ok()
        })
        .collect();
    tables.sort_by(|a, b| a.name.cmp(&b.name));
    let mut tables_map = HashMap::with_capacity(tables.len());
    for (idx, table) in tables.iter().enumerate() {
        tables_map.insert(table.name.clone(), idx);
    }
    Ok(Catalog {
        tables,
        tables_map,
        load_duration: Utc::now().signed_duration_since(loaded_at),
        loaded_at,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn loads_fixture_tables() {
        let catalog = load_catalog(path::Path::new("./fixtures/data")).unwrap();
        let names: Vec<&str> = catalog.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(vec!["cities", "people"], names);
        assert_eq!(12, catalog.get("people").unwrap().rows.len());
        assert_eq!(17, catalog.rows_count());
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn skips_broken_and_foreign_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("good.json"), r#"[{"a":1}]"#).unwrap();
        fs::write(dir.path().join("broken.json"), "not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "[]").unwrap();
        let catalog = load_catalog(dir.path()).unwrap();
        assert_eq!(1, catalog.tables.len());
        assert_eq!("good", catalog.tables[0].name);
    }

    #[test]
    fn missing_directory_fails() {
        let dir = tempdir().unwrap();
        assert!(load_catalog(&dir.path().join("non_exist")).is_err());
    }
}
