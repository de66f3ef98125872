// Dependency edges

use super::*;
use rusqlite::{params, Row};

/// One import edge: `from_path` imports `symbol_name` (or the whole module) from `to_path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRecord {
    pub from_path: String,
    pub to_path: String,
    pub symbol_name: Option<String>,
}

fn dependency_from_row(row: &Row<'_>) -> rusqlite::Result<DependencyRecord> {
    let symbol: String = row.get(2)?;
    Ok(DependencyRecord {
        from_path: row.get(0)?,
        to_path: row.get(1)?,
        symbol_name: if symbol.is_empty() { None } else { Some(symbol) },
    })
}

impl Store {
    /// Remove every outgoing edge of a file
    pub fn clear_dependencies(&self, from_file_id: i64) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM dependencies WHERE from_file_id = ?1",
            params![from_file_id],
        )?;
        Ok(removed)
    }

    /// Idempotent insert; a repeated (from, to, symbol) triple is ignored
    pub fn insert_dependency(
        &self,
        from_file_id: i64,
        to_file_id: i64,
        symbol_name: Option<&str>,
    ) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO dependencies (from_file_id, to_file_id, symbol_name)
             VALUES (?1, ?2, ?3)",
            params![from_file_id, to_file_id, symbol_name.unwrap_or("")],
        )?;
        Ok(inserted > 0)
    }

    fn query_dependencies(&self, filter: &str, path: &str) -> Result<Vec<DependencyRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT ff.path, tf.path, d.symbol_name
             FROM dependencies d
             JOIN files ff ON ff.id = d.from_file_id
             JOIN files tf ON tf.id = d.to_file_id
             WHERE {} = ?1
             ORDER BY ff.path, tf.path, d.symbol_name",
            filter
        ))?;
        let rows = stmt.query_map(params![path], dependency_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Edges going out of `path`: what it imports
    pub fn dependencies_of(&self, path: &str) -> Result<Vec<DependencyRecord>> {
        self.query_dependencies("ff.path", path)
    }

    /// Edges coming into `path`: who imports it
    pub fn imported_by(&self, path: &str) -> Result<Vec<DependencyRecord>> {
        self.query_dependencies("tf.path", path)
    }

    /// Distinct (importer, imported) path pairs
    pub fn all_edges(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT ff.path, tf.path
             FROM dependencies d
             JOIN files ff ON ff.id = d.from_file_id
             JOIN files tf ON tf.id = d.to_file_id
             ORDER BY ff.path, tf.path",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewFile;

    fn two_files(store: &Store) -> (i64, i64) {
        let (a, _) = store.upsert_file(&NewFile::code("a.ts", "typescript", "h")).unwrap();
        let (b, _) = store.upsert_file(&NewFile::code("b.ts", "typescript", "h")).unwrap();
        (a, b)
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let store = Store::open_in_memory().unwrap();
        let (a, b) = two_files(&store);

        assert!(store.insert_dependency(b, a, Some("X")).unwrap());
        assert!(!store.insert_dependency(b, a, Some("X")).unwrap());
        assert!(store.insert_dependency(b, a, None).unwrap());
        assert!(!store.insert_dependency(b, a, None).unwrap());

        let deps = store.dependencies_of("b.ts").unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].symbol_name, None);
        assert_eq!(deps[1].symbol_name.as_deref(), Some("X"));

        let importers = store.imported_by("a.ts").unwrap();
        assert!(importers.iter().all(|d| d.from_path == "b.ts"));
        assert_eq!(store.all_edges().unwrap(), vec![("b.ts".to_string(), "a.ts".to_string())]);
    }

    #[test]
    fn test_edges_cascade_from_either_side() {
        let store = Store::open_in_memory().unwrap();
        let (a, b) = two_files(&store);
        store.insert_dependency(b, a, Some("X")).unwrap();

        store.delete_file("a.ts").unwrap();
        assert!(store.dependencies_of("b.ts").unwrap().is_empty());
    }

    #[test]
    fn test_clear_dependencies() {
        let store = Store::open_in_memory().unwrap();
        let (a, b) = two_files(&store);
        store.insert_dependency(b, a, Some("X")).unwrap();
        store.insert_dependency(b, a, Some("Y")).unwrap();
        assert_eq!(store.clear_dependencies(b).unwrap(), 2);
        assert_eq!(store.stats().unwrap().dependencies, 0);
    }
}
