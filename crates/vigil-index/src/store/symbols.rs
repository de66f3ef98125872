// Symbol rows and symbol search

use super::*;
use rusqlite::{params, Row};
use tracing::debug;
use vigil_core::Symbol;

/// A symbol together with the file that declares it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolRecord {
    pub file_path: String,
    #[serde(flatten)]
    pub symbol: Symbol,
}

const SYMBOL_COLUMNS: &str = "f.path, s.name, s.kind, s.signature, s.start_line, s.end_line, s.exported";

fn symbol_from_row(row: &Row<'_>) -> rusqlite::Result<SymbolRecord> {
    let kind: String = row.get(2)?;
    let kind = kind.parse().map_err(|e| conversion_error(2, e))?;
    let symbol = Symbol::new(row.get::<_, String>(1)?, kind, row.get::<_, String>(3)?)
        .at_lines(row.get::<_, i64>(4)? as usize, row.get::<_, i64>(5)? as usize)
        .exported(row.get(6)?);
    Ok(SymbolRecord {
        file_path: row.get(0)?,
        symbol,
    })
}

impl Store {
    /// Delete every symbol of the file, then insert `symbols`
    pub fn replace_symbols(&self, file_id: i64, symbols: &[Symbol]) -> Result<()> {
        self.conn
            .execute("DELETE FROM symbols WHERE file_id = ?1", params![file_id])?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO symbols (file_id, name, kind, signature, start_line, end_line, exported)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for symbol in symbols {
            stmt.execute(params![
                file_id,
                symbol.name,
                symbol.kind.as_str(),
                symbol.signature,
                symbol.start_line as i64,
                symbol.end_line as i64,
                symbol.exported,
            ])?;
        }
        Ok(())
    }

    /// Symbols of one file in line order
    pub fn symbols_for_file(&self, path: &str) -> Result<Vec<SymbolRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM symbols s JOIN files f ON f.id = s.file_id
             WHERE f.path = ?1 ORDER BY s.start_line, s.name",
            SYMBOL_COLUMNS
        ))?;
        let rows = stmt.query_map(params![path], symbol_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Exact-name lookup across all files
    pub fn find_symbols(&self, name: &str) -> Result<Vec<SymbolRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM symbols s JOIN files f ON f.id = s.file_id
             WHERE s.name = ?1 ORDER BY f.path, s.start_line",
            SYMBOL_COLUMNS
        ))?;
        let rows = stmt.query_map(params![name], symbol_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Prefix search over names and signatures. Malformed queries yield no results.
    pub fn search_symbols(&self, query: &str, limit: usize) -> Result<Vec<SymbolRecord>> {
        let Some(fts) = fts_query(query, true) else {
            return Ok(Vec::new());
        };
        let result = (|| -> rusqlite::Result<Vec<SymbolRecord>> {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM symbols_fts
                 JOIN symbols s ON s.id = symbols_fts.rowid
                 JOIN files f ON f.id = s.file_id
                 WHERE symbols_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
                SYMBOL_COLUMNS
            ))?;
            let rows = stmt.query_map(params![fts, limit as i64], symbol_from_row)?;
            rows.collect()
        })();
        match result {
            Ok(hits) => Ok(hits),
            Err(e) => {
                debug!("symbol search for {:?} failed: {}", query, e);
                Ok(Vec::new())
            }
        }
    }
}
