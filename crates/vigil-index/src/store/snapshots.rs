// AST snapshots: the per-file symbol baseline used for diffing

use super::*;
use rusqlite::{params, OptionalExtension};
use vigil_core::SymbolKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    pub name: String,
    pub kind: SymbolKind,
    pub signature: String,
    pub sig_hash: String,
}

impl Store {
    /// The file's snapshot in name order, or `None` if the file was never observed
    pub fn load_snapshot(&self, file_path: &str) -> Result<Option<Vec<SnapshotEntry>>> {
        let taken: Option<i64> = self
            .conn
            .query_row(
                "SELECT taken_at FROM ast_snapshot_files WHERE file_path = ?1",
                params![file_path],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT symbol_name, kind, signature, sig_hash FROM ast_snapshots
             WHERE file_path = ?1 ORDER BY symbol_name",
        )?;
        let rows = stmt.query_map(params![file_path], |row| {
            let kind: String = row.get(1)?;
            Ok(SnapshotEntry {
                name: row.get(0)?,
                kind: kind.parse().map_err(|e| conversion_error(1, e))?,
                signature: row.get(2)?,
                sig_hash: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(Some(out))
    }

    /// Replace the file's snapshot wholesale. Duplicate names keep the last entry.
    pub fn replace_snapshot(&self, file_path: &str, entries: &[SnapshotEntry]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM ast_snapshots WHERE file_path = ?1",
            params![file_path],
        )?;
        self.conn.execute(
            "INSERT INTO ast_snapshot_files (file_path, taken_at) VALUES (?1, ?2)
             ON CONFLICT(file_path) DO UPDATE SET taken_at = excluded.taken_at",
            params![file_path, to_millis(Utc::now())],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT OR REPLACE INTO ast_snapshots (file_path, symbol_name, kind, signature, sig_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for entry in entries {
            stmt.execute(params![
                file_path,
                entry.name,
                entry.kind.as_str(),
                entry.signature,
                entry.sig_hash,
            ])?;
        }
        Ok(())
    }
}
