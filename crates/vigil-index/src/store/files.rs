// File rows

use super::*;
use rusqlite::{params, OptionalExtension, Row};
use vigil_core::FileClass;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub language: String,
    pub hash: String,
    pub size: u64,
    pub token_estimate: usize,
    pub class: FileClass,
    pub indexed_at: String,
}

/// Values written by an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile<'a> {
    pub path: &'a str,
    pub language: &'a str,
    pub hash: &'a str,
    pub size: u64,
    pub token_estimate: usize,
    pub class: FileClass,
}

impl<'a> NewFile<'a> {
    pub fn code(path: &'a str, language: &'a str, hash: &'a str) -> Self {
        Self {
            path,
            language,
            hash,
            size: 0,
            token_estimate: 0,
            class: FileClass::Code,
        }
    }

    pub fn doc(path: &'a str, language: &'a str, hash: &'a str) -> Self {
        Self {
            class: FileClass::Doc,
            ..Self::code(path, language, hash)
        }
    }

    pub fn sized(mut self, size: u64, token_estimate: usize) -> Self {
        self.size = size;
        self.token_estimate = token_estimate;
        self
    }
}

const FILE_COLUMNS: &str = "id, path, language, hash, size, token_estimate, class, indexed_at";

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let class: String = row.get(6)?;
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        language: row.get(2)?,
        hash: row.get(3)?,
        size: row.get::<_, i64>(4)? as u64,
        token_estimate: row.get::<_, i64>(5)? as usize,
        class: class.parse().map_err(|e| conversion_error(6, e))?,
        indexed_at: row.get(7)?,
    })
}

impl Store {
    /// Insert or update a file row by path. Returns the row id and whether it existed before.
    pub fn upsert_file(&self, file: &NewFile<'_>) -> Result<(i64, bool)> {
        let existed = self.file_id(file.path)?.is_some();
        self.conn.execute(
            "INSERT INTO files (path, language, hash, size, token_estimate, class, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(path) DO UPDATE SET language       = excluded.language,
                                             hash           = excluded.hash,
                                             size           = excluded.size,
                                             token_estimate = excluded.token_estimate,
                                             class          = excluded.class,
                                             indexed_at     = excluded.indexed_at",
            params![
                file.path,
                file.language,
                file.hash,
                file.size as i64,
                file.token_estimate as i64,
                file.class.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        // last_insert_rowid is stale on the UPDATE path of an upsert
        let id = self
            .file_id(file.path)?
            .context("file row missing after upsert")?;
        Ok((id, existed))
    }

    pub fn file_id(&self, path: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM files WHERE path = ?1", params![path], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    pub fn get_file(&self, path: &str) -> Result<Option<FileRecord>> {
        let file = self
            .conn
            .query_row(
                &format!("SELECT {} FROM files WHERE path = ?1", FILE_COLUMNS),
                params![path],
                file_from_row,
            )
            .optional()?;
        Ok(file)
    }

    pub fn get_file_hash(&self, path: &str) -> Result<Option<String>> {
        let hash = self
            .conn
            .query_row("SELECT hash FROM files WHERE path = ?1", params![path], |row| row.get(0))
            .optional()?;
        Ok(hash)
    }

    /// All files, optionally of one class, ordered by path
    pub fn list_files(&self, class: Option<FileClass>) -> Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM files WHERE ?1 IS NULL OR class = ?1 ORDER BY path",
            FILE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![class.map(|c| c.as_str())], file_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Delete a file row; symbols, chunks and edges cascade. Returns true if a row was removed.
    pub fn delete_file(&self, path: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM files WHERE path = ?1", params![path])?;
        Ok(deleted > 0)
    }
}
