// Document chunks and full-text document search

use super::*;
use crate::chunker::Chunk;
use rusqlite::params;
use tracing::debug;

/// A chunk matched by a document search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkHit {
    pub file_path: String,
    #[serde(flatten)]
    pub chunk: Chunk,
}

impl Store {
    /// Delete every chunk of the file, then insert `chunks`
    pub fn replace_chunks(&self, file_id: i64, chunks: &[Chunk]) -> Result<()> {
        self.conn
            .execute("DELETE FROM chunks WHERE file_id = ?1", params![file_id])?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO chunks (file_id, chunk_index, heading, start_line, end_line, text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for chunk in chunks {
            stmt.execute(params![
                file_id,
                chunk.index as i64,
                chunk.heading,
                chunk.start_line as i64,
                chunk.end_line as i64,
                chunk.text,
            ])?;
        }
        Ok(())
    }

    pub fn chunks_for_file(&self, path: &str) -> Result<Vec<Chunk>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.chunk_index, c.heading, c.start_line, c.end_line, c.text
             FROM chunks c JOIN files f ON f.id = c.file_id
             WHERE f.path = ?1 ORDER BY c.chunk_index",
        )?;
        let rows = stmt.query_map(params![path], |row| {
            Ok(Chunk {
                index: row.get::<_, i64>(0)? as usize,
                heading: row.get(1)?,
                start_line: row.get::<_, i64>(2)? as usize,
                end_line: row.get::<_, i64>(3)? as usize,
                text: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Full-text search over document chunks. Malformed queries yield no results.
    pub fn search_chunks(&self, query: &str, limit: usize) -> Result<Vec<ChunkHit>> {
        let Some(fts) = fts_query(query, false) else {
            return Ok(Vec::new());
        };
        let result = (|| -> rusqlite::Result<Vec<ChunkHit>> {
            let mut stmt = self.conn.prepare(
                "SELECT f.path, c.chunk_index, c.heading, c.start_line, c.end_line, c.text
                 FROM chunks_fts
                 JOIN chunks c ON c.id = chunks_fts.rowid
                 JOIN files f ON f.id = c.file_id
                 WHERE chunks_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![fts, limit as i64], |row| {
                Ok(ChunkHit {
                    file_path: row.get(0)?,
                    chunk: Chunk {
                        index: row.get::<_, i64>(1)? as usize,
                        heading: row.get(2)?,
                        start_line: row.get::<_, i64>(3)? as usize,
                        end_line: row.get::<_, i64>(4)? as usize,
                        text: row.get(5)?,
                    },
                })
            })?;
            rows.collect()
        })();
        match result {
            Ok(hits) => Ok(hits),
            Err(e) => {
                debug!("document search for {:?} failed: {}", query, e);
                Ok(Vec::new())
            }
        }
    }
}
