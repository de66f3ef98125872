//! SQLite-backed persistent store for files, symbols, edges, snapshots and session memory
//!
//! One `Store` wraps one connection. Each concern lives in its own module as an
//! `impl Store` block; this module owns opening, schema and transactions.

mod chunks;
mod deps;
mod files;
mod observations;
mod schema;
mod sessions;
mod snapshots;
mod symbols;

pub use chunks::ChunkHit;
pub use deps::DependencyRecord;
pub use files::{FileRecord, NewFile};
pub use observations::{NewObservation, Observation};
pub use sessions::{NewEvent, SessionEvent, SessionRecord};
pub use snapshots::SnapshotEntry;
pub use symbols::SymbolRecord;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

pub struct Store {
    conn: Connection,
}

/// Row counts across the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub code_files: usize,
    pub doc_files: usize,
    pub symbols: usize,
    pub dependencies: usize,
    pub chunks: usize,
    pub sessions: usize,
    pub events: usize,
    pub observations: usize,
    pub stale_observations: usize,
}

impl Store {
    /// Open (or create) the database at `path` and run migrations
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        let store = Self { conn };
        store.apply_pragmas()?;
        store.migrate()?;
        Ok(store)
    }

    /// In-memory database for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        let store = Self { conn };
        store.apply_pragmas()?;
        store.migrate()?;
        Ok(store)
    }

    fn apply_pragmas(&self) -> Result<()> {
        // In-memory databases report "memory" and stay that way
        let _mode: String = self
            .conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.busy_timeout(Duration::from_millis(5000))?;
        Ok(())
    }

    /// Execute `f` inside an IMMEDIATE transaction. Commits on Ok, rolls back on Err.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f() {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok(StoreStats {
            code_files: count("SELECT COUNT(*) FROM files WHERE class = 'code'")?,
            doc_files: count("SELECT COUNT(*) FROM files WHERE class = 'doc'")?,
            symbols: count("SELECT COUNT(*) FROM symbols")?,
            dependencies: count("SELECT COUNT(*) FROM dependencies")?,
            chunks: count("SELECT COUNT(*) FROM chunks")?,
            sessions: count("SELECT COUNT(*) FROM sessions")?,
            events: count("SELECT COUNT(*) FROM session_events")?,
            observations: count("SELECT COUNT(*) FROM observations")?,
            stale_observations: count("SELECT COUNT(*) FROM observations WHERE stale = 1")?,
        })
    }
}

/// Quote each whitespace-separated token so user input never reaches FTS5 syntax.
/// `prefix` appends `*` to every token. `None` when nothing searchable remains.
fn fts_query(query: &str, prefix: bool) -> Option<String> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(|token| {
            let quoted = format!("\"{}\"", token.replace('"', "\"\""));
            if prefix {
                format!("{}*", quoted)
            } else {
                quoted
            }
        })
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Map an enum-parse failure on a stored column into a rusqlite row error
fn conversion_error(column: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_migrates() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.stats().unwrap(), StoreStats::default());
    }

    #[test]
    fn test_open_file_creates_parent() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(".vigil").join("index.db");
        let store = Store::open(&path).unwrap();
        drop(store);
        assert!(path.exists());

        // Reopening runs migrations again without error
        Store::open(&path).unwrap();
    }

    #[test]
    fn test_fts_query_quotes_tokens() {
        assert_eq!(fts_query("parse token", false).as_deref(), Some("\"parse\" \"token\""));
        assert_eq!(fts_query("a\"b", true).as_deref(), Some("\"a\"\"b\"*"));
        assert_eq!(fts_query("   ", false), None);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<()> = store.with_transaction(|| {
            store.upsert_file(&NewFile::code("a.ts", "typescript", "h1"))?;
            anyhow::bail!("boom")
        });
        assert!(result.is_err());
        assert!(store.get_file("a.ts").unwrap().is_none());
    }
}
