// Sessions and the append-only session event log

use super::*;
use rusqlite::{params, OptionalExtension, Row};
use vigil_core::{EventType, SessionMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub id: String,
    pub mode: SessionMode,
    pub label: Option<String>,
    pub started_at: DateTime<Utc>,
    pub tokens_served: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub id: i64,
    pub session_id: String,
    pub event_type: EventType,
    pub file_path: Option<String>,
    pub symbol_name: Option<String>,
    pub extra: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// An event about to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent<'a> {
    pub event_type: EventType,
    pub file_path: Option<&'a str>,
    pub symbol_name: Option<&'a str>,
    pub extra: Option<serde_json::Value>,
}

impl<'a> NewEvent<'a> {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            file_path: None,
            symbol_name: None,
            extra: None,
        }
    }

    pub fn file(mut self, file_path: &'a str) -> Self {
        self.file_path = Some(file_path);
        self
    }

    pub fn symbol(mut self, symbol_name: Option<&'a str>) -> Self {
        self.symbol_name = symbol_name;
        self
    }

    pub fn extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

const EVENT_COLUMNS: &str = "id, session_id, event_type, file_path, symbol_name, extra, created_at";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<SessionEvent> {
    let event_type: String = row.get(2)?;
    let extra: Option<String> = row.get(5)?;
    Ok(SessionEvent {
        id: row.get(0)?,
        session_id: row.get(1)?,
        event_type: event_type.parse().map_err(|e| conversion_error(2, e))?,
        file_path: row.get(3)?,
        symbol_name: row.get(4)?,
        extra: match extra {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| conversion_error(5, e))?),
            None => None,
        },
        created_at: from_millis(row.get(6)?),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let mode: String = row.get(1)?;
    Ok(SessionRecord {
        id: row.get(0)?,
        mode: mode.parse().map_err(|e| conversion_error(1, e))?,
        label: row.get(2)?,
        started_at: from_millis(row.get(3)?),
        tokens_served: row.get::<_, i64>(4)? as u64,
    })
}

/// Placeholders `?{first}, ?{first+1}, ...` for an IN list
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Store {
    pub fn create_session(&self, mode: SessionMode, label: Option<&str>) -> Result<SessionRecord> {
        let session = SessionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            label: label.map(str::to_string),
            started_at: Utc::now(),
            tokens_served: 0,
        };
        self.conn.execute(
            "INSERT INTO sessions (id, mode, label, started_at, tokens_served) VALUES (?1, ?2, ?3, ?4, 0)",
            params![session.id, mode.as_str(), session.label, to_millis(session.started_at)],
        )?;
        Ok(session)
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRecord>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, mode, label, started_at, tokens_served FROM sessions WHERE id = ?1",
                params![id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Most recent sessions first
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mode, label, started_at, tokens_served FROM sessions
             ORDER BY started_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], session_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn add_session_tokens(&self, session_id: &str, tokens: u64) -> Result<()> {
        self.conn.execute(
            "UPDATE sessions SET tokens_served = tokens_served + ?2 WHERE id = ?1",
            params![session_id, tokens as i64],
        )?;
        Ok(())
    }

    pub fn insert_event(&self, session_id: &str, event: &NewEvent<'_>, at: DateTime<Utc>) -> Result<i64> {
        let extra = event.extra.as_ref().map(serde_json::to_string).transpose()?;
        self.conn.execute(
            "INSERT INTO session_events (session_id, event_type, file_path, symbol_name, extra, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session_id,
                event.event_type.as_str(),
                event.file_path,
                event.symbol_name,
                extra,
                to_millis(at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Whether the session already holds an event of this type for the subject
    pub fn has_event(
        &self,
        session_id: &str,
        event_type: EventType,
        file_path: Option<&str>,
        symbol_name: Option<&str>,
    ) -> Result<bool> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM session_events
                           WHERE session_id = ?1 AND event_type = ?2
                             AND file_path IS ?3 AND symbol_name IS ?4)",
            params![session_id, event_type.as_str(), file_path, symbol_name],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Whether the session already holds an event whose extra payload carries `query`
    pub fn has_event_for_query(&self, session_id: &str, event_type: EventType, query: &str) -> Result<bool> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM session_events
                           WHERE session_id = ?1 AND event_type = ?2
                             AND json_extract(extra, '$.query') = ?3)",
            params![session_id, event_type.as_str(), query],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Events of the given types on `file_path` at or after `since`
    pub fn count_events_since(
        &self,
        session_id: &str,
        event_types: &[EventType],
        file_path: &str,
        since: DateTime<Utc>,
    ) -> Result<usize> {
        if event_types.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "SELECT COUNT(*) FROM session_events
             WHERE session_id = ?1 AND file_path = ?2 AND created_at >= ?3
               AND event_type IN ({})",
            placeholders(4, event_types.len())
        );
        let since = to_millis(since);
        let mut values: Vec<&dyn rusqlite::ToSql> = vec![&session_id, &file_path, &since];
        let names: Vec<&str> = event_types.iter().map(|t| t.as_str()).collect();
        for name in &names {
            values.push(name);
        }
        let count: i64 = self
            .conn
            .query_row(&sql, values.as_slice(), |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Time of the newest event of this type on `file_path`
    pub fn last_event_time(
        &self,
        session_id: &str,
        event_type: EventType,
        file_path: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let ms: Option<i64> = self.conn.query_row(
            "SELECT MAX(created_at) FROM session_events
             WHERE session_id = ?1 AND event_type = ?2 AND file_path = ?3",
            params![session_id, event_type.as_str(), file_path],
            |row| row.get(0),
        )?;
        Ok(ms.map(from_millis))
    }

    /// A session's events in insertion order
    pub fn events_for_session(&self, session_id: &str) -> Result<Vec<SessionEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM session_events WHERE session_id = ?1 ORDER BY id",
            EVENT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![session_id], event_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}
