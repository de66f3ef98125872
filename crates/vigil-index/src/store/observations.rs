// Durable observations and their staleness

use super::*;
use rusqlite::{params, Row};
use tracing::debug;
use vigil_core::ObservationType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub id: i64,
    pub session_id: String,
    pub obs_type: ObservationType,
    pub file_path: Option<String>,
    pub symbol_name: Option<String>,
    pub text: String,
    pub stale: bool,
    pub stale_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An observation about to be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObservation<'a> {
    pub obs_type: ObservationType,
    pub file_path: Option<&'a str>,
    pub symbol_name: Option<&'a str>,
    pub text: String,
}

impl<'a> NewObservation<'a> {
    pub fn new(obs_type: ObservationType, text: impl Into<String>) -> Self {
        Self {
            obs_type,
            file_path: None,
            symbol_name: None,
            text: text.into(),
        }
    }

    pub fn about(mut self, file_path: Option<&'a str>, symbol_name: Option<&'a str>) -> Self {
        self.file_path = file_path;
        self.symbol_name = symbol_name;
        self
    }
}

const OBSERVATION_COLUMNS: &str =
    "o.id, o.session_id, o.obs_type, o.file_path, o.symbol_name, o.text, o.stale, o.stale_reason, o.created_at";

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<Observation> {
    let obs_type: String = row.get(2)?;
    Ok(Observation {
        id: row.get(0)?,
        session_id: row.get(1)?,
        obs_type: obs_type.parse().map_err(|e| conversion_error(2, e))?,
        file_path: row.get(3)?,
        symbol_name: row.get(4)?,
        text: row.get(5)?,
        stale: row.get(6)?,
        stale_reason: row.get(7)?,
        created_at: from_millis(row.get(8)?),
    })
}

impl Store {
    pub fn insert_observation(
        &self,
        session_id: &str,
        observation: &NewObservation<'_>,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO observations (session_id, obs_type, file_path, symbol_name, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session_id,
                observation.obs_type.as_str(),
                observation.file_path,
                observation.symbol_name,
                observation.text,
                to_millis(at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Mark every fresh observation about (file, symbol) stale, in any session.
    /// Already-stale rows keep their first reason.
    pub fn mark_stale(&self, file_path: &str, symbol_name: Option<&str>, reason: &str) -> Result<usize> {
        let marked = self.conn.execute(
            "UPDATE observations SET stale = 1, stale_reason = ?3
             WHERE file_path = ?1 AND symbol_name IS ?2 AND stale = 0",
            params![file_path, symbol_name, reason],
        )?;
        Ok(marked)
    }

    /// Whether the session already recorded this exact observation
    pub fn has_observation(
        &self,
        session_id: &str,
        obs_type: ObservationType,
        file_path: Option<&str>,
        text: &str,
    ) -> Result<bool> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM observations
                           WHERE session_id = ?1 AND obs_type = ?2 AND file_path IS ?3 AND text = ?4)",
            params![session_id, obs_type.as_str(), file_path, text],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Observations, newest first; `session_id = None` spans all sessions
    pub fn list_observations(
        &self,
        session_id: Option<&str>,
        include_stale: bool,
        limit: usize,
    ) -> Result<Vec<Observation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM observations o
             WHERE (?1 IS NULL OR o.session_id = ?1) AND (?2 OR o.stale = 0)
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT ?3",
            OBSERVATION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![session_id, include_stale, limit as i64], observation_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Full-text search over observation text and subjects. Malformed queries yield no results.
    pub fn search_observations(&self, query: &str, limit: usize) -> Result<Vec<Observation>> {
        let Some(fts) = fts_query(query, false) else {
            return Ok(Vec::new());
        };
        let result = (|| -> rusqlite::Result<Vec<Observation>> {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM observations_fts
                 JOIN observations o ON o.id = observations_fts.rowid
                 WHERE observations_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
                OBSERVATION_COLUMNS
            ))?;
            let rows = stmt.query_map(params![fts, limit as i64], observation_from_row)?;
            rows.collect()
        })();
        match result {
            Ok(hits) => Ok(hits),
            Err(e) => {
                debug!("observation search for {:?} failed: {}", query, e);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::SessionMode;

    fn store_with_session() -> (Store, String) {
        let store = Store::open_in_memory().unwrap();
        let session = store.create_session(SessionMode::Indexed, None).unwrap();
        (store, session.id)
    }

    #[test]
    fn test_stale_is_one_way_and_keeps_first_reason() {
        let (store, session) = store_with_session();
        let obs = NewObservation::new(ObservationType::Change, "function `foo` added")
            .about(Some("a.ts"), Some("foo"));
        store.insert_observation(&session, &obs, Utc::now()).unwrap();

        assert_eq!(store.mark_stale("a.ts", Some("foo"), "function `foo` removed").unwrap(), 1);
        assert_eq!(store.mark_stale("a.ts", Some("foo"), "again").unwrap(), 0);

        let all = store.list_observations(Some(&session), true, 10).unwrap();
        assert!(all[0].stale);
        assert_eq!(all[0].stale_reason.as_deref(), Some("function `foo` removed"));
        assert!(store.list_observations(Some(&session), false, 10).unwrap().is_empty());
    }

    #[test]
    fn test_mark_stale_spans_sessions() {
        let (store, first) = store_with_session();
        let second = store.create_session(SessionMode::Indexed, None).unwrap().id;
        for session in [&first, &second] {
            let obs = NewObservation::new(ObservationType::Change, "seen").about(Some("a.ts"), Some("foo"));
            store.insert_observation(session, &obs, Utc::now()).unwrap();
        }
        assert_eq!(store.mark_stale("a.ts", Some("foo"), "gone").unwrap(), 2);
    }

    #[test]
    fn test_search_observations() {
        let (store, session) = store_with_session();
        let obs = NewObservation::new(
            ObservationType::AntiPattern,
            "search for `parseToken` returned nothing 3 times",
        );
        store.insert_observation(&session, &obs, Utc::now()).unwrap();

        let hits = store.search_observations("parseToken", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].obs_type, ObservationType::AntiPattern);
        assert!(store.search_observations("NEAR(", 5).unwrap().is_empty());
        assert!(store
            .has_observation(&session, ObservationType::AntiPattern, None, &obs.text)
            .unwrap());
    }
}
