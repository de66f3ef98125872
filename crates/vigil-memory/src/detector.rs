//! Anti-pattern detection over a session's persisted event history
//!
//! Every check is stateless apart from the store: counts come from the caller,
//! emission dedup comes from prior events (or observations) for the same subject.

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;
use tracing::info;
use vigil_core::{EventType, ObservationType, PatternConfig};
use vigil_index::{NewEvent, NewObservation, Store};

#[derive(Debug, Clone, Default)]
pub struct AntiPatternDetector {
    patterns: PatternConfig,
}

impl AntiPatternDetector {
    pub fn new(patterns: PatternConfig) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &PatternConfig {
        &self.patterns
    }

    fn window(&self) -> TimeDelta {
        TimeDelta::seconds(self.patterns.thrash_window_secs)
    }

    /// A symbol added and removed again within the session. Fires once per (file, symbol).
    pub fn check_dead_end(
        &self,
        store: &Store,
        session: &str,
        file: &str,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let subject = Some(symbol);
        if !store.has_event(session, EventType::SymbolAdded, Some(file), subject)?
            || !store.has_event(session, EventType::SymbolRemoved, Some(file), subject)?
            || store.has_event(session, EventType::DeadEnd, Some(file), subject)?
        {
            return Ok(false);
        }

        let text = format!(
            "`{}` in {} was added and removed again in this session (dead end)",
            symbol, file
        );
        self.emit(
            store,
            session,
            NewEvent::new(EventType::DeadEnd).file(file).symbol(subject),
            NewObservation::new(ObservationType::AntiPattern, text).about(Some(file), subject),
            now,
        )?;
        Ok(true)
    }

    /// Too many change/access events on one file inside the trailing window.
    /// Re-armed once a full window has passed since the last emission for the file.
    pub fn check_thrash(&self, store: &Store, session: &str, file: &str, now: DateTime<Utc>) -> Result<bool> {
        let window = self.window();
        let count = store.count_events_since(session, EventType::ACTIVITY, file, now - window)?;
        if count < self.patterns.thrash_event_count as usize {
            return Ok(false);
        }
        if let Some(last) = store.last_event_time(session, EventType::ThrashDetected, file)? {
            if now - last < window {
                return Ok(false);
            }
        }

        let text = format!(
            "{} was changed or read {} times within {} seconds (thrashing)",
            file, count, self.patterns.thrash_window_secs
        );
        self.emit(
            store,
            session,
            NewEvent::new(EventType::ThrashDetected)
                .file(file)
                .extra(json!({ "events": count })),
            NewObservation::new(ObservationType::AntiPattern, text).about(Some(file), None),
            now,
        )?;
        Ok(true)
    }

    /// Fires only when `count` is exactly the threshold, so later accesses stay quiet
    pub fn check_redundant_access(
        &self,
        store: &Store,
        session: &str,
        file: &str,
        symbol: Option<&str>,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if count != self.patterns.redundant_access_count
            || store.has_event(session, EventType::RedundantAccess, Some(file), symbol)?
        {
            return Ok(false);
        }

        let subject = crate::state::access_key(file, symbol);
        let text = format!(
            "{} was accessed {} times in this session (redundant access)",
            subject, count
        );
        self.emit(
            store,
            session,
            NewEvent::new(EventType::RedundantAccess)
                .file(file)
                .symbol(symbol)
                .extra(json!({ "count": count })),
            NewObservation::new(ObservationType::AntiPattern, text).about(Some(file), symbol),
            now,
        )?;
        Ok(true)
    }

    /// Fires once per query, on exactly the threshold-th zero-result attempt
    pub fn check_failed_search(
        &self,
        store: &Store,
        session: &str,
        query: &str,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if attempts != self.patterns.failed_search_attempts
            || store.has_event_for_query(session, EventType::FailedSearch, query)?
        {
            return Ok(false);
        }

        let text = format!(
            "search for \"{}\" returned no results {} times",
            query, attempts
        );
        self.emit(
            store,
            session,
            NewEvent::new(EventType::FailedSearch).extra(json!({ "query": query, "attempts": attempts })),
            NewObservation::new(ObservationType::AntiPattern, text),
            now,
        )?;
        Ok(true)
    }

    /// The same tool failing on the same file. Recorded as an environment observation;
    /// the raw `tool_error` events are the observer's.
    pub fn check_tool_error_loop(
        &self,
        store: &Store,
        session: &str,
        tool: &str,
        file: Option<&str>,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if count != self.patterns.tool_error_count {
            return Ok(false);
        }
        let text = match file {
            Some(file) => format!("{} failed {} times on {}", tool, count, file),
            None => format!("{} failed {} times", tool, count),
        };
        if store.has_observation(session, ObservationType::Environment, file, &text)? {
            return Ok(false);
        }

        info!("{}", text);
        store.insert_observation(
            session,
            &NewObservation::new(ObservationType::Environment, text).about(file, None),
            now,
        )?;
        Ok(true)
    }

    fn emit(
        &self,
        store: &Store,
        session: &str,
        event: NewEvent<'_>,
        observation: NewObservation<'_>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        info!("{}", observation.text);
        store.with_transaction(|| {
            store.insert_event(session, &event, now)?;
            store.insert_observation(session, &observation, now)?;
            Ok(())
        })
    }
}
