//! Session observer: turns tool calls and file diffs into events and observations
//!
//! Hooks never fail from the caller's point of view. Internally every step returns a
//! typed `Result`; the public entry points log failures at `warn` and carry on.

use crate::detector::AntiPatternDetector;
use crate::state::SessionState;
use crate::tools::{ToolCall, ToolKind};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vigil_core::{ChangeKind, EventType, FileDiff, ObservationType, PatternConfig, SessionMode};
use vigil_index::{NewEvent, NewObservation, SessionRecord, Store};
use vigil_telemetry::{estimate_tokens, Paths};

#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    #[error("{check} check failed: {source}")]
    Check {
        check: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct SessionObserver {
    paths: Paths,
    mode: SessionMode,
    label: Option<String>,
    /// Created on first write so read-only runs leave no empty sessions behind
    session: Option<SessionRecord>,
    state: SessionState,
    detector: AntiPatternDetector,
}

impl SessionObserver {
    pub fn new(root: impl Into<PathBuf>, patterns: PatternConfig, mode: SessionMode, label: Option<String>) -> Self {
        Self {
            paths: Paths::new(root),
            mode,
            label,
            session: None,
            state: SessionState::new(),
            detector: AntiPatternDetector::new(patterns),
        }
    }

    /// The session, if anything has been recorded yet
    pub fn session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn session_id(&mut self, store: &Store) -> Result<String, ObserverError> {
        if let Some(session) = &self.session {
            return Ok(session.id.clone());
        }
        let session = store.create_session(self.mode, self.label.as_deref())?;
        debug!("started {} session {}", session.mode, session.id);
        let id = session.id.clone();
        self.session = Some(session);
        Ok(id)
    }

    pub fn on_tool_call(&mut self, store: &Store, call: &ToolCall) {
        self.on_tool_call_at(store, call, Utc::now());
    }

    pub fn on_tool_call_at(&mut self, store: &Store, call: &ToolCall, now: DateTime<Utc>) {
        if let Err(e) = self.handle_tool_call(store, call, now) {
            warn!("observer failed on {} call: {}", call.tool, e);
        }
    }

    pub fn on_file_diff(&mut self, store: &Store, diff: &FileDiff) {
        self.on_file_diff_at(store, diff, Utc::now());
    }

    pub fn on_file_diff_at(&mut self, store: &Store, diff: &FileDiff, now: DateTime<Utc>) {
        if let Err(e) = self.handle_file_diff(store, diff, now) {
            warn!("observer failed on diff of {}: {}", diff.file_path, e);
        }
    }

    fn handle_tool_call(&mut self, store: &Store, call: &ToolCall, now: DateTime<Utc>) -> Result<(), ObserverError> {
        let file = call.target_file().map(|f| self.paths.relative(Path::new(f)));
        let file = file.as_deref();

        if call.is_error {
            return self.handle_tool_error(store, call, file, now);
        }

        match call.kind() {
            ToolKind::Lookup => {
                let Some(file) = file else {
                    return Ok(());
                };
                let symbol = call.symbol_arg();
                let session = self.session_id(store)?;

                if call.result_is_empty() {
                    // The file is there but the index had nothing: the index is behind
                    if self.paths.project_root.join(file).is_file() {
                        let event = NewEvent::new(EventType::IndexBlindSpot)
                            .file(file)
                            .symbol(symbol)
                            .extra(json!({ "tool": call.tool }));
                        store.insert_event(&session, &event, now)?;
                        debug!("index blind spot: {} on {}", call.tool, file);
                    }
                    return Ok(());
                }

                let event = NewEvent::new(EventType::Accessed)
                    .file(file)
                    .symbol(symbol)
                    .extra(json!({ "tool": call.tool }));
                store.insert_event(&session, &event, now)?;
                self.count_tokens(store, &session, call)?;

                let count = self.state.record_access(file, symbol);
                let fired = self
                    .detector
                    .check_redundant_access(store, &session, file, symbol, count, now);
                report("redundant access", fired);
            }
            ToolKind::Search => {
                let Some(query) = call.query_arg() else {
                    return Ok(());
                };
                let session = self.session_id(store)?;
                if !call.result_is_empty() {
                    self.count_tokens(store, &session, call)?;
                    return Ok(());
                }
                let attempts = self.state.record_failed_search(query);
                let fired = self
                    .detector
                    .check_failed_search(store, &session, query, attempts, now);
                report("failed search", fired);
            }
            ToolKind::Other => {}
        }
        Ok(())
    }

    fn handle_tool_error(
        &mut self,
        store: &Store,
        call: &ToolCall,
        file: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), ObserverError> {
        let session = self.session_id(store)?;
        let mut event = NewEvent::new(EventType::ToolError).extra(json!({
            "tool": call.tool,
            "error": call.result,
        }));
        if let Some(file) = file {
            event = event.file(file);
        }
        store.insert_event(&session, &event, now)?;

        let count = self.state.record_tool_error(&call.tool, file.unwrap_or(""));
        let fired = self
            .detector
            .check_tool_error_loop(store, &session, &call.tool, file, count, now);
        report("tool error loop", fired);
        Ok(())
    }

    fn handle_file_diff(&mut self, store: &Store, diff: &FileDiff, now: DateTime<Utc>) -> Result<(), ObserverError> {
        if diff.first_observation || !diff.has_changes() {
            return Ok(());
        }
        let session = self.session_id(store)?;
        let file = diff.file_path.as_str();

        for change in &diff.changes {
            let symbol = Some(change.symbol.as_str());
            let event = NewEvent::new(change.kind.event_type())
                .file(file)
                .symbol(symbol)
                .extra(json!({
                    "description": change.description,
                    "old_signature": change.old_signature,
                    "new_signature": change.new_signature,
                }));
            store.insert_event(&session, &event, now)?;

            // Before recording anything new, so the fresh observation stays fresh
            if change.kind.invalidates() {
                let marked = store.mark_stale(file, symbol, &change.description)?;
                if marked > 0 {
                    debug!("{} observations on {}::{} now stale", marked, file, change.symbol);
                }
            }

            if self.state.was_accessed(file, symbol) {
                let observation = NewObservation::new(ObservationType::Change, change.description.clone())
                    .about(Some(file), symbol);
                store.insert_observation(&session, &observation, now)?;
            }

            if change.kind == ChangeKind::Removed {
                let fired = self
                    .detector
                    .check_dead_end(store, &session, file, &change.symbol, now);
                report("dead end", fired);
            }
        }

        let fired = self.detector.check_thrash(store, &session, file, now);
        report("thrash", fired);
        Ok(())
    }

    fn count_tokens(&self, store: &Store, session: &str, call: &ToolCall) -> Result<(), ObserverError> {
        let tokens = estimate_tokens(&call.result.to_string()) as u64;
        store.add_session_tokens(session, tokens)?;
        Ok(())
    }
}

/// Log a failed detector check without aborting the hook
fn report(check: &'static str, result: anyhow::Result<bool>) {
    if let Err(source) = result {
        warn!("{}", ObserverError::Check { check, source });
    }
}
