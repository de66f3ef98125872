//! Engine facade: one project index, its store and the current session
//!
//! Lock order is observer, then store. Full passes additionally hold the pass lock,
//! which is always taken first.

use crate::observer::SessionObserver;
use crate::tools::ToolCall;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use vigil_core::{Config, FileClass, FileDiff, SessionMode, Symbol};
use vigil_index::{
    compute_diff, lock, resolver, ChunkHit, DependencyRecord, FileOutcome, IndexError, IndexOptions,
    IndexReport, IndexStatus, Indexer, Observation, ResolveReport, SessionEvent, SessionRecord, Store,
    StoreStats, SymbolRecord,
};
use vigil_repo::{DependencyGraph, RegexParser, SourceParser};
use vigil_telemetry::{append_jsonl, Paths};

/// Attempts a resolve pass makes before applying a plan the index has moved past
const MAX_RESOLVE_ATTEMPTS: u32 = 3;

/// File-system change delivered by a watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
}

pub struct Engine {
    indexer: Indexer,
    store: Mutex<Store>,
    observer: Mutex<SessionObserver>,
    /// Serializes `index_all` against full resolve passes
    pass: Mutex<()>,
    /// Bumped by every single-file write so a resolve pass can detect it went stale
    generation: AtomicU64,
}

impl Engine {
    /// Open the on-disk index under `<root>/.vigil`
    pub fn open(root: impl Into<PathBuf>, config: Config) -> Result<Self> {
        let root = root.into();
        let store = Store::open(&Paths::new(&root).db_path())?;
        Self::from_store(root, config, store, Arc::new(RegexParser))
    }

    pub fn open_in_memory(root: impl Into<PathBuf>, config: Config) -> Result<Self> {
        Self::from_store(root.into(), config, Store::open_in_memory()?, Arc::new(RegexParser))
    }

    pub fn from_store(root: PathBuf, config: Config, store: Store, parser: Arc<dyn SourceParser>) -> Result<Self> {
        let observer = SessionObserver::new(&root, config.patterns.clone(), SessionMode::Indexed, None);
        Ok(Self {
            indexer: Indexer::new(root, config, parser)?,
            store: Mutex::new(store),
            observer: Mutex::new(observer),
            pass: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        self.indexer.root()
    }

    pub fn config(&self) -> &Config {
        self.indexer.config()
    }

    /// Replace the current session. The new one is persisted on its first event.
    pub fn start_session(&self, mode: SessionMode, label: Option<&str>) -> Result<()> {
        let observer = SessionObserver::new(
            self.root(),
            self.config().patterns.clone(),
            mode,
            label.map(str::to_string),
        );
        *lock(&self.observer)? = observer;
        Ok(())
    }

    /// The current session, once something has been recorded in it
    pub fn session(&self) -> Result<Option<SessionRecord>> {
        Ok(lock(&self.observer)?.session().cloned())
    }

    /// Run `f` against the store under its lock
    pub fn with_store<T>(&self, f: impl FnOnce(&Store) -> Result<T>) -> Result<T> {
        let store = lock(&self.store)?;
        f(&store)
    }

    pub fn index_all(&self, options: &IndexOptions) -> Result<IndexReport> {
        let _pass = lock(&self.pass)?;
        let report = self.indexer.index_all(&self.store, options)?;
        for diff in &report.diffs {
            self.observe_diff(diff);
        }
        Ok(report)
    }

    pub fn index_file(&self, path: &str, force: bool) -> Result<FileOutcome, IndexError> {
        let rel = self.indexer.relative(Path::new(path));
        // The generation moves while the store is still held, so a resolve that
        // takes the lock next always sees it
        let outcome = {
            let store = lock(&self.store)?;
            let outcome = self.indexer.index_file(&store, &rel, force)?;
            if outcome.status != IndexStatus::Skipped {
                self.generation.fetch_add(1, Ordering::SeqCst);
            }
            outcome
        };
        if let Some(diff) = &outcome.diff {
            self.observe_diff(diff);
        }
        Ok(outcome)
    }

    pub fn index_document(&self, path: &str, force: bool) -> Result<FileOutcome, IndexError> {
        let rel = self.indexer.relative(Path::new(path));
        let store = lock(&self.store)?;
        self.indexer.index_document(&store, &rel, force)
    }

    /// Drop a deleted file; its symbols count as removed for the session. False when
    /// the file was never indexed.
    pub fn remove_file(&self, path: &str) -> Result<bool> {
        let rel = self.indexer.relative(Path::new(path));
        let diff = {
            let store = lock(&self.store)?;
            let diff = self.indexer.remove_file(&store, &rel)?;
            if diff.is_some() {
                self.generation.fetch_add(1, Ordering::SeqCst);
            }
            diff
        };
        let Some(diff) = diff else {
            return Ok(false);
        };
        self.observe_diff(&diff);
        Ok(true)
    }

    /// Second pass over every indexed code file.
    ///
    /// Parsing runs without the store lock. If a single-file write lands meanwhile the
    /// plan is rebuilt; after the last attempt the newest plan is applied anyway and
    /// the next resolve converges.
    pub fn resolve_dependencies(&self) -> Result<ResolveReport> {
        let _pass = lock(&self.pass)?;
        let mut attempt = 1;
        loop {
            let generation = self.generation.load(Ordering::SeqCst);
            let paths = self.code_paths()?;
            let known: HashSet<String> = paths.iter().cloned().collect();
            let plan = resolver::plan(self.root(), self.indexer.parser(), &paths, &known);

            let store = lock(&self.store)?;
            if self.generation.load(Ordering::SeqCst) != generation {
                if attempt < MAX_RESOLVE_ATTEMPTS {
                    debug!("index changed during resolve, retrying ({}/{})", attempt, MAX_RESOLVE_ATTEMPTS);
                    attempt += 1;
                    continue;
                }
                warn!(
                    "index kept changing during resolve; applying after {} attempts",
                    MAX_RESOLVE_ATTEMPTS
                );
            }
            let report = store.with_transaction(|| resolver::apply(&store, plan))?;
            info!(
                "resolved {} files, {} edges, {} unresolved",
                report.files,
                report.edges,
                report.failures.len()
            );
            return Ok(report);
        }
    }

    /// Re-resolve one file's imports against the current file set
    pub fn resolve_file(&self, path: &str) -> Result<ResolveReport> {
        let rel = self.indexer.relative(Path::new(path));
        let known: HashSet<String> = self.code_paths()?.into_iter().collect();
        let plan = resolver::plan(self.root(), self.indexer.parser(), &[rel], &known);
        let store = lock(&self.store)?;
        store.with_transaction(|| resolver::apply(&store, plan))
    }

    fn code_paths(&self) -> Result<Vec<String>> {
        let files = lock(&self.store)?.list_files(Some(FileClass::Code))?;
        Ok(files.into_iter().map(|f| f.path).collect())
    }

    /// Diff `symbols` against the file's snapshot and roll the snapshot forward
    pub fn compute_ast_diff(&self, path: &str, symbols: &[Symbol]) -> Result<FileDiff> {
        let rel = self.indexer.relative(Path::new(path));
        let store = lock(&self.store)?;
        store.with_transaction(|| compute_diff(&store, &rel, symbols))
    }

    pub fn on_tool_call(&self, call: &ToolCall) {
        self.on_tool_call_at(call, Utc::now());
    }

    pub fn on_tool_call_at(&self, call: &ToolCall, now: DateTime<Utc>) {
        self.observe(|observer, store| observer.on_tool_call_at(store, call, now));
    }

    pub fn on_file_diff(&self, diff: &FileDiff) {
        self.on_file_diff_at(diff, Utc::now());
    }

    pub fn on_file_diff_at(&self, diff: &FileDiff, now: DateTime<Utc>) {
        self.observe(|observer, store| observer.on_file_diff_at(store, diff, now));
    }

    fn observe_diff(&self, diff: &FileDiff) {
        if diff.has_changes() {
            self.on_file_diff(diff);
        }
    }

    fn observe(&self, f: impl FnOnce(&mut SessionObserver, &Store)) {
        let guards = lock(&self.observer).and_then(|observer| Ok((observer, lock(&self.store)?)));
        match guards {
            Ok((mut observer, store)) => f(&mut observer, &store),
            Err(e) => warn!("observer unavailable: {}", e),
        }
    }

    /// Apply one watcher event. Per-file failures are logged; only store errors return.
    pub fn on_watch_event(&self, event: &WatchEvent) -> Result<()> {
        let path = match event {
            WatchEvent::Added(path) | WatchEvent::Changed(path) => path,
            WatchEvent::Removed(path) => {
                if self.remove_file(&path.to_string_lossy())? {
                    info!("removed {}", self.indexer.relative(path));
                }
                return Ok(());
            }
        };

        let rel = self.indexer.relative(path);
        let Some(class) = self.indexer.filter().classify(&rel) else {
            debug!("watch: not indexed: {}", rel);
            return Ok(());
        };
        let result = match class {
            FileClass::Code => self.index_file(&rel, false),
            FileClass::Doc => self.index_document(&rel, false),
        };
        match result {
            Ok(outcome) if outcome.status == IndexStatus::Skipped => {}
            Ok(outcome) => {
                info!("{:?} {}", outcome.status, rel);
                if class == FileClass::Code {
                    let report = self.resolve_file(&rel)?;
                    debug!("{}: {} edges", rel, report.edges);
                }
            }
            Err(IndexError::Store(e)) => return Err(e),
            Err(e) => warn!("watch: {}", e),
        }
        Ok(())
    }

    pub fn dependencies_of(&self, path: &str) -> Result<Vec<DependencyRecord>> {
        lock(&self.store)?.dependencies_of(&self.indexer.relative(Path::new(path)))
    }

    pub fn imported_by(&self, path: &str) -> Result<Vec<DependencyRecord>> {
        lock(&self.store)?.imported_by(&self.indexer.relative(Path::new(path)))
    }

    pub fn symbols_in(&self, path: &str) -> Result<Vec<SymbolRecord>> {
        lock(&self.store)?.symbols_for_file(&self.indexer.relative(Path::new(path)))
    }

    pub fn search_symbols(&self, query: &str, limit: usize) -> Result<Vec<SymbolRecord>> {
        lock(&self.store)?.search_symbols(query, limit)
    }

    pub fn search_docs(&self, query: &str, limit: usize) -> Result<Vec<ChunkHit>> {
        lock(&self.store)?.search_chunks(query, limit)
    }

    pub fn search_observations(&self, query: &str, limit: usize) -> Result<Vec<Observation>> {
        lock(&self.store)?.search_observations(query, limit)
    }

    /// Newest first; `session = None` spans every session
    pub fn observations(&self, session: Option<&str>, include_stale: bool, limit: usize) -> Result<Vec<Observation>> {
        lock(&self.store)?.list_observations(session, include_stale, limit)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        lock(&self.store)?.stats()
    }

    /// Most central files by PageRank over resolved import edges
    pub fn central_files(&self, limit: usize) -> Result<Vec<(String, f64)>> {
        let edges = lock(&self.store)?.all_edges()?;
        let graph = DependencyGraph::from_edges(edges.iter().map(|(from, to)| (from.as_str(), to.as_str())));
        Ok(graph.ranked(limit))
    }

    /// Append a session's events to its JSONL export file. Returns the file and count.
    pub fn export_events(&self, session_id: &str) -> Result<(PathBuf, usize)> {
        let events: Vec<SessionEvent> = lock(&self.store)?.events_for_session(session_id)?;
        let path = Paths::new(self.root()).events_export_path(session_id);
        let written = append_jsonl(&path, &events)?;
        Ok((path, written))
    }
}
