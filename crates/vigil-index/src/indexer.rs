//! Indexer: keep file, symbol and edge rows consistent with on-disk content

use crate::ast_diff::compute_diff;
use crate::chunker::{chunk_lines, chunk_markdown};
use crate::discovery::{discover, explicit_class, Discovered, FileFilter};
use crate::lock;
use crate::store::{NewFile, Store};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use vigil_core::{Config, FileClass, FileDiff};
use vigil_repo::{detect_language, hash_content, Language, SourceParser};
use vigil_telemetry::Paths;

/// Per-file indexing failure. Everything but `Store` is recorded and skipped.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("{path}: file not found")]
    Missing { path: String },

    #[error("{path}: read failed: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: cannot decode as UTF-8 text")]
    Parse { path: String },

    #[error("{path}: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl IndexError {
    /// Infrastructure failures stop a batch; everything else is per-file
    pub fn is_fatal(&self) -> bool {
        matches!(self, IndexError::Store(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    /// No row existed before
    Indexed,
    /// An existing row was rewritten
    Updated,
    /// Content hash unchanged
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: String,
    pub status: IndexStatus,
    /// Symbol diff against the snapshot; `None` for skipped files and documents
    pub diff: Option<FileDiff>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexOptions {
    pub force: bool,
    /// Files or directories indexed in addition to discovery, relative to the root
    pub additional_paths: Vec<PathBuf>,
}

/// Aggregate result of a full pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub indexed: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Rows dropped because their file no longer exists on disk
    pub removed: usize,
    pub errors: Vec<String>,
    /// Diffs that reported at least one change
    #[serde(skip)]
    pub diffs: Vec<FileDiff>,
}

impl IndexReport {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome.status {
            IndexStatus::Indexed => self.indexed += 1,
            IndexStatus::Updated => self.updated += 1,
            IndexStatus::Skipped => self.skipped += 1,
        }
        if let Some(diff) = outcome.diff {
            if diff.has_changes() {
                self.diffs.push(diff);
            }
        }
    }
}

pub struct Indexer {
    paths: Paths,
    config: Config,
    filter: FileFilter,
    parser: Arc<dyn SourceParser>,
}

impl Indexer {
    pub fn new(root: impl Into<PathBuf>, config: Config, parser: Arc<dyn SourceParser>) -> Result<Self> {
        let filter = FileFilter::from_config(&config)?;
        Ok(Self {
            paths: Paths::new(root),
            config,
            filter,
            parser,
        })
    }

    pub fn root(&self) -> &Path {
        &self.paths.project_root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    pub fn parser(&self) -> &dyn SourceParser {
        self.parser.as_ref()
    }

    /// Project-relative form of a path given relative to the root or absolute
    pub fn relative(&self, path: &Path) -> String {
        self.paths.relative(path)
    }

    /// Discover and index every selected file, then drop rows for vanished files.
    ///
    /// The store lock is taken per file, so queries interleave with a long pass.
    pub fn index_all(&self, store: &Mutex<Store>, options: &IndexOptions) -> Result<IndexReport> {
        let mut files = discover(self.root(), self.root(), &self.filter)?;
        for extra in &options.additional_paths {
            files.extend(self.expand(extra)?);
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);

        let mut report = IndexReport::default();
        for file in &files {
            let result = {
                let store = lock(store)?;
                match file.class {
                    FileClass::Code => self.index_file(&store, &file.path, options.force),
                    FileClass::Doc => self.index_document(&store, &file.path, options.force),
                }
            };
            match result {
                Ok(outcome) => report.record(outcome),
                Err(IndexError::Store(e)) => return Err(e),
                Err(e) => {
                    warn!("{}", e);
                    report.errors.push(e.to_string());
                }
            }
        }

        let removals = {
            let store = lock(store)?;
            self.prune_missing(&store)?
        };
        report.removed = removals.len();
        report.diffs.extend(removals.into_iter().filter(FileDiff::has_changes));
        info!(
            "indexed {} updated {} skipped {} removed {} errors {}",
            report.indexed,
            report.updated,
            report.skipped,
            report.removed,
            report.errors.len()
        );
        Ok(report)
    }

    /// Explicit paths: a directory is walked with the usual filter, a file is taken as is
    fn expand(&self, path: &Path) -> Result<Vec<Discovered>> {
        let abs = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root().join(path)
        };
        if abs.is_dir() {
            return discover(self.root(), &abs, &self.filter);
        }
        let rel = self.relative(&abs);
        Ok(vec![Discovered {
            class: explicit_class(&self.filter, &rel),
            path: rel,
        }])
    }

    fn prune_missing(&self, store: &Store) -> Result<Vec<FileDiff>> {
        let mut removed = Vec::new();
        for file in store.list_files(None)? {
            if self.root().join(&file.path).exists() {
                continue;
            }
            if let Some(diff) = self.remove_file(store, &file.path)? {
                debug!("removed vanished file {}", file.path);
                removed.push(diff);
            }
        }
        Ok(removed)
    }

    /// Read, hash and (when changed) reparse one source file.
    ///
    /// The file row upsert, symbol replacement, edge clearing and snapshot diff run in
    /// one transaction. Edges are re-created by the resolver, not here.
    pub fn index_file(&self, store: &Store, path: &str, force: bool) -> Result<FileOutcome, IndexError> {
        let bytes = self.read(path)?;
        let hash = hash_content(&bytes);
        if !force && store.get_file_hash(path)?.as_deref() == Some(hash.as_str()) {
            return Ok(skipped(path));
        }

        let size = bytes.len() as u64;
        let content = String::from_utf8(bytes).map_err(|_| IndexError::Parse {
            path: path.to_string(),
        })?;
        let parsed = self.parser.parse(path, &content);
        let language = detect_language(path);

        let (existed, diff) = store.with_transaction(|| {
            let file = NewFile::code(path, language.as_str(), &hash).sized(size, parsed.token_estimate);
            let (file_id, existed) = store.upsert_file(&file)?;
            store.replace_symbols(file_id, &parsed.symbols)?;
            store.clear_dependencies(file_id)?;
            let diff = compute_diff(store, path, &parsed.symbols)?;
            Ok((existed, diff))
        })?;

        debug!(
            "indexed {} ({} symbols, {} changes)",
            path,
            parsed.symbols.len(),
            diff.changes.len()
        );
        Ok(FileOutcome {
            path: path.to_string(),
            status: if existed { IndexStatus::Updated } else { IndexStatus::Indexed },
            diff: Some(diff),
        })
    }

    /// Same hash-skip discipline as `index_file`, persisting chunks instead of symbols
    pub fn index_document(&self, store: &Store, path: &str, force: bool) -> Result<FileOutcome, IndexError> {
        let bytes = self.read(path)?;
        let hash = hash_content(&bytes);
        if !force && store.get_file_hash(path)?.as_deref() == Some(hash.as_str()) {
            return Ok(skipped(path));
        }

        let size = bytes.len() as u64;
        let content = String::from_utf8_lossy(&bytes);
        let language = detect_language(path);
        let chunks = match language {
            Language::Markdown => chunk_markdown(&content),
            _ => chunk_lines(&content, self.config.doc_chunk_lines),
        };
        let tokens = vigil_telemetry::estimate_tokens(&content);

        let existed = store.with_transaction(|| {
            let file = NewFile::doc(path, language.as_str(), &hash).sized(size, tokens);
            let (file_id, existed) = store.upsert_file(&file)?;
            store.replace_chunks(file_id, &chunks)?;
            Ok(existed)
        })?;

        debug!("indexed document {} ({} chunks)", path, chunks.len());
        Ok(FileOutcome {
            path: path.to_string(),
            status: if existed { IndexStatus::Updated } else { IndexStatus::Indexed },
            diff: None,
        })
    }

    /// Drop a deleted file's rows. For code files the diff against an empty symbol set
    /// reports every snapshotted symbol as removed; `None` when no row existed.
    pub fn remove_file(&self, store: &Store, path: &str) -> Result<Option<FileDiff>> {
        let Some(file) = store.get_file(path)? else {
            return Ok(None);
        };
        store.with_transaction(|| {
            let diff = match file.class {
                FileClass::Code => compute_diff(store, path, &[])?,
                FileClass::Doc => FileDiff {
                    file_path: path.to_string(),
                    first_observation: false,
                    changes: Vec::new(),
                },
            };
            store.delete_file(path)?;
            debug!("removed {} ({} symbols dropped)", path, diff.changes.len());
            Ok(Some(diff))
        })
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, IndexError> {
        let abs = self.root().join(path);
        let metadata = match std::fs::metadata(&abs) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(IndexError::Missing { path: path.to_string() }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexError::Missing { path: path.to_string() })
            }
            Err(source) => {
                return Err(IndexError::Read {
                    path: path.to_string(),
                    source,
                })
            }
        };
        if metadata.len() > self.config.max_file_bytes {
            return Err(IndexError::TooLarge {
                path: path.to_string(),
                size: metadata.len(),
                limit: self.config.max_file_bytes,
            });
        }
        std::fs::read(&abs).map_err(|source| IndexError::Read {
            path: path.to_string(),
            source,
        })
    }
}

fn skipped(path: &str) -> FileOutcome {
    FileOutcome {
        path: path.to_string(),
        status: IndexStatus::Skipped,
        diff: None,
    }
}
