//! Incremental project index: discovery, parsing passes and the SQLite store

pub mod ast_diff;
pub mod chunker;
pub mod discovery;
pub mod indexer;
pub mod resolver;
mod store;

pub use ast_diff::compute_diff;
pub use chunker::Chunk;
pub use discovery::{discover, Discovered, FileFilter};
pub use indexer::{FileOutcome, IndexError, IndexOptions, IndexReport, IndexStatus, Indexer};
pub use resolver::{ResolveError, ResolvePlan, ResolveReport};
pub use store::{
    ChunkHit, DependencyRecord, FileRecord, NewEvent, NewFile, NewObservation, Observation, SessionEvent,
    SessionRecord, SnapshotEntry, Store, StoreStats, SymbolRecord,
};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, surfacing poisoning as an error instead of a panic
pub fn lock<T>(mutex: &Mutex<T>) -> anyhow::Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| anyhow::anyhow!("store lock poisoned by a panicked thread"))
}
