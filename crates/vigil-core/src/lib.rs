//! Core types and configuration for the indexing and session-memory engine

mod config;
mod types;

pub use config::{Config, PatternConfig};
pub use types::{
    ChangeKind, EventType, FileClass, FileDiff, Import, ObservationType, ParseResult,
    SessionMode, Symbol, SymbolChange, SymbolKind, UnknownVariant,
};
