//! Core types shared by the indexer, the store and the session observer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned when a persisted string does not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {value}")]
pub struct UnknownVariant {
    pub what: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` over the serde (snake_case) names.
macro_rules! string_enum {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    _ => Err(UnknownVariant {
                        what: $what,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// Kind of declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Const,
    Type,
    Interface,
    Enum,
    Variable,
}

string_enum!(SymbolKind, "symbol kind", {
    Function => "function",
    Class => "class",
    Method => "method",
    Const => "const",
    Type => "type",
    Interface => "interface",
    Enum => "enum",
    Variable => "variable",
});

/// A declaration extracted from a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// One-line signature as written in the source
    pub signature: String,
    /// 1-indexed, inclusive
    pub start_line: usize,
    /// 1-indexed, inclusive
    pub end_line: usize,
    pub exported: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            signature: signature.into(),
            start_line: 1,
            end_line: 1,
            exported: false,
        }
    }

    pub fn at_lines(mut self, start_line: usize, end_line: usize) -> Self {
        self.start_line = start_line;
        self.end_line = end_line;
        self
    }

    pub fn exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        self
    }
}

/// An import statement: where from, and which names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Module specifier as written (`./a`, `../lib/util`, `react`, ...)
    pub source: String,
    /// Named symbols; empty for side-effect or whole-module imports
    #[serde(default)]
    pub names: Vec<String>,
}

impl Import {
    /// True when the specifier is path-relative rather than a package name
    pub fn is_relative(&self) -> bool {
        self.source.starts_with("./")
            || self.source.starts_with("../")
            || self.source == "."
            || self.source == ".."
    }
}

/// Parser output contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<Import>,
    pub token_estimate: usize,
}

/// Whether a file row holds source symbols or document chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileClass {
    Code,
    Doc,
}

string_enum!(FileClass, "file class", {
    Code => "code",
    Doc => "doc",
});

/// How a session consumes the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Agent answers through the index
    Indexed,
    /// Agent reads raw files; used as a comparison run
    Baseline,
}

string_enum!(SessionMode, "session mode", {
    Indexed => "indexed",
    Baseline => "baseline",
});

/// Session event log entry types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Accessed,
    SymbolAdded,
    SymbolRemoved,
    SigChanged,
    FailedSearch,
    ToolError,
    DeadEnd,
    ThrashDetected,
    RedundantAccess,
    IndexBlindSpot,
}

string_enum!(EventType, "event type", {
    Accessed => "accessed",
    SymbolAdded => "symbol_added",
    SymbolRemoved => "symbol_removed",
    SigChanged => "sig_changed",
    FailedSearch => "failed_search",
    ToolError => "tool_error",
    DeadEnd => "dead_end",
    ThrashDetected => "thrash_detected",
    RedundantAccess => "redundant_access",
    IndexBlindSpot => "index_blind_spot",
});

impl EventType {
    /// Events that count toward thrash detection on a file
    pub const ACTIVITY: &'static [EventType] = &[
        EventType::Accessed,
        EventType::SymbolAdded,
        EventType::SymbolRemoved,
        EventType::SigChanged,
    ];
}

/// Curated observation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    /// A symbol the agent looked at changed
    Change,
    /// A recurring unproductive pattern
    AntiPattern,
    /// Something about the environment, not the agent's approach
    Environment,
}

string_enum!(ObservationType, "observation type", {
    Change => "change",
    AntiPattern => "anti_pattern",
    Environment => "environment",
});

/// Classification of a symbol change between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    SigChanged,
}

impl ChangeKind {
    pub fn event_type(&self) -> EventType {
        match self {
            ChangeKind::Added => EventType::SymbolAdded,
            ChangeKind::Removed => EventType::SymbolRemoved,
            ChangeKind::SigChanged => EventType::SigChanged,
        }
    }

    /// Changes that invalidate what was previously observed about a symbol
    pub fn invalidates(&self) -> bool {
        matches!(self, ChangeKind::Removed | ChangeKind::SigChanged)
    }

    fn verb(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::SigChanged => "signature changed",
        }
    }
}

/// One classified change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolChange {
    pub kind: ChangeKind,
    pub symbol: String,
    pub symbol_kind: SymbolKind,
    pub old_signature: Option<String>,
    pub new_signature: Option<String>,
    pub description: String,
}

impl SymbolChange {
    pub fn new(
        kind: ChangeKind,
        symbol: &str,
        symbol_kind: SymbolKind,
        old_signature: Option<String>,
        new_signature: Option<String>,
    ) -> Self {
        Self {
            description: format!("{} `{}` {}", symbol_kind, symbol, kind.verb()),
            kind,
            symbol: symbol.to_string(),
            symbol_kind,
            old_signature,
            new_signature,
        }
    }
}

/// Result of diffing a file's symbols against its snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub file_path: String,
    /// True when no snapshot existed and this call only seeded the baseline
    pub first_observation: bool,
    pub changes: Vec<SymbolChange>,
}

impl FileDiff {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}
