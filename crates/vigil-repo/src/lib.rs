//! Source analysis: language detection, hashing, symbol and import extraction, graph ranking

mod decl;
mod hash;
mod imports;
mod language;
mod mapper;
mod symbols;

pub use decl::DeclKind;
pub use hash::{hash_content, normalize_signature, signature_hash};
pub use imports::extract_imports;
pub use language::{detect_language, Language};
pub use mapper::DependencyGraph;
pub use symbols::{extract_symbols, RegexParser, SourceParser};
