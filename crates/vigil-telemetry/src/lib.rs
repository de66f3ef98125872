//! Paths, token estimation and file output shared across the workspace

mod io;
mod paths;
mod tokens;

pub use io::{append_jsonl, atomic_write};
pub use paths::Paths;
pub use tokens::estimate_tokens;
