//! In-memory counters for one session

use std::collections::{HashMap, HashSet};

/// Everything the observer remembers between calls. One per session; nothing is global.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    access_counts: HashMap<String, u32>,
    accessed_files: HashSet<String>,
    accessed_symbols: HashSet<(String, String)>,
    failed_searches: HashMap<String, u32>,
    tool_errors: HashMap<(String, String), u32>,
}

/// Counter key: `file` or `file::symbol`
pub fn access_key(file: &str, symbol: Option<&str>) -> String {
    match symbol {
        Some(symbol) => format!("{}::{}", file, symbol),
        None => file.to_string(),
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a successful access and return the post-increment count
    pub fn record_access(&mut self, file: &str, symbol: Option<&str>) -> u32 {
        match symbol {
            Some(symbol) => {
                self.accessed_symbols.insert((file.to_string(), symbol.to_string()));
            }
            None => {
                self.accessed_files.insert(file.to_string());
            }
        }
        let count = self.access_counts.entry(access_key(file, symbol)).or_insert(0);
        *count += 1;
        *count
    }

    /// True when the whole file, or this symbol within it, was looked at this session.
    /// A symbol lookup does not cover the file's other symbols.
    pub fn was_accessed(&self, file: &str, symbol: Option<&str>) -> bool {
        if self.accessed_files.contains(file) {
            return true;
        }
        match symbol {
            Some(symbol) => self
                .accessed_symbols
                .contains(&(file.to_string(), symbol.to_string())),
            None => false,
        }
    }

    pub fn access_count(&self, file: &str, symbol: Option<&str>) -> u32 {
        self.access_counts
            .get(&access_key(file, symbol))
            .copied()
            .unwrap_or(0)
    }

    pub fn record_failed_search(&mut self, query: &str) -> u32 {
        let count = self.failed_searches.entry(query.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn record_tool_error(&mut self, tool: &str, file: &str) -> u32 {
        let count = self
            .tool_errors
            .entry((tool.to_string(), file.to_string()))
            .or_insert(0);
        *count += 1;
        *count
    }

    /// Distinct files touched by any access
    pub fn accessed_file_count(&self) -> usize {
        let mut files: HashSet<&str> = self.accessed_files.iter().map(String::as_str).collect();
        files.extend(self.accessed_symbols.iter().map(|(file, _)| file.as_str()));
        files.len()
    }
}
