//! Configuration for discovery, chunking and anti-pattern detection

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Anti-pattern thresholds. Count-based rules fire at exactly these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Access count on one file[::symbol] that flags a redundant re-read
    pub redundant_access_count: u32,
    /// Zero-result attempts of the same query that flag a failed search
    pub failed_search_attempts: u32,
    /// Failures of the same (tool, file) that flag a tool-error loop
    pub tool_error_count: u32,
    /// Change/access events on one file inside the window that flag thrashing
    pub thrash_event_count: u32,
    /// Trailing window for thrash detection, also the re-arm delay
    pub thrash_window_secs: i64,
}

impl PatternConfig {
    pub fn new() -> Self {
        Self {
            redundant_access_count: 5,
            failed_search_attempts: 3,
            tool_error_count: 3,
            thrash_event_count: 4,
            thrash_window_secs: 300,
        }
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source globs per language
    pub code_globs: BTreeMap<String, Vec<String>>,

    /// Documentation and config text globs
    pub doc_globs: Vec<String>,

    /// Paths never indexed (build output, dependencies, VCS metadata)
    pub ignore_patterns: Vec<String>,

    /// Line window for non-markdown document chunks
    pub doc_chunk_lines: usize,

    /// Files larger than this are reported as errors instead of parsed
    pub max_file_bytes: u64,

    /// Anti-pattern thresholds
    pub patterns: PatternConfig,
}

fn globs(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

impl Config {
    pub fn new() -> Self {
        let mut code_globs = BTreeMap::new();
        code_globs.insert(
            "typescript".to_string(),
            globs(&["**/*.ts", "**/*.tsx", "**/*.mts", "**/*.cts"]),
        );
        code_globs.insert(
            "javascript".to_string(),
            globs(&["**/*.js", "**/*.jsx", "**/*.mjs", "**/*.cjs"]),
        );
        code_globs.insert("python".to_string(), globs(&["**/*.py"]));
        code_globs.insert("rust".to_string(), globs(&["**/*.rs"]));
        code_globs.insert("go".to_string(), globs(&["**/*.go"]));
        code_globs.insert("java".to_string(), globs(&["**/*.java"]));
        code_globs.insert("c".to_string(), globs(&["**/*.c", "**/*.h"]));
        code_globs.insert(
            "cpp".to_string(),
            globs(&["**/*.cpp", "**/*.cc", "**/*.cxx", "**/*.hpp"]),
        );

        Self {
            code_globs,
            doc_globs: globs(&[
                "**/*.md",
                "**/*.mdx",
                "**/*.txt",
                "**/*.rst",
                "**/*.json",
                "**/*.yaml",
                "**/*.yml",
                "**/*.toml",
            ]),
            ignore_patterns: globs(&[
                "**/.git/**",
                "**/.hg/**",
                "**/.svn/**",
                "**/.vigil/**",
                "**/node_modules/**",
                "**/bower_components/**",
                "**/dist/**",
                "**/build/**",
                "**/out/**",
                "**/coverage/**",
                "**/.next/**",
                "**/target/**",
                "**/__pycache__/**",
                "**/.venv/**",
                "**/venv/**",
                "**/.tox/**",
                "**/vendor/**",
                "**/*.min.js",
                "**/*.map",
                "**/package-lock.json",
                "**/yarn.lock",
                "**/pnpm-lock.yaml",
                "**/Cargo.lock",
            ]),
            doc_chunk_lines: 40,
            max_file_bytes: 1024 * 1024,
            patterns: PatternConfig::new(),
        }
    }

    /// Load from the first readable candidate, falling back to defaults.
    ///
    /// A file that exists but does not parse is skipped with a warning.
    pub fn load(candidates: &[&Path]) -> Self {
        for path in candidates {
            if !path.exists() {
                continue;
            }
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    warn!("cannot read config {}: {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_str::<Config>(&content) {
                Ok(config) => return config,
                Err(e) => warn!("ignoring malformed config {}: {}", path.display(), e),
            }
        }
        Self::new()
    }

    /// All code globs, flattened
    pub fn all_code_globs(&self) -> impl Iterator<Item = &str> {
        self.code_globs.values().flatten().map(String::as_str)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert_eq!(config.patterns.redundant_access_count, 5);
        assert_eq!(config.patterns.failed_search_attempts, 3);
        assert_eq!(config.patterns.tool_error_count, 3);
        assert_eq!(config.patterns.thrash_event_count, 4);
        assert_eq!(config.patterns.thrash_window_secs, 300);
        assert!(config.code_globs.contains_key("typescript"));
        assert!(config.ignore_patterns.iter().any(|p| p.contains("node_modules")));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"doc_chunk_lines": 10}"#).unwrap();
        assert_eq!(config.doc_chunk_lines, 10);
        assert_eq!(config.patterns, PatternConfig::new());
        assert!(!config.doc_globs.is_empty());
    }

    #[test]
    fn test_load_falls_back_on_malformed() {
        let temp = tempfile::TempDir::new().unwrap();
        let bad = temp.path().join("bad.json");
        let good = temp.path().join("good.json");
        std::fs::write(&bad, "{ not json").unwrap();
        std::fs::write(&good, r#"{"patterns": {"redundant_access_count": 7}}"#).unwrap();

        let config = Config::load(&[bad.as_path(), good.as_path()]);
        assert_eq!(config.patterns.redundant_access_count, 7);
        assert_eq!(config.patterns.tool_error_count, 3);

        let config = Config::load(&[bad.as_path()]);
        assert_eq!(config, Config::new());
    }
}
