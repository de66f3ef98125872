//! File discovery: walk the project root and classify files by glob

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::{debug, warn};
use vigil_core::{Config, FileClass};
use vigil_repo::detect_language;
use vigil_telemetry::Paths;
use walkdir::WalkDir;

/// A file selected for indexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    /// Project-relative, `/`-separated
    pub path: String,
    pub class: FileClass,
}

/// Compiled code, document and ignore glob sets
pub struct FileFilter {
    code: GlobSet,
    docs: GlobSet,
    ignore: GlobSet,
}

fn build_set<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("invalid glob pattern {}", pattern))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

impl FileFilter {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            code: build_set(config.all_code_globs())?,
            docs: build_set(config.doc_globs.iter().map(String::as_str))?,
            ignore: build_set(config.ignore_patterns.iter().map(String::as_str))?,
        })
    }

    pub fn is_ignored(&self, rel: &str) -> bool {
        self.ignore.is_match(rel)
    }

    /// Directory patterns end in `/**`, so probe with a child path
    fn is_ignored_dir(&self, rel_dir: &str) -> bool {
        self.ignore.is_match(format!("{}/_", rel_dir))
    }

    /// Code wins over documents when both match; ignored paths classify as nothing
    pub fn classify(&self, rel: &str) -> Option<FileClass> {
        if self.is_ignored(rel) {
            None
        } else if self.code.is_match(rel) {
            Some(FileClass::Code)
        } else if self.docs.is_match(rel) {
            Some(FileClass::Doc)
        } else {
            None
        }
    }
}

/// Class of an explicitly requested file, whether or not a glob selects it
pub fn explicit_class(filter: &FileFilter, rel: &str) -> FileClass {
    match filter.classify(rel) {
        Some(class) => class,
        None if detect_language(rel).is_source() => FileClass::Code,
        None => FileClass::Doc,
    }
}

/// Walk `dir` (inside `root`) and return every selected file, sorted by path.
///
/// Unreadable entries below the root are logged and skipped; only a root that
/// cannot be enumerated is an error.
pub fn discover(root: &Path, dir: &Path, filter: &FileFilter) -> Result<Vec<Discovered>> {
    if !dir.is_dir() {
        bail!("cannot enumerate {}: not a directory", dir.display());
    }
    let paths = Paths::new(root);
    let mut found = Vec::new();

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            // Never prune the starting directory itself
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            !filter.is_ignored_dir(&paths.relative(entry.path()))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| format!("cannot enumerate {}", dir.display()));
            }
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = paths.relative(entry.path());
        match filter.classify(&rel) {
            Some(class) => found.push(Discovered { path: rel, class }),
            None => debug!("not selected: {}", rel),
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_classifies_and_ignores() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path();
        write(root, "src/a.ts", "export const a = 1;");
        write(root, "src/b.py", "x = 1");
        write(root, "README.md", "# Readme");
        write(root, "node_modules/pkg/index.js", "module.exports = 1;");
        write(root, ".git/config", "[core]");
        write(root, "dist/bundle.js", "");
        write(root, "Makefile", "all:");

        let filter = FileFilter::from_config(&Config::new()).unwrap();
        let found = discover(root, root, &filter).unwrap();
        let got: Vec<_> = found.iter().map(|d| (d.path.as_str(), d.class)).collect();
        assert_eq!(
            got,
            vec![
                ("README.md", FileClass::Doc),
                ("src/a.ts", FileClass::Code),
                ("src/b.py", FileClass::Code),
            ]
        );
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let filter = FileFilter::from_config(&Config::new()).unwrap();
        assert!(discover(temp.path(), &missing, &filter).is_err());
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let mut config = Config::new();
        config.ignore_patterns.push("a[".to_string());
        assert!(FileFilter::from_config(&config).is_err());
    }

    #[test]
    fn test_explicit_class_falls_back_to_language() {
        let filter = FileFilter::from_config(&Config::new()).unwrap();
        assert_eq!(explicit_class(&filter, "scripts/tool.go"), FileClass::Code);
        assert_eq!(explicit_class(&filter, "NOTES"), FileClass::Doc);
    }
}
