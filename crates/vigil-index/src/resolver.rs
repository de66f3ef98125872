//! Second pass: turn relative imports into file-to-file dependency edges
//!
//! Resolution is split so parsing can run without the store lock: `plan` re-reads
//! and re-parses files against a snapshot of known paths, `apply` writes the edges.

use crate::store::Store;
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use vigil_core::Import;
use vigil_repo::SourceParser;

/// Extensions tried after the bare specifier, in order
const SOURCE_EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".py", ".rs", ".go", ".java", ".h", ".hpp", ".c",
    ".cc", ".cpp",
];

/// Directory entry points tried last
const INDEX_FILES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.js",
    "index.jsx",
    "__init__.py",
    "mod.rs",
];

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{path}: read failed: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: cannot decode as UTF-8 text")]
    Decode { path: String },

    #[error("{from}: no indexed file for import {specifier:?}")]
    Unresolved { from: String, specifier: String },
}

/// Edges planned for one importing file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePlan {
    pub path: String,
    /// `(target path, imported symbol)`; `None` for whole-module imports
    pub edges: Vec<(String, Option<String>)>,
}

#[derive(Debug, Default)]
pub struct ResolvePlan {
    pub files: Vec<FilePlan>,
    pub failures: Vec<ResolveError>,
}

#[derive(Debug, Default, Serialize)]
pub struct ResolveReport {
    /// Importing files whose edges were rewritten
    pub files: usize,
    /// Edges inserted
    pub edges: usize,
    #[serde(serialize_with = "failures_as_strings")]
    pub failures: Vec<ResolveError>,
}

fn failures_as_strings<S: serde::Serializer>(failures: &[ResolveError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(failures.iter().map(|f| f.to_string()))
}

/// Candidate project paths for a relative specifier imported from `importer`, in try order
pub fn candidates(importer: &str, specifier: &str) -> Vec<String> {
    let base_dir = match importer.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    let Some(joined) = join_normalized(base_dir, specifier) else {
        return Vec::new();
    };

    let mut out: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    };

    if !joined.is_empty() {
        push(joined.clone());
        for ext in SOURCE_EXTENSIONS {
            push(format!("{}{}", joined, ext));
        }
    }
    if let Some(stem) = joined.strip_suffix(".js") {
        push(format!("{}.ts", stem));
        push(format!("{}.tsx", stem));
    }
    if let Some(stem) = joined.strip_suffix(".jsx") {
        push(format!("{}.tsx", stem));
    }
    for index in INDEX_FILES {
        if joined.is_empty() {
            push(index.to_string());
        } else {
            push(format!("{}/{}", joined, index));
        }
    }
    out
}

/// Join and fold `.`/`..` segments; `None` when the path climbs above the root
fn join_normalized(base_dir: &str, specifier: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in base_dir.split('/').chain(specifier.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Parse each file in `paths` from disk and plan its edges against `known` file paths.
///
/// A candidate counts only if it is in `known` and exists on disk. Package imports
/// are skipped silently; relative imports with no match become `Unresolved`.
pub fn plan(root: &Path, parser: &dyn SourceParser, paths: &[String], known: &HashSet<String>) -> ResolvePlan {
    let mut plan = ResolvePlan::default();
    for path in paths {
        let bytes = match std::fs::read(root.join(path)) {
            Ok(bytes) => bytes,
            Err(source) => {
                plan.failures.push(ResolveError::Read {
                    path: path.clone(),
                    source,
                });
                continue;
            }
        };
        let Ok(content) = String::from_utf8(bytes) else {
            plan.failures.push(ResolveError::Decode { path: path.clone() });
            continue;
        };

        let parsed = parser.parse(path, &content);
        let mut edges = Vec::new();
        for import in parsed.imports.iter().filter(|i| i.is_relative()) {
            match resolve_import(root, path, import, known) {
                Some(target) => push_edges(&mut edges, target, import),
                None => plan.failures.push(ResolveError::Unresolved {
                    from: path.clone(),
                    specifier: import.source.clone(),
                }),
            }
        }
        plan.files.push(FilePlan {
            path: path.clone(),
            edges,
        });
    }
    plan
}

fn resolve_import(root: &Path, importer: &str, import: &Import, known: &HashSet<String>) -> Option<String> {
    candidates(importer, &import.source)
        .into_iter()
        .find(|candidate| candidate != importer && known.contains(candidate) && root.join(candidate).is_file())
}

/// One edge per imported name, or one unqualified edge for whole-module imports
fn push_edges(edges: &mut Vec<(String, Option<String>)>, target: String, import: &Import) {
    if import.names.is_empty() {
        edges.push((target, None));
    } else {
        for name in &import.names {
            edges.push((target.clone(), Some(name.clone())));
        }
    }
}

/// Replace the outgoing edges of every planned file. Run inside a transaction.
pub fn apply(store: &Store, plan: ResolvePlan) -> Result<ResolveReport> {
    let mut report = ResolveReport::default();
    for file in &plan.files {
        // Removed since planning
        let Some(from_id) = store.file_id(&file.path)? else {
            continue;
        };
        store.clear_dependencies(from_id)?;
        for (target, symbol) in &file.edges {
            let Some(to_id) = store.file_id(target)? else {
                continue;
            };
            if store.insert_dependency(from_id, to_id, symbol.as_deref())? {
                report.edges += 1;
            }
        }
        report.files += 1;
    }
    for failure in &plan.failures {
        debug!("unresolved: {}", failure);
    }
    report.failures = plan.failures;
    Ok(report)
}
