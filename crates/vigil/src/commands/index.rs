use std::path::{Path, PathBuf};
use vigil_index::IndexOptions;
use vigil_memory::Engine;

pub fn run(root: &Path, force: bool, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let engine = super::open_engine(root)?;
    let summary = index_and_resolve(&engine, force, paths)?;
    super::print_json(&summary)
}

pub fn index_and_resolve(engine: &Engine, force: bool, additional_paths: Vec<PathBuf>) -> anyhow::Result<serde_json::Value> {
    let options = IndexOptions {
        force,
        additional_paths,
    };
    let report = engine.index_all(&options)?;
    for error in &report.errors {
        tracing::warn!("{}", error);
    }
    let resolved = engine.resolve_dependencies()?;

    Ok(serde_json::json!({
        "index": report,
        "changed_files": report.diffs.len(),
        "resolve": resolved,
    }))
}
