use std::path::Path;
use vigil_memory::Engine;

pub fn run(root: &Path, query: &str, docs: bool, limit: usize) -> anyhow::Result<()> {
    let engine = super::open_engine(root)?;
    super::print_json(&search(&engine, query, docs, limit)?)
}

pub fn search(engine: &Engine, query: &str, docs: bool, limit: usize) -> anyhow::Result<serde_json::Value> {
    let results = if docs {
        serde_json::to_value(engine.search_docs(query, limit)?)?
    } else {
        serde_json::to_value(engine.search_symbols(query, limit)?)?
    };
    Ok(serde_json::json!({ "query": query, "results": results }))
}
