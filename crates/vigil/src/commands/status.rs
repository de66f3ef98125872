use std::path::Path;
use vigil_memory::Engine;

pub fn run(root: &Path, top: usize) -> anyhow::Result<()> {
    let engine = super::open_engine(root)?;
    super::print_json(&status(&engine, top)?)
}

pub fn status(engine: &Engine, top: usize) -> anyhow::Result<serde_json::Value> {
    let stats = engine.stats()?;
    let central: Vec<serde_json::Value> = engine
        .central_files(top)?
        .into_iter()
        .map(|(path, rank)| serde_json::json!({ "path": path, "rank": rank }))
        .collect();
    let sessions = engine.with_store(|store| store.list_sessions(5))?;

    Ok(serde_json::json!({
        "root": engine.root().display().to_string(),
        "stats": stats,
        "central_files": central,
        "recent_sessions": sessions,
    }))
}
