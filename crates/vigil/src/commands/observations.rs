use anyhow::Context;
use std::path::Path;
use vigil_index::Observation;
use vigil_memory::Engine;

#[derive(Debug, Clone, Copy)]
pub struct Filter<'a> {
    pub session: Option<&'a str>,
    pub include_stale: bool,
    pub query: Option<&'a str>,
    pub limit: usize,
}

pub fn run(root: &Path, filter: Filter<'_>, export: bool) -> anyhow::Result<()> {
    let engine = super::open_engine(root)?;
    if export {
        let (path, written) = export_session(&engine, filter.session)?;
        println!("✓ Exported {} events to {}", written, path.display());
        return Ok(());
    }
    let observations = list(&engine, filter)?;
    super::print_json(&serde_json::to_value(&observations)?)
}

/// Listing, or full-text search when a query is given. Search hits honour the
/// session and stale filters too.
pub fn list(engine: &Engine, filter: Filter<'_>) -> anyhow::Result<Vec<Observation>> {
    let Some(query) = filter.query else {
        return engine.observations(filter.session, filter.include_stale, filter.limit);
    };
    let hits = engine
        .search_observations(query, filter.limit)?
        .into_iter()
        .filter(|obs| filter.include_stale || !obs.stale)
        .filter(|obs| filter.session.map_or(true, |id| obs.session_id == id))
        .collect();
    Ok(hits)
}

/// Export `session`, or the most recent session when none is named
pub fn export_session(engine: &Engine, session: Option<&str>) -> anyhow::Result<(std::path::PathBuf, usize)> {
    let id = match session {
        Some(id) => id.to_string(),
        None => engine
            .with_store(|store| store.list_sessions(1))?
            .into_iter()
            .next()
            .map(|record| record.id)
            .context("no sessions recorded yet")?,
    };
    engine.export_events(&id)
}
