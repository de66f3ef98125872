use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let engine = super::open_engine(root)?;
    let report = engine.resolve_dependencies()?;
    super::print_json(&serde_json::to_value(&report)?)
}
