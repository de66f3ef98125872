use std::path::Path;
use vigil_memory::Engine;

pub fn run(root: &Path, path: &str) -> anyhow::Result<()> {
    let engine = super::open_engine(root)?;
    super::print_json(&deps(&engine, path)?)
}

pub fn deps(engine: &Engine, path: &str) -> anyhow::Result<serde_json::Value> {
    let imports = engine.dependencies_of(path)?;
    let imported_by = engine.imported_by(path)?;
    let symbols: Vec<String> = engine
        .symbols_in(path)?
        .into_iter()
        .map(|record| record.symbol.name)
        .collect();

    Ok(serde_json::json!({
        "path": path,
        "symbols": symbols,
        "imports": imports,
        "imported_by": imported_by,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use vigil_core::Config;
    use vigil_index::IndexOptions;

    #[test]
    fn test_deps_both_directions() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/lib")).unwrap();
        fs::write(temp.path().join("src/lib/math.ts"), "export function add() {}\nexport function sub() {}\n").unwrap();
        fs::write(
            temp.path().join("src/app.ts"),
            "import { add, sub } from './lib/math';\nexport function main() {}\n",
        )
        .unwrap();

        let engine = Engine::open_in_memory(temp.path(), Config::new()).unwrap();
        engine.index_all(&IndexOptions::default()).unwrap();
        engine.resolve_dependencies().unwrap();

        let app = deps(&engine, "src/app.ts").unwrap();
        assert_eq!(app["imports"].as_array().unwrap().len(), 2);
        assert_eq!(app["imports"][0]["to_path"], "src/lib/math.ts");
        assert!(app["imported_by"].as_array().unwrap().is_empty());

        let math = deps(&engine, "src/lib/math.ts").unwrap();
        assert_eq!(math["symbols"], serde_json::json!(["add", "sub"]));
        assert_eq!(math["imported_by"][0]["from_path"], "src/app.ts");
    }

    #[test]
    fn test_deps_absolute_path_is_made_relative() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("solo.ts"), "export function x() {}\n").unwrap();
        let engine = Engine::open_in_memory(temp.path(), Config::new()).unwrap();
        engine.index_all(&IndexOptions::default()).unwrap();

        let abs = temp.path().join("solo.ts");
        let value = deps(&engine, &abs.to_string_lossy()).unwrap();
        assert_eq!(value["symbols"], serde_json::json!(["x"]));
    }
}
