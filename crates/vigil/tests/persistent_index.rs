mod common;

use common::{sample_project, sensitive_config, write};
use serde_json::json;
use vigil_core::{Config, ObservationType};
use vigil_index::IndexOptions;
use vigil_memory::{Engine, ToolCall};

fn open(root: &std::path::Path, config: Config) -> Engine {
    Engine::open(root, config).unwrap()
}

#[test]
fn test_index_survives_reopen() {
    let project = sample_project();
    {
        let engine = open(project.path(), Config::new());
        let report = engine.index_all(&IndexOptions::default()).unwrap();
        assert_eq!(report.indexed, 4);
        let resolved = engine.resolve_dependencies().unwrap();
        assert_eq!(resolved.edges, 3);
    }

    let engine = open(project.path(), Config::new());
    let report = engine.index_all(&IndexOptions::default()).unwrap();
    assert_eq!(report.skipped, 4);
    assert_eq!(report.indexed + report.updated, 0);

    let importers: Vec<String> = engine
        .imported_by("src/auth.ts")
        .unwrap()
        .into_iter()
        .map(|d| d.from_path)
        .collect();
    assert_eq!(importers, vec!["src/api.ts", "src/api.ts", "src/cli.ts"]);
    assert_eq!(engine.search_docs("trimmed", 5).unwrap().len(), 1);
    assert_eq!(engine.central_files(1).unwrap()[0].0, "src/auth.ts");
}

#[test]
fn test_observation_goes_stale_in_a_later_session() {
    let project = sample_project();
    {
        let engine = open(project.path(), Config::new());
        engine.index_all(&IndexOptions::default()).unwrap();
        engine.on_tool_call(&ToolCall::new(
            "get_symbol",
            json!({ "file": "src/auth.ts", "symbol": "parseToken" }),
            json!({ "name": "parseToken" }),
        ));
        write(
            project.path(),
            "src/auth.ts",
            "export function parseToken(raw: string, strict: boolean): string {\n  return raw.trim();\n}\n\nexport function verify(token: string): boolean {\n  return token.length > 0;\n}\n",
        );
        engine.index_file("src/auth.ts", false).unwrap();

        let fresh = engine.observations(None, false, 10).unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].obs_type, ObservationType::Change);
        assert_eq!(fresh[0].symbol_name.as_deref(), Some("parseToken"));
    }

    write(
        project.path(),
        "src/auth.ts",
        "export function verify(token: string): boolean {\n  return token.length > 0;\n}\n",
    );
    let engine = open(project.path(), Config::new());
    let report = engine.index_all(&IndexOptions::default()).unwrap();
    assert_eq!(report.updated, 1);

    assert!(engine.observations(None, false, 10).unwrap().is_empty());
    let all = engine.observations(None, true, 10).unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].stale);
    assert_eq!(all[0].stale_reason.as_deref(), Some("function `parseToken` removed"));

    let sessions = engine.with_store(|store| store.list_sessions(10)).unwrap();
    assert_eq!(sessions.len(), 2);
}

#[test]
fn test_configured_thresholds_apply() {
    let project = sample_project();
    let engine = open(project.path(), sensitive_config());
    engine.index_all(&IndexOptions::default()).unwrap();

    let lookup = ToolCall::new(
        "get_file_outline",
        json!({ "path": project.path().join("src/api.ts").to_string_lossy() }),
        json!({ "symbols": [{ "name": "handle" }] }),
    );
    engine.on_tool_call(&lookup);
    engine.on_tool_call(&lookup);

    let miss = ToolCall::new("search", json!({ "q": "oauth" }), json!({ "results": [] }));
    engine.on_tool_call(&miss);
    engine.on_tool_call(&miss);

    let anti: Vec<String> = engine
        .observations(None, false, 10)
        .unwrap()
        .into_iter()
        .filter(|o| o.obs_type == ObservationType::AntiPattern)
        .map(|o| o.text)
        .collect();
    assert_eq!(anti.len(), 2);
    assert!(anti.iter().any(|t| t.contains("src/api.ts was accessed 2 times")));
    assert!(anti.iter().any(|t| t.contains("\"oauth\"")));
}

#[test]
fn test_deleted_file_is_pruned_on_next_pass() {
    let project = sample_project();
    let engine = open(project.path(), Config::new());
    engine.index_all(&IndexOptions::default()).unwrap();
    engine.resolve_dependencies().unwrap();

    std::fs::remove_file(project.path().join("src/cli.ts")).unwrap();
    let report = engine.index_all(&IndexOptions::default()).unwrap();
    assert_eq!(report.removed, 1);

    let importers = engine.imported_by("src/auth.ts").unwrap();
    assert!(importers.iter().all(|d| d.from_path != "src/cli.ts"));
    assert!(engine.symbols_in("src/cli.ts").unwrap().is_empty());
}
