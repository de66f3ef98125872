use chrono::{TimeDelta, Utc};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use vigil_core::{ChangeKind, Config, EventType, FileDiff, ObservationType, SymbolChange, SymbolKind};
use vigil_index::{IndexOptions, IndexStatus, Observation};
use vigil_memory::{Engine, ToolCall, WatchEvent};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn engine(root: &Path) -> Engine {
    Engine::open_in_memory(root, Config::new()).unwrap()
}

fn session_id(engine: &Engine) -> String {
    engine.session().unwrap().expect("session started").id
}

fn events_of(engine: &Engine, event_type: EventType) -> usize {
    let session = session_id(engine);
    engine
        .with_store(|store| store.events_for_session(&session))
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == event_type)
        .count()
}

fn observations(engine: &Engine) -> Vec<Observation> {
    engine.observations(None, true, 100).unwrap()
}

fn get_symbol(file: &str, symbol: &str) -> ToolCall {
    ToolCall::new(
        "get_symbol",
        json!({ "file": file, "symbol": symbol }),
        json!({ "name": symbol, "kind": "function" }),
    )
}

fn empty_search(query: &str) -> ToolCall {
    ToolCall::new("search_symbols", json!({ "query": query }), json!({ "results": [] }))
}

#[test]
fn test_redundant_access_fires_exactly_at_fifth_access() {
    let temp = tempfile::TempDir::new().unwrap();
    let engine = engine(temp.path());

    for _ in 0..4 {
        engine.on_tool_call(&get_symbol("a.ts", "foo"));
    }
    assert_eq!(events_of(&engine, EventType::RedundantAccess), 0);

    engine.on_tool_call(&get_symbol("a.ts", "foo"));
    assert_eq!(events_of(&engine, EventType::RedundantAccess), 1);

    for _ in 0..3 {
        engine.on_tool_call(&get_symbol("a.ts", "foo"));
    }
    assert_eq!(events_of(&engine, EventType::RedundantAccess), 1);

    let anti: Vec<_> = observations(&engine)
        .into_iter()
        .filter(|o| o.obs_type == ObservationType::AntiPattern)
        .collect();
    assert_eq!(anti.len(), 1);
    assert!(anti[0].text.contains("a.ts::foo"));
}

#[test]
fn test_repeated_failed_search_observed_once() {
    let temp = tempfile::TempDir::new().unwrap();
    let engine = engine(temp.path());

    for _ in 0..3 {
        engine.on_tool_call(&empty_search("parseToken"));
    }
    let matching = |engine: &Engine| {
        observations(engine)
            .into_iter()
            .filter(|o| o.text.contains("parseToken"))
            .count()
    };
    assert_eq!(matching(&engine), 1);

    engine.on_tool_call(&empty_search("parseToken"));
    assert_eq!(matching(&engine), 1);
    assert_eq!(events_of(&engine, EventType::FailedSearch), 1);
}

#[test]
fn test_successful_search_does_not_count_as_failure() {
    let temp = tempfile::TempDir::new().unwrap();
    let engine = engine(temp.path());
    let hit = ToolCall::new(
        "search_symbols",
        json!({ "query": "parseToken" }),
        json!({ "results": [{ "name": "parseToken" }] }),
    );
    for _ in 0..2 {
        engine.on_tool_call(&empty_search("parseToken"));
    }
    engine.on_tool_call(&hit);
    assert!(observations(&engine).is_empty());
}

#[test]
fn test_rename_marks_observations_stale() {
    let temp = tempfile::TempDir::new().unwrap();
    write(temp.path(), "a.ts", "export function foo() {\n  return 1;\n}\n");
    let engine = engine(temp.path());
    engine.index_all(&IndexOptions::default()).unwrap();

    engine.on_tool_call(&get_symbol("a.ts", "foo"));
    write(temp.path(), "a.ts", "export function foo(x: number) {\n  return x;\n}\n");
    assert_eq!(engine.index_file("a.ts", false).unwrap().status, IndexStatus::Updated);

    write(temp.path(), "a.ts", "export function bar(x: number) {\n  return x;\n}\n");
    let outcome = engine.index_file("a.ts", false).unwrap();
    let kinds: Vec<_> = outcome
        .diff
        .unwrap()
        .changes
        .iter()
        .map(|c| (c.kind, c.symbol.clone()))
        .collect();
    assert_eq!(
        kinds,
        vec![(ChangeKind::Removed, "foo".to_string()), (ChangeKind::Added, "bar".to_string())]
    );

    let about_foo: Vec<_> = observations(&engine)
        .into_iter()
        .filter(|o| o.symbol_name.as_deref() == Some("foo"))
        .collect();
    assert_eq!(about_foo.len(), 2);
    let stale: Vec<_> = about_foo.iter().filter(|o| o.stale).collect();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].text, "function `foo` signature changed");
    assert_eq!(stale[0].stale_reason.as_deref(), Some("function `foo` removed"));

    // bar was never looked at, so its addition is only an event
    assert!(observations(&engine).iter().all(|o| o.symbol_name.as_deref() != Some("bar")));
    assert_eq!(events_of(&engine, EventType::SymbolAdded), 1);
}

#[test]
fn test_full_pass_after_deletion_marks_observations_stale() {
    let temp = tempfile::TempDir::new().unwrap();
    write(temp.path(), "a.ts", "export function foo() {\n  return 1;\n}\n");
    let engine = engine(temp.path());
    engine.index_all(&IndexOptions::default()).unwrap();

    engine.on_tool_call(&get_symbol("a.ts", "foo"));
    write(temp.path(), "a.ts", "export function foo(x: number) {\n  return x;\n}\n");
    engine.index_file("a.ts", false).unwrap();

    // Deleted while nothing was watching; only the next full pass notices
    fs::remove_file(temp.path().join("a.ts")).unwrap();
    let report = engine.index_all(&IndexOptions::default()).unwrap();
    assert_eq!(report.removed, 1);
    assert!(engine.symbols_in("a.ts").unwrap().is_empty());

    let about_foo = observations(&engine);
    let stale: Vec<_> = about_foo.iter().filter(|o| o.stale).collect();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].text, "function `foo` signature changed");
    assert_eq!(stale[0].stale_reason.as_deref(), Some("function `foo` removed"));
    assert!(about_foo.iter().any(|o| !o.stale && o.text == "function `foo` removed"));
    assert_eq!(events_of(&engine, EventType::SymbolRemoved), 1);
}

#[test]
fn test_dead_end_detected_once() {
    let temp = tempfile::TempDir::new().unwrap();
    write(temp.path(), "a.ts", "export function keep() {}\n");
    let engine = engine(temp.path());
    engine.index_all(&IndexOptions::default()).unwrap();

    write(temp.path(), "a.ts", "export function keep() {}\nfunction attempt() {}\n");
    engine.index_file("a.ts", false).unwrap();
    write(temp.path(), "a.ts", "export function keep() {}\n");
    engine.index_file("a.ts", false).unwrap();
    assert_eq!(events_of(&engine, EventType::DeadEnd), 1);

    // Re-adding and removing again does not re-fire for the same symbol
    write(temp.path(), "a.ts", "export function keep() {}\nfunction attempt() {}\n");
    engine.index_file("a.ts", false).unwrap();
    write(temp.path(), "a.ts", "export function keep() {}\n");
    engine.index_file("a.ts", false).unwrap();
    assert_eq!(events_of(&engine, EventType::DeadEnd), 1);
}

#[test]
fn test_thrash_on_rapid_changes() {
    let temp = tempfile::TempDir::new().unwrap();
    let engine = engine(temp.path());
    let start = Utc::now();
    let diff = |symbol: &str| FileDiff {
        file_path: "a.ts".to_string(),
        first_observation: false,
        changes: vec![SymbolChange::new(
            ChangeKind::SigChanged,
            symbol,
            SymbolKind::Function,
            Some("function f()".to_string()),
            Some("function f(x)".to_string()),
        )],
    };

    for i in 0..3 {
        engine.on_file_diff_at(&diff("f"), start + TimeDelta::seconds(i * 10));
    }
    assert_eq!(events_of(&engine, EventType::ThrashDetected), 0);

    engine.on_file_diff_at(&diff("f"), start + TimeDelta::seconds(30));
    assert_eq!(events_of(&engine, EventType::ThrashDetected), 1);

    engine.on_file_diff_at(&diff("f"), start + TimeDelta::seconds(40));
    assert_eq!(events_of(&engine, EventType::ThrashDetected), 1);

    // Re-armed a full window after the first emission
    let later = start + TimeDelta::seconds(330);
    for i in 0..4 {
        engine.on_file_diff_at(&diff("f"), later + TimeDelta::seconds(i));
    }
    assert_eq!(events_of(&engine, EventType::ThrashDetected), 2);
}

#[test]
fn test_blind_spot_when_index_is_behind() {
    let temp = tempfile::TempDir::new().unwrap();
    write(temp.path(), "src/new.ts", "export function fresh() {}\n");
    let engine = engine(temp.path());

    let outline = engine.symbols_in("src/new.ts").unwrap();
    assert!(outline.is_empty());
    engine.on_tool_call(&ToolCall::new(
        "get_file_outline",
        json!({ "path": "src/new.ts" }),
        json!({ "symbols": outline }),
    ));
    assert_eq!(events_of(&engine, EventType::IndexBlindSpot), 1);
    assert_eq!(events_of(&engine, EventType::Accessed), 0);
}

#[test]
fn test_tool_error_loop_is_environment_observation() {
    let temp = tempfile::TempDir::new().unwrap();
    let engine = engine(temp.path());
    let failing = ToolCall::failed("read_file", json!({ "path": "locked.ts" }), "EACCES");
    for _ in 0..3 {
        engine.on_tool_call(&failing);
    }
    let env: Vec<_> = observations(&engine)
        .into_iter()
        .filter(|o| o.obs_type == ObservationType::Environment)
        .collect();
    assert_eq!(env.len(), 1);
    assert_eq!(env[0].file_path.as_deref(), Some("locked.ts"));
    assert_eq!(events_of(&engine, EventType::ToolError), 3);
}

#[test]
fn test_dependencies_through_engine() {
    let temp = tempfile::TempDir::new().unwrap();
    write(temp.path(), "a.ts", "export const X = 1;\n");
    write(temp.path(), "b.ts", "import { X } from './a';\n");
    let engine = engine(temp.path());
    engine.index_all(&IndexOptions::default()).unwrap();
    engine.resolve_dependencies().unwrap();

    let deps: Vec<_> = engine.dependencies_of("b.ts").unwrap().into_iter().map(|d| d.to_path).collect();
    assert!(deps.contains(&"a.ts".to_string()));
    let importers: Vec<_> = engine.imported_by("a.ts").unwrap().into_iter().map(|d| d.from_path).collect();
    assert!(importers.contains(&"b.ts".to_string()));
    assert_eq!(engine.central_files(1).unwrap()[0].0, "a.ts");
}

#[test]
fn test_watch_events_keep_index_current() {
    let temp = tempfile::TempDir::new().unwrap();
    write(temp.path(), "a.ts", "export const X = 1;\n");
    let engine = engine(temp.path());
    engine.index_all(&IndexOptions::default()).unwrap();

    write(temp.path(), "b.ts", "import { X } from './a';\nexport function useX() {}\n");
    engine
        .on_watch_event(&WatchEvent::Added(temp.path().join("b.ts")))
        .unwrap();
    assert_eq!(engine.symbols_in("b.ts").unwrap().len(), 1);
    assert_eq!(engine.dependencies_of("b.ts").unwrap().len(), 1);

    engine.on_tool_call(&get_symbol("b.ts", "useX"));
    fs::remove_file(temp.path().join("b.ts")).unwrap();
    engine
        .on_watch_event(&WatchEvent::Removed(temp.path().join("b.ts")))
        .unwrap();
    assert!(engine.symbols_in("b.ts").unwrap().is_empty());
    assert!(engine.imported_by("a.ts").unwrap().is_empty());

    let removed: Vec<_> = observations(&engine)
        .into_iter()
        .filter(|o| o.symbol_name.as_deref() == Some("useX"))
        .collect();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].text, "function `useX` removed");
}

#[test]
fn test_resolve_converges_under_concurrent_indexing() {
    let temp = tempfile::TempDir::new().unwrap();
    for i in 0..20 {
        write(temp.path(), &format!("m{}.ts", i), &format!("export const V{} = {};\n", i, i));
    }
    write(temp.path(), "main.ts", "import { V0 } from './m0';\nimport { V1 } from './m1';\n");
    let engine = Arc::new(engine(temp.path()));
    engine.index_all(&IndexOptions::default()).unwrap();

    let writer = {
        let engine = Arc::clone(&engine);
        let root = temp.path().to_path_buf();
        std::thread::spawn(move || {
            for round in 0..10 {
                write(&root, "m5.ts", &format!("export const V5 = {};\n", round + 100));
                engine.index_file("m5.ts", false).unwrap();
            }
        })
    };
    for _ in 0..3 {
        engine.resolve_dependencies().unwrap();
    }
    writer.join().unwrap();
    engine.resolve_dependencies().unwrap();

    let mut deps: Vec<_> = engine.dependencies_of("main.ts").unwrap().into_iter().map(|d| d.to_path).collect();
    deps.sort();
    assert_eq!(deps, vec!["m0.ts", "m1.ts"]);
}

#[test]
fn test_export_events_writes_jsonl() {
    let temp = tempfile::TempDir::new().unwrap();
    let engine = engine(temp.path());
    engine.on_tool_call(&get_symbol("a.ts", "foo"));
    engine.on_tool_call(&empty_search("nothing"));

    let session = session_id(&engine);
    let (path, written) = engine.export_events(&session).unwrap();
    assert_eq!(written, 1);
    let content = fs::read_to_string(path).unwrap();
    let first: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(first["event_type"], "accessed");
    assert_eq!(first["file_path"], "a.ts");
}
