//! Tool call representation and classification

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One call an agent made through the index's tool surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Reads one file or symbol
    Lookup,
    /// Free-text query over the index
    Search,
    Other,
}

const LOOKUP_TOOLS: &[&str] = &[
    "get_symbol",
    "get_file_outline",
    "get_dependencies",
    "get_imported_by",
    "read_file",
];

const SEARCH_TOOLS: &[&str] = &["search", "search_symbols", "search_docs"];

const FILE_KEYS: &[&str] = &["file", "path", "file_path"];
const SYMBOL_KEYS: &[&str] = &["symbol", "symbol_name", "name"];
const QUERY_KEYS: &[&str] = &["query", "q"];

/// Result fields that carry the payload list of a lookup or search
const LIST_KEYS: &[&str] = &[
    "results",
    "matches",
    "symbols",
    "dependencies",
    "imported_by",
    "chunks",
    "items",
];

impl ToolKind {
    pub fn of(tool: &str) -> Self {
        if LOOKUP_TOOLS.contains(&tool) {
            ToolKind::Lookup
        } else if SEARCH_TOOLS.contains(&tool) {
            ToolKind::Search
        } else {
            ToolKind::Other
        }
    }
}

fn string_arg<'a>(args: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| args.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, args: Value, result: Value) -> Self {
        Self {
            tool: tool.into(),
            args,
            result,
            is_error: false,
        }
    }

    pub fn failed(tool: impl Into<String>, args: Value, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
            result: Value::String(error.into()),
            is_error: true,
        }
    }

    pub fn kind(&self) -> ToolKind {
        ToolKind::of(&self.tool)
    }

    pub fn file_arg(&self) -> Option<&str> {
        string_arg(&self.args, FILE_KEYS)
    }

    /// The file a lookup was about: the argument when given, else the file the
    /// result reports
    pub fn target_file(&self) -> Option<&str> {
        self.file_arg().or_else(|| {
            if self.is_error {
                None
            } else {
                string_arg(&self.result, FILE_KEYS)
            }
        })
    }

    pub fn symbol_arg(&self) -> Option<&str> {
        string_arg(&self.args, SYMBOL_KEYS)
    }

    pub fn query_arg(&self) -> Option<&str> {
        string_arg(&self.args, QUERY_KEYS)
    }

    /// Whether the call returned nothing useful: null, an empty string or list, an
    /// empty object, or an object whose list fields are all empty
    pub fn result_is_empty(&self) -> bool {
        is_empty_value(&self.result)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => {
            let lists: Vec<&Value> = LIST_KEYS.iter().filter_map(|key| map.get(*key)).collect();
            if lists.is_empty() {
                map.is_empty()
            } else {
                lists.into_iter().all(is_empty_value)
            }
        }
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_dispatch() {
        assert_eq!(ToolKind::of("get_symbol"), ToolKind::Lookup);
        assert_eq!(ToolKind::of("read_file"), ToolKind::Lookup);
        assert_eq!(ToolKind::of("search_docs"), ToolKind::Search);
        assert_eq!(ToolKind::of("run_tests"), ToolKind::Other);
    }

    #[test]
    fn test_args_extraction() {
        let call = ToolCall::new(
            "get_symbol",
            json!({"path": "src/a.ts", "name": "foo", "query": "  "}),
            json!({}),
        );
        assert_eq!(call.file_arg(), Some("src/a.ts"));
        assert_eq!(call.symbol_arg(), Some("foo"));
        assert_eq!(call.query_arg(), None);
    }

    #[test]
    fn test_target_file_falls_back_to_result() {
        let call = ToolCall::new("get_symbol", json!({"name": "foo"}), json!({"name": "foo", "file": "src/a.ts"}));
        assert_eq!(call.file_arg(), None);
        assert_eq!(call.target_file(), Some("src/a.ts"));

        let explicit = ToolCall::new("get_symbol", json!({"file": "src/b.ts"}), json!({"file": "src/a.ts"}));
        assert_eq!(explicit.target_file(), Some("src/b.ts"));

        let failed = ToolCall::failed("get_symbol", json!({"name": "foo"}), "not found");
        assert_eq!(failed.target_file(), None);
    }

    #[test]
    fn test_result_emptiness() {
        let empty = [json!(null), json!(""), json!([]), json!({}), json!({"results": [], "total": 0})];
        for value in empty {
            assert!(ToolCall::new("search", json!({}), value.clone()).result_is_empty(), "{}", value);
        }
        let full = [json!("text"), json!([1]), json!({"results": [{"name": "foo"}]}), json!({"name": "foo"})];
        for value in full {
            assert!(!ToolCall::new("search", json!({}), value.clone()).result_is_empty(), "{}", value);
        }
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let call: ToolCall = serde_json::from_str(r#"{"tool": "read_file"}"#).unwrap();
        assert_eq!(call.args, Value::Null);
        assert!(!call.is_error);
        assert!(call.result_is_empty());
    }
}
