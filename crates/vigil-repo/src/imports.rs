//! Import extraction, per language

use crate::language::Language;
use regex::Regex;
use std::sync::OnceLock;
use vigil_core::Import;

static JS_IMPORT_FROM_RE: OnceLock<Regex> = OnceLock::new();
static JS_SIDE_EFFECT_RE: OnceLock<Regex> = OnceLock::new();
static JS_EXPORT_FROM_RE: OnceLock<Regex> = OnceLock::new();
static JS_REQUIRE_RE: OnceLock<Regex> = OnceLock::new();

static PY_FROM_RE: OnceLock<Regex> = OnceLock::new();
static PY_IMPORT_RE: OnceLock<Regex> = OnceLock::new();

static RUST_MOD_RE: OnceLock<Regex> = OnceLock::new();
static RUST_USE_RE: OnceLock<Regex> = OnceLock::new();

static GO_SINGLE_RE: OnceLock<Regex> = OnceLock::new();
static GO_BLOCK_RE: OnceLock<Regex> = OnceLock::new();
static GO_SPEC_RE: OnceLock<Regex> = OnceLock::new();

static JAVA_IMPORT_RE: OnceLock<Regex> = OnceLock::new();
static C_INCLUDE_RE: OnceLock<Regex> = OnceLock::new();

/// Extract imports in source order
pub fn extract_imports(language: Language, content: &str) -> Vec<Import> {
    match language {
        Language::TypeScript | Language::JavaScript => js_imports(content),
        Language::Python => python_imports(content),
        Language::Rust => rust_imports(content),
        Language::Go => go_imports(content),
        Language::Java => java_imports(content),
        Language::C | Language::Cpp => c_imports(content),
        Language::Markdown | Language::Text | Language::Unknown => Vec::new(),
    }
}

fn js_imports(content: &str) -> Vec<Import> {
    let import_from = JS_IMPORT_FROM_RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*import\s+(?:type\s+)?(?P<clause>[^;'"]*?)\s*from\s*['"](?P<src>[^'"]+)['"]"#)
            .unwrap()
    });
    let side_effect = JS_SIDE_EFFECT_RE
        .get_or_init(|| Regex::new(r#"(?m)^\s*import\s*['"](?P<src>[^'"]+)['"]"#).unwrap());
    let export_from = JS_EXPORT_FROM_RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*export\s+(?:type\s+)?(?P<clause>\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s*['"](?P<src>[^'"]+)['"]"#)
            .unwrap()
    });
    let require = JS_REQUIRE_RE.get_or_init(|| {
        Regex::new(r#"(?:const|let|var)\s+(?P<clause>\{[^}]*\}|[\w$]+)\s*=\s*require\(\s*['"](?P<src>[^'"]+)['"]\s*\)"#)
            .unwrap()
    });

    let mut found: Vec<(usize, Import)> = Vec::new();
    for re in [import_from, export_from, require] {
        for caps in re.captures_iter(content) {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            found.push((
                start,
                Import {
                    source: caps["src"].to_string(),
                    names: js_clause_names(&caps["clause"]),
                },
            ));
        }
    }
    for caps in side_effect.captures_iter(content) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        found.push((
            start,
            Import {
                source: caps["src"].to_string(),
                names: Vec::new(),
            },
        ));
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, import)| import).collect()
}

/// Names bound by an import clause: `{ a, b as c }` yields `a, b`; a default binding yields `default`
fn js_clause_names(clause: &str) -> Vec<String> {
    let clause = clause.trim();
    let (head, braced) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => (&clause[..open], Some(&clause[open + 1..close])),
        _ => (clause, None),
    };

    let mut names = Vec::new();
    for part in head.split(',').map(str::trim) {
        // `* as ns` binds the module, not a symbol
        if part.is_empty() || part.starts_with('*') {
            continue;
        }
        names.push("default".to_string());
    }
    if let Some(braced) = braced {
        for part in braced.split(',') {
            let part = part.trim();
            let part = part.strip_prefix("type ").unwrap_or(part).trim();
            let original = part.split_whitespace().next().unwrap_or("");
            if !original.is_empty() {
                names.push(original.to_string());
            }
        }
    }
    names
}

fn python_imports(content: &str) -> Vec<Import> {
    let from_re = PY_FROM_RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*from\s+(?P<src>[\w.]+)\s+import\s+(?P<names>\([^)]*\)|[^\n#]+)").unwrap()
    });
    let import_re =
        PY_IMPORT_RE.get_or_init(|| Regex::new(r"(?m)^\s*import\s+(?P<mods>[\w., ]+)").unwrap());

    let mut found: Vec<(usize, Import)> = Vec::new();
    for caps in from_re.captures_iter(content) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let names = caps["names"]
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .filter_map(|part| part.split_whitespace().next())
            .filter(|name| *name != "*")
            .map(str::to_string)
            .collect();
        found.push((
            start,
            Import {
                source: python_module_path(&caps["src"]),
                names,
            },
        ));
    }
    for caps in import_re.captures_iter(content) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        for module in caps["mods"].split(',') {
            if let Some(module) = module.split_whitespace().next() {
                found.push((
                    start,
                    Import {
                        source: module.to_string(),
                        names: Vec::new(),
                    },
                ));
            }
        }
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, import)| import).collect()
}

/// `.utils` becomes `./utils`, `..pkg.mod` becomes `../pkg/mod`; absolute modules pass through
fn python_module_path(module: &str) -> String {
    let dots = module.chars().take_while(|c| *c == '.').count();
    if dots == 0 {
        return module.to_string();
    }
    let rest = module[dots..].replace('.', "/");
    let prefix = if dots == 1 {
        ".".to_string()
    } else {
        vec![".."; dots - 1].join("/")
    };
    if rest.is_empty() {
        prefix
    } else {
        format!("{}/{}", prefix, rest)
    }
}

fn rust_imports(content: &str) -> Vec<Import> {
    let mod_re = RUST_MOD_RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(?P<name>\w+)\s*;").unwrap()
    });
    let use_re = RUST_USE_RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(?P<path>[^;]+);").unwrap()
    });

    let mut found: Vec<(usize, Import)> = Vec::new();
    for caps in mod_re.captures_iter(content) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        found.push((
            start,
            Import {
                source: format!("./{}", &caps["name"]),
                names: Vec::new(),
            },
        ));
    }
    for caps in use_re.captures_iter(content) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let path = caps["path"].split_whitespace().collect::<Vec<_>>().join(" ");
        let (source, names) = match path.find("::{") {
            Some(idx) => {
                let names = path[idx + 3..]
                    .trim_end_matches('}')
                    .split(',')
                    .filter_map(|item| item.split_whitespace().next())
                    .filter_map(|item| item.rsplit("::").next())
                    .map(|item| item.trim_matches(|c| c == '{' || c == '}'))
                    .filter(|item| !item.is_empty() && *item != "self" && *item != "*")
                    .map(str::to_string)
                    .collect();
                (path[..idx].to_string(), names)
            }
            None => match path.rsplit_once("::") {
                Some((source, last)) => {
                    let name = last.split_whitespace().next().unwrap_or(last);
                    let names = if name == "*" { Vec::new() } else { vec![name.to_string()] };
                    (source.to_string(), names)
                }
                None => (path.clone(), Vec::new()),
            },
        };
        found.push((start, Import { source, names }));
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, import)| import).collect()
}

fn go_imports(content: &str) -> Vec<Import> {
    let single = GO_SINGLE_RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*import\s+(?:[\w.]+\s+)?"(?P<src>[^"]+)""#).unwrap()
    });
    let block = GO_BLOCK_RE.get_or_init(|| Regex::new(r"(?s)\bimport\s*\((?P<body>.*?)\)").unwrap());
    let spec = GO_SPEC_RE.get_or_init(|| Regex::new(r#""(?P<src>[^"]+)""#).unwrap());

    let mut found: Vec<(usize, Import)> = Vec::new();
    for caps in single.captures_iter(content) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        found.push((start, package_import(&caps["src"])));
    }
    for caps in block.captures_iter(content) {
        let Some(body) = caps.name("body") else {
            continue;
        };
        for spec_caps in spec.captures_iter(body.as_str()) {
            let start = body.start() + spec_caps.get(0).map(|m| m.start()).unwrap_or(0);
            found.push((start, package_import(&spec_caps["src"])));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, import)| import).collect()
}

fn java_imports(content: &str) -> Vec<Import> {
    let re = JAVA_IMPORT_RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*import\s+(?:static\s+)?(?P<path>[\w.]+(?:\.\*)?)\s*;").unwrap()
    });
    re.captures_iter(content)
        .map(|caps| match caps["path"].rsplit_once('.') {
            Some((package, "*")) => package_import(package),
            Some((package, class)) => Import {
                source: package.to_string(),
                names: vec![class.to_string()],
            },
            None => package_import(&caps["path"]),
        })
        .collect()
}

fn c_imports(content: &str) -> Vec<Import> {
    let re = C_INCLUDE_RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*#\s*include\s*(?:"(?P<local>[^"]+)"|<(?P<system>[^>]+)>)"#).unwrap()
    });
    re.captures_iter(content)
        .filter_map(|caps| {
            if let Some(local) = caps.name("local") {
                let local = local.as_str();
                let source = if local.starts_with("./") || local.starts_with("../") {
                    local.to_string()
                } else {
                    format!("./{}", local)
                };
                Some(package_import(&source))
            } else {
                caps.name("system").map(|system| package_import(system.as_str()))
            }
        })
        .collect()
}

fn package_import(source: &str) -> Import {
    Import {
        source: source.to_string(),
        names: Vec::new(),
    }
}
