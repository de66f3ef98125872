//! Declaration rules: which source lines declare which kind of symbol
//!
//! Every language maps onto the same closed set of [`DeclKind`]s. Each rule pairs
//! a kind with a line pattern and the nesting level it applies at; the first
//! matching rule wins, so more specific patterns come first in each table.

use crate::language::Language;
use regex::Regex;
use std::sync::OnceLock;
use vigil_core::SymbolKind;

/// Closed set of declaration forms the extractor recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Function,
    Class,
    Method,
    Const,
    TypeAlias,
    Interface,
    Enum,
    Variable,
}

/// Words that open statements, never declarations
const CONTROL_WORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "catch", "try", "return", "throw",
    "new", "delete", "typeof", "await", "yield", "function", "super", "sizeof", "with",
    "elif", "except", "finally", "match", "loop", "defer", "go", "select",
];

impl DeclKind {
    pub fn symbol_kind(self) -> SymbolKind {
        match self {
            DeclKind::Function => SymbolKind::Function,
            DeclKind::Class => SymbolKind::Class,
            DeclKind::Method => SymbolKind::Method,
            DeclKind::Const => SymbolKind::Const,
            DeclKind::TypeAlias => SymbolKind::Type,
            DeclKind::Interface => SymbolKind::Interface,
            DeclKind::Enum => SymbolKind::Enum,
            DeclKind::Variable => SymbolKind::Variable,
        }
    }

    /// Per-kind validation of a pattern match
    fn accepts(self, name: &str, line: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let first_word = line
            .trim_start()
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .next()
            .unwrap_or("");
        match self {
            // Call-shaped patterns also catch control flow (`if (x) {`)
            // `function` leads a real declaration, so only the name is checked against it
            DeclKind::Function | DeclKind::Method => {
                !CONTROL_WORDS.contains(&name)
                    && (first_word == "function" || !CONTROL_WORDS.contains(&first_word))
            }
            DeclKind::Variable => !CONTROL_WORDS.contains(&name),
            DeclKind::Class
            | DeclKind::Const
            | DeclKind::TypeAlias
            | DeclKind::Interface
            | DeclKind::Enum => true,
        }
    }
}

/// Nesting level a rule applies at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// Column zero only
    TopLevel,
    /// Indented only
    Nested,
    Any,
}

pub(crate) struct DeclRule {
    kind: DeclKind,
    scope: Scope,
    regex: Regex,
}

impl DeclRule {
    fn new(kind: DeclKind, scope: Scope, pattern: &str) -> Self {
        Self {
            kind,
            scope,
            regex: Regex::new(pattern).unwrap(),
        }
    }
}

/// A declaration found on one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    /// The line carried the language's explicit export keyword (`export`, `pub`, `public`)
    pub export_marker: bool,
}

/// Match a line against a rule table
pub(crate) fn match_line(rules: &[DeclRule], line: &str) -> Option<Declaration> {
    let indented = line.starts_with(|c: char| c.is_whitespace());
    for rule in rules {
        let in_scope = match rule.scope {
            Scope::TopLevel => !indented,
            Scope::Nested => indented,
            Scope::Any => true,
        };
        if !in_scope {
            continue;
        }
        let Some(caps) = rule.regex.captures(line) else {
            continue;
        };
        let name = caps.name("name").map(|m| m.as_str()).unwrap_or("");
        if !rule.kind.accepts(name, line) {
            continue;
        }
        return Some(Declaration {
            kind: rule.kind,
            name: name.to_string(),
            export_marker: caps.name("export").is_some(),
        });
    }
    None
}

static TS_RULES: OnceLock<Vec<DeclRule>> = OnceLock::new();
static PYTHON_RULES: OnceLock<Vec<DeclRule>> = OnceLock::new();
static RUST_RULES: OnceLock<Vec<DeclRule>> = OnceLock::new();
static GO_RULES: OnceLock<Vec<DeclRule>> = OnceLock::new();
static JAVA_RULES: OnceLock<Vec<DeclRule>> = OnceLock::new();
static C_RULES: OnceLock<Vec<DeclRule>> = OnceLock::new();

/// Rule table for a language; empty for languages without declarations
pub(crate) fn rules_for(language: Language) -> &'static [DeclRule] {
    match language {
        Language::TypeScript | Language::JavaScript => TS_RULES.get_or_init(ts_rules),
        Language::Python => PYTHON_RULES.get_or_init(python_rules),
        Language::Rust => RUST_RULES.get_or_init(rust_rules),
        Language::Go => GO_RULES.get_or_init(go_rules),
        Language::Java => JAVA_RULES.get_or_init(java_rules),
        Language::C | Language::Cpp => C_RULES.get_or_init(c_rules),
        Language::Markdown | Language::Text | Language::Unknown => &[],
    }
}

fn ts_rules() -> Vec<DeclRule> {
    use DeclKind::*;
    vec![
        DeclRule::new(
            Function,
            Scope::Any,
            r"^\s*(?P<export>export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)",
        ),
        DeclRule::new(
            Class,
            Scope::Any,
            r"^\s*(?P<export>export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)",
        ),
        DeclRule::new(
            Interface,
            Scope::Any,
            r"^\s*(?P<export>export\s+)?(?:declare\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)",
        ),
        DeclRule::new(
            TypeAlias,
            Scope::TopLevel,
            r"^(?P<export>export\s+)?(?:declare\s+)?type\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^=]*>)?\s*=",
        ),
        DeclRule::new(
            Enum,
            Scope::Any,
            r"^\s*(?P<export>export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+(?P<name>[A-Za-z_$][\w$]*)",
        ),
        // const handler = async (req) => { ... }
        DeclRule::new(
            Function,
            Scope::TopLevel,
            r"^(?P<export>export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*(?::[^=]+)?=>|[A-Za-z_$][\w$]*\s*=>)",
        ),
        DeclRule::new(
            Const,
            Scope::TopLevel,
            r"^(?P<export>export\s+)?(?:declare\s+)?const\s+(?P<name>[A-Za-z_$][\w$]*)",
        ),
        DeclRule::new(
            Variable,
            Scope::TopLevel,
            r"^(?P<export>export\s+)?(?:declare\s+)?(?:let|var)\s+(?P<name>[A-Za-z_$][\w$]*)",
        ),
        DeclRule::new(
            Method,
            Scope::Nested,
            r"^\s+(?:(?:public|private|protected|static|async|readonly|override|abstract|get|set)\s+)*(?P<name>#?[A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\([^)]*\)\s*(?::\s*[^{;=]+)?\{\s*$",
        ),
    ]
}

fn python_rules() -> Vec<DeclRule> {
    use DeclKind::*;
    vec![
        DeclRule::new(Function, Scope::TopLevel, r"^(?:async\s+)?def\s+(?P<name>\w+)\s*\("),
        DeclRule::new(Method, Scope::Nested, r"^\s+(?:async\s+)?def\s+(?P<name>\w+)\s*\("),
        DeclRule::new(Class, Scope::Any, r"^\s*class\s+(?P<name>\w+)"),
        DeclRule::new(
            Const,
            Scope::TopLevel,
            r"^(?P<name>[A-Z][A-Z0-9_]*)\s*(?::[^=]+)?=[^=]",
        ),
        DeclRule::new(
            Variable,
            Scope::TopLevel,
            r"^(?P<name>[a-z_]\w*)\s*(?::[^=]+)?=[^=]",
        ),
    ]
}

fn rust_rules() -> Vec<DeclRule> {
    use DeclKind::*;
    const FN_QUALIFIERS: &str = r#"(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?"#;
    vec![
        DeclRule::new(
            Function,
            Scope::TopLevel,
            &format!(r"^(?P<export>pub(?:\([^)]*\))?\s+)?{}fn\s+(?P<name>\w+)", FN_QUALIFIERS),
        ),
        DeclRule::new(
            Method,
            Scope::Nested,
            &format!(r"^\s+(?P<export>pub(?:\([^)]*\))?\s+)?{}fn\s+(?P<name>\w+)", FN_QUALIFIERS),
        ),
        DeclRule::new(
            Class,
            Scope::Any,
            r"^\s*(?P<export>pub(?:\([^)]*\))?\s+)?(?:struct|union)\s+(?P<name>\w+)",
        ),
        DeclRule::new(
            Enum,
            Scope::Any,
            r"^\s*(?P<export>pub(?:\([^)]*\))?\s+)?enum\s+(?P<name>\w+)",
        ),
        DeclRule::new(
            Interface,
            Scope::Any,
            r"^\s*(?P<export>pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+(?P<name>\w+)",
        ),
        DeclRule::new(
            TypeAlias,
            Scope::Any,
            r"^\s*(?P<export>pub(?:\([^)]*\))?\s+)?type\s+(?P<name>\w+)\s*(?:<[^=]*>)?\s*=",
        ),
        DeclRule::new(
            Const,
            Scope::Any,
            r"^\s*(?P<export>pub(?:\([^)]*\))?\s+)?(?:const|static)\s+(?:mut\s+)?(?P<name>\w+)\s*:",
        ),
    ]
}

fn go_rules() -> Vec<DeclRule> {
    use DeclKind::*;
    vec![
        DeclRule::new(Method, Scope::TopLevel, r"^func\s+\([^)]*\)\s*(?P<name>\w+)"),
        DeclRule::new(Function, Scope::TopLevel, r"^func\s+(?P<name>\w+)"),
        DeclRule::new(Class, Scope::TopLevel, r"^type\s+(?P<name>\w+)\s+struct\b"),
        DeclRule::new(Interface, Scope::TopLevel, r"^type\s+(?P<name>\w+)\s+interface\b"),
        DeclRule::new(TypeAlias, Scope::TopLevel, r"^type\s+(?P<name>\w+)\b"),
        DeclRule::new(Const, Scope::TopLevel, r"^const\s+(?P<name>\w+)"),
        DeclRule::new(Variable, Scope::TopLevel, r"^var\s+(?P<name>\w+)"),
    ]
}

fn java_rules() -> Vec<DeclRule> {
    use DeclKind::*;
    vec![
        DeclRule::new(
            Class,
            Scope::Any,
            r"^\s*(?P<export>public\s+)?(?:(?:protected|private|abstract|final|static|sealed)\s+)*(?:class|record)\s+(?P<name>\w+)",
        ),
        DeclRule::new(
            Interface,
            Scope::Any,
            r"^\s*(?P<export>public\s+)?(?:(?:protected|private|abstract|static|sealed)\s+)*@?interface\s+(?P<name>\w+)",
        ),
        DeclRule::new(
            Enum,
            Scope::Any,
            r"^\s*(?P<export>public\s+)?(?:(?:protected|private|static)\s+)*enum\s+(?P<name>\w+)",
        ),
        DeclRule::new(
            Const,
            Scope::Nested,
            r"^\s+(?P<export>public\s+)?(?:(?:protected|private)\s+)?static\s+final\s+[\w.]+(?:<[^=]*>)?(?:\[\])*\s+(?P<name>[A-Z][A-Z0-9_]*)\s*=",
        ),
        DeclRule::new(
            Method,
            Scope::Nested,
            r"^\s+(?P<export>public\s+)?(?:(?:protected|private|static|final|abstract|synchronized|native|default)\s+)*(?:<[^>]+>\s+)?[\w.]+(?:<[^()]*>)?(?:\[\])*\s+(?P<name>\w+)\s*\([^;]*$",
        ),
    ]
}

fn c_rules() -> Vec<DeclRule> {
    use DeclKind::*;
    vec![
        DeclRule::new(Const, Scope::TopLevel, r"^#\s*define\s+(?P<name>[A-Za-z_]\w*)"),
        DeclRule::new(
            Enum,
            Scope::Any,
            r"^\s*(?:typedef\s+)?enum\s+(?:class\s+|struct\s+)?(?P<name>\w+)",
        ),
        DeclRule::new(
            Class,
            Scope::Any,
            r"^\s*(?:typedef\s+)?(?:class|struct|union)\s+(?P<name>\w+)\s*(?:final\s*)?(?::[^;{]*)?\{?\s*$",
        ),
        DeclRule::new(TypeAlias, Scope::TopLevel, r"^typedef\s+[^;{]*?\b(?P<name>\w+)\s*;"),
        DeclRule::new(
            Function,
            Scope::TopLevel,
            r"^(?:static\s+)?(?:(?:inline|extern|virtual|constexpr)\s+)*[\w:<>,*&\s]+?[\s*&]+(?P<name>[A-Za-z_][\w:~]*)\s*\([^;]*$",
        ),
    ]
}
