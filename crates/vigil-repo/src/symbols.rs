//! Symbol extraction from source files

use crate::decl::{self, Declaration};
use crate::imports::extract_imports;
use crate::language::{detect_language, Language};
use vigil_core::{ParseResult, Symbol};
use vigil_telemetry::estimate_tokens;

/// Longest signature kept, in characters
const MAX_SIGNATURE_CHARS: usize = 240;
/// Give up looking for the end of a body after this many lines
const MAX_BODY_LINES: usize = 5_000;

/// Turns file content into symbols and imports.
///
/// Implementations must be pure: the same path and content always produce the
/// same result. Unsupported languages produce an empty result, never an error.
pub trait SourceParser: Send + Sync {
    fn parse(&self, path: &str, content: &str) -> ParseResult;
}

/// Line-oriented parser built on per-language declaration rules
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexParser;

impl SourceParser for RegexParser {
    fn parse(&self, path: &str, content: &str) -> ParseResult {
        let language = detect_language(path);
        ParseResult {
            symbols: extract_symbols(language, content),
            imports: extract_imports(language, content),
            token_estimate: estimate_tokens(content),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyStyle {
    Braces { char_literals: bool },
    Indent,
}

fn body_style(language: Language) -> BodyStyle {
    match language {
        Language::Python => BodyStyle::Indent,
        // `'a` is a lifetime, only `'x'` is a literal
        Language::Rust => BodyStyle::Braces { char_literals: true },
        _ => BodyStyle::Braces { char_literals: false },
    }
}

/// Extract declarations in source order
pub fn extract_symbols(language: Language, content: &str) -> Vec<Symbol> {
    let rules = decl::rules_for(language);
    if rules.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = content.lines().collect();
    let style = body_style(language);
    let mut symbols = Vec::new();
    let mut in_comment = false;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if skip_comment(language, trimmed, &mut in_comment) {
            continue;
        }
        let Some(declaration) = decl::match_line(rules, line) else {
            continue;
        };
        let end = match style {
            BodyStyle::Braces { char_literals } => brace_body_end(&lines, idx, char_literals),
            BodyStyle::Indent => indent_body_end(&lines, idx),
        };
        let exported = is_exported(language, &declaration, trimmed);
        symbols.push(
            Symbol::new(declaration.name, declaration.kind.symbol_kind(), signature_of(line))
                .at_lines(idx + 1, end + 1)
                .exported(exported),
        );
    }
    symbols
}

/// Comment and docstring lines never declare anything
fn skip_comment(language: Language, trimmed: &str, in_comment: &mut bool) -> bool {
    if language == Language::Python {
        let quotes = trimmed.matches("\"\"\"").count() + trimmed.matches("'''").count();
        let was_inside = *in_comment;
        if quotes % 2 == 1 {
            *in_comment = !*in_comment;
        }
        let opens_string = trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''");
        return was_inside || opens_string || trimmed.starts_with('#');
    }

    if *in_comment {
        if trimmed.contains("*/") {
            *in_comment = false;
        }
        return true;
    }
    if trimmed.starts_with("/*") {
        *in_comment = !trimmed.contains("*/");
        return true;
    }
    trimmed.starts_with("//") || trimmed.starts_with('*')
}

fn is_exported(language: Language, declaration: &Declaration, trimmed: &str) -> bool {
    match language {
        Language::TypeScript | Language::JavaScript | Language::Rust | Language::Java => {
            declaration.export_marker
        }
        Language::Go => declaration.name.starts_with(|c: char| c.is_ascii_uppercase()),
        Language::Python => !declaration.name.starts_with('_'),
        Language::C | Language::Cpp => !trimmed.starts_with("static"),
        Language::Markdown | Language::Text | Language::Unknown => false,
    }
}

/// The declaration line without its body opener, capped in length
fn signature_of(line: &str) -> String {
    let trimmed = line.trim();
    let trimmed = trimmed
        .strip_suffix('{')
        .or_else(|| trimmed.strip_suffix(':'))
        .unwrap_or(trimmed)
        .trim_end();
    if trimmed.chars().count() > MAX_SIGNATURE_CHARS {
        trimmed.chars().take(MAX_SIGNATURE_CHARS).collect()
    } else {
        trimmed.to_string()
    }
}

/// Whether a header line without a body opener carries on to the next line
fn continues(trimmed: &str) -> bool {
    const OPEN_ENDINGS: &[char] = &['(', ',', '=', '>', ':', '<', '|', '&', '+', '?', '['];
    trimmed.ends_with(OPEN_ENDINGS)
}

/// Last line (0-indexed) of a brace-delimited declaration starting at `start`
fn brace_body_end(lines: &[&str], start: usize, char_literals: bool) -> usize {
    let mut depth: i64 = 0;
    let mut opened = false;
    let mut last = start;

    for (offset, line) in lines[start..].iter().enumerate().take(MAX_BODY_LINES) {
        let idx = start + offset;
        last = idx;
        for delta in brace_deltas(line, char_literals) {
            depth += delta;
            if delta > 0 {
                opened = true;
            }
            if opened && depth <= 0 {
                return idx;
            }
        }
        if !opened {
            let trimmed = line.trim_end();
            if trimmed.ends_with(';') || (offset == 0 && !continues(trimmed)) {
                return idx;
            }
        }
    }

    if opened {
        last
    } else {
        start
    }
}

/// +1 / -1 per brace outside strings and line comments
fn brace_deltas(line: &str, char_literals: bool) -> Vec<i64> {
    let chars: Vec<char> = line.chars().collect();
    let mut deltas = Vec::new();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '/' if chars.get(i + 1) == Some(&'/') => break,
            '"' | '`' => quote = Some(c),
            '\'' if char_literals => {
                // Skip 'x' and '\n'; a bare ' is a lifetime
                if chars.get(i + 1) == Some(&'\\') {
                    if let Some(close) = chars[i + 2..].iter().position(|ch| *ch == '\'') {
                        i += close + 3;
                        continue;
                    }
                } else if chars.get(i + 2) == Some(&'\'') {
                    i += 3;
                    continue;
                }
            }
            '\'' => quote = Some(c),
            '{' => deltas.push(1),
            '}' => deltas.push(-1),
            _ => {}
        }
        i += 1;
    }
    deltas
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Last line (0-indexed) of an indentation-delimited declaration
fn indent_body_end(lines: &[&str], start: usize) -> usize {
    let base = indent_of(lines[start]);

    // A header may span lines until its brackets balance
    let mut balance: i64 = 0;
    let mut header_end = start;
    for (offset, line) in lines[start..].iter().enumerate().take(MAX_BODY_LINES) {
        header_end = start + offset;
        for c in line.chars() {
            match c {
                '(' | '[' | '{' => balance += 1,
                ')' | ']' | '}' => balance -= 1,
                _ => {}
            }
        }
        if balance <= 0 {
            break;
        }
    }

    let mut end = header_end;
    for (idx, line) in lines.iter().enumerate().skip(header_end + 1).take(MAX_BODY_LINES) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= base {
            break;
        }
        end = idx;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::SymbolKind;

    fn parse(path: &str, content: &str) -> ParseResult {
        RegexParser.parse(path, content)
    }

    fn find<'a>(result: &'a ParseResult, name: &str) -> &'a Symbol {
        result
            .symbols
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("symbol {} not found", name))
    }

    #[test]
    fn test_typescript_symbols_and_ranges() {
        let content = r#"import { b } from './b';

export function foo(a: number): number {
  if (a > 1) {
    return a;
  }
  return b(a);
}

export class Parser {
  private pos = 0;

  parseToken(input: string): string {
    return input.slice(this.pos);
  }
}

const LIMIT = 10;
"#;
        let result = parse("src/a.ts", content);

        let foo = find(&result, "foo");
        assert_eq!(foo.kind, SymbolKind::Function);
        assert!(foo.exported);
        assert_eq!((foo.start_line, foo.end_line), (3, 8));
        assert_eq!(foo.signature, "export function foo(a: number): number");

        let parser = find(&result, "Parser");
        assert_eq!(parser.kind, SymbolKind::Class);
        assert_eq!((parser.start_line, parser.end_line), (10, 16));

        let method = find(&result, "parseToken");
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!((method.start_line, method.end_line), (13, 15));

        let limit = find(&result, "LIMIT");
        assert_eq!(limit.kind, SymbolKind::Const);
        assert!(!limit.exported);
        assert_eq!(limit.start_line, limit.end_line);

        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].names, vec!["b"]);
        assert!(result.token_estimate > 0);
    }

    #[test]
    fn test_no_symbols_from_comments() {
        let content = "// function ghost() {}\n/*\nfunction buried() {}\n*/\nfunction real() {}\n";
        let result = parse("a.js", content);
        let names: Vec<_> = result.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["real"]);
    }

    #[test]
    fn test_python_indent_ranges() {
        let content = "class Store:\n    def get(self, key):\n        return key\n\n    def _put(self):\n        pass\n\ndef helper(\n    a,\n    b,\n):\n    return a\n\nMAX = 3\n";
        let result = parse("store.py", content);

        let store = find(&result, "Store");
        assert_eq!((store.start_line, store.end_line), (1, 6));
        assert_eq!(find(&result, "get").kind, SymbolKind::Method);
        assert!(!find(&result, "_put").exported);

        let helper = find(&result, "helper");
        assert_eq!(helper.kind, SymbolKind::Function);
        assert_eq!((helper.start_line, helper.end_line), (8, 12));
        assert_eq!(find(&result, "MAX").kind, SymbolKind::Const);
    }

    #[test]
    fn test_python_inline_docstring_keeps_def() {
        let content = "def foo():  \"\"\"Return one.\"\"\"\n    return 1\n\ndef bar():\n    \"\"\"\n    def ghost():\n    \"\"\"\n    return 2\n";
        let result = parse("m.py", content);
        let names: Vec<_> = result.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "bar"]);
        assert_eq!(find(&result, "foo").start_line, 1);
    }

    #[test]
    fn test_rust_lifetimes_do_not_break_braces() {
        let content = "pub fn first<'a>(items: &'a [String]) -> &'a str {\n    let c = '{';\n    &items[0]\n}\n\nfn private() {}\n";
        let result = parse("src/lib.rs", content);

        let first = find(&result, "first");
        assert!(first.exported);
        assert_eq!((first.start_line, first.end_line), (1, 4));
        assert!(!find(&result, "private").exported);
    }

    #[test]
    fn test_go_export_by_case() {
        let content = "package srv\n\nfunc Start() {\n}\n\nfunc stop() {\n}\n";
        let result = parse("srv.go", content);
        assert!(find(&result, "Start").exported);
        assert!(!find(&result, "stop").exported);
    }

    #[test]
    fn test_unsupported_language_is_empty() {
        let result = parse("notes.txt", "function foo() {}");
        assert!(result.symbols.is_empty());
        assert!(result.imports.is_empty());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let content = "export function foo() {}\nexport const bar = () => 1;\n";
        assert_eq!(parse("a.ts", content), parse("a.ts", content));
    }

    #[test]
    fn test_signature_truncated() {
        let long = format!("function f({}) {{}}", "a, ".repeat(200));
        let result = parse("a.js", &long);
        assert_eq!(result.symbols[0].signature.chars().count(), MAX_SIGNATURE_CHARS);
    }
}
