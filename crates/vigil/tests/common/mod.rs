use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vigil_core::Config;

/// Small TypeScript project: an auth module used by two callers, plus docs
pub fn sample_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "src/auth.ts",
        "export function parseToken(raw: string): string {\n  return raw.trim();\n}\n\nexport function verify(token: string): boolean {\n  return token.length > 0;\n}\n",
    );
    write(
        temp.path(),
        "src/api.ts",
        "import { parseToken, verify } from './auth';\n\nexport function handle(req: string) {\n  return verify(parseToken(req));\n}\n",
    );
    write(
        temp.path(),
        "src/cli.ts",
        "import { parseToken } from './auth';\n\nexport function main() {}\n",
    );
    write(temp.path(), "docs/AUTH.md", "# Tokens\n\nTokens are trimmed before verification.\n");
    temp
}

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Defaults with low thresholds so patterns trigger in a few calls
pub fn sensitive_config() -> Config {
    let mut config = Config::new();
    config.patterns.redundant_access_count = 2;
    config.patterns.failed_search_attempts = 2;
    config
}
