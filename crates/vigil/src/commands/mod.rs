pub mod deps;
pub mod index;
pub mod init;
pub mod observations;
pub mod resolve;
pub mod search;
pub mod status;
pub mod version;
pub mod watch;

use std::path::{Path, PathBuf};
use vigil_core::Config;
use vigil_memory::Engine;
use vigil_telemetry::Paths;

/// Project config if present, then the user config, then defaults
pub fn load_config(root: &Path) -> Config {
    let candidates: Vec<PathBuf> = Paths::new(root).config_candidates();
    let refs: Vec<&Path> = candidates.iter().map(PathBuf::as_path).collect();
    Config::load(&refs)
}

pub fn open_engine(root: &Path) -> anyhow::Result<Engine> {
    Engine::open(root, load_config(root))
}

pub fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
