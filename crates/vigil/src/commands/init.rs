use std::path::Path;
use vigil_core::Config;
use vigil_index::Store;
use vigil_telemetry::Paths;

pub fn run(root: &Path, force: bool) -> anyhow::Result<()> {
    let paths = Paths::new(root);
    let wrote_config = write_default_config(&paths, force)?;

    // Creates the data directory and schema
    Store::open(&paths.db_path())?;

    if wrote_config {
        println!("✓ Wrote {}", paths.config_path().display());
    } else {
        println!("Config already present at {} (use --force to reset)", paths.config_path().display());
    }
    println!("✓ Index database at {}", paths.db_path().display());
    println!("\nNext: vigil index");

    Ok(())
}

/// Write `Config::new()` unless a config exists and `force` is off. Returns whether it wrote.
fn write_default_config(paths: &Paths, force: bool) -> anyhow::Result<bool> {
    let path = paths.config_path();
    if path.exists() && !force {
        return Ok(false);
    }
    let json = serde_json::to_string_pretty(&Config::new())?;
    vigil_telemetry::atomic_write(&path, json.as_bytes())?;
    Ok(true)
}
