//! Path resolution for the project index and configuration

use std::path::{Path, PathBuf};

const DATA_DIR: &str = ".vigil";

/// Resolves where a project's index, config and exports live
#[derive(Debug, Clone)]
pub struct Paths {
    pub project_root: PathBuf,
    pub user_dir: Option<PathBuf>,
}

impl Paths {
    /// Paths for the project rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: root.into(),
            user_dir: dirs::home_dir().map(|home| home.join(DATA_DIR)),
        }
    }

    /// Paths for the current working directory
    pub fn current() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Per-project data directory (`<root>/.vigil`)
    pub fn data_dir(&self) -> PathBuf {
        self.project_root.join(DATA_DIR)
    }

    /// SQLite index database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("index.db")
    }

    /// Project-level config file
    pub fn config_path(&self) -> PathBuf {
        self.data_dir().join("config.json")
    }

    /// User-level config file, if a home directory is known
    pub fn user_config_path(&self) -> Option<PathBuf> {
        self.user_dir.as_ref().map(|dir| dir.join("config.json"))
    }

    /// Config files in lookup order: project first, then user
    pub fn config_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = vec![self.config_path()];
        candidates.extend(self.user_config_path());
        candidates
    }

    /// JSONL export of a session's events
    pub fn events_export_path(&self, session_id: &str) -> PathBuf {
        self.data_dir()
            .join("exports")
            .join(format!("{}.jsonl", session_id))
    }

    /// Project-relative, `/`-separated form of `path`.
    ///
    /// Absolute paths outside the root and relative paths are returned as given,
    /// minus a leading `./`.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.project_root).unwrap_or(path);
        let s = rel.to_string_lossy().replace('\\', "/");
        s.strip_prefix("./").map(str::to_string).unwrap_or(s)
    }
}
