use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Incremental code index and session memory for coding agents")]
pub struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the project data directory and a default config
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Index the project, then resolve imports
    Index {
        /// Re-parse files whose content hash is unchanged
        #[arg(short, long)]
        force: bool,

        /// Extra files or directories to index regardless of globs
        paths: Vec<PathBuf>,
    },

    /// Rebuild the import graph from the indexed files
    Resolve,

    /// Show index statistics and the most central files
    Status {
        /// Number of central files to list
        #[arg(short, long, default_value_t = 10)]
        top: usize,
    },

    /// Full-text search over symbols or document chunks
    Search {
        query: String,

        /// Search documentation chunks instead of symbols
        #[arg(long)]
        docs: bool,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show what a file imports and what imports it
    Deps { path: String },

    /// List or search recorded observations
    Observations {
        /// Restrict to one session
        #[arg(short, long)]
        session: Option<String>,

        /// Include stale observations
        #[arg(long)]
        all: bool,

        /// Full-text query over observation text
        #[arg(short, long)]
        query: Option<String>,

        /// Write the session's events to a JSONL file instead of listing
        #[arg(long)]
        export: bool,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Watch the project and re-index files as they change
    Watch,

    /// Print version information
    Version,
}
