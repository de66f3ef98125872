mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    // Watcher events carry absolute paths; the index stores them relative to this
    let root = std::fs::canonicalize(&root).with_context(|| format!("no such directory: {}", root.display()))?;

    match cli.command {
        Commands::Init { force } => commands::init::run(&root, force),
        Commands::Index { force, paths } => commands::index::run(&root, force, paths),
        Commands::Resolve => commands::resolve::run(&root),
        Commands::Status { top } => commands::status::run(&root, top),
        Commands::Search { query, docs, limit } => commands::search::run(&root, &query, docs, limit),
        Commands::Deps { path } => commands::deps::run(&root, &path),
        Commands::Observations {
            session,
            all,
            query,
            export,
            limit,
        } => commands::observations::run(
            &root,
            commands::observations::Filter {
                session: session.as_deref(),
                include_stale: all,
                query: query.as_deref(),
                limit,
            },
            export,
        ),
        Commands::Watch => commands::watch::run(&root),
        Commands::Version => commands::version::run(),
    }
}
