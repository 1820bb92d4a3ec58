//! Magic Folder CLI
//!
//! `serve` runs the full daemon (watcher, workers, HTTP API); the remaining
//! commands operate on the store directly for one-shot use.

mod bootstrap;
mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use magicfolder_config::ApplicationConfig;

#[derive(Parser)]
#[command(name = "magicfolder", version, about = "Semantic document indexing for a drop directory")]
struct Cli {
    /// Path to a JSON config file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon: file watcher, worker pool, and HTTP API
    Serve,
    /// Queue one file and process it synchronously
    Process {
        /// Path of the file to process
        file_path: PathBuf,
    },
    /// Search indexed documents
    Search {
        /// Natural-language query
        query: String,
        /// Number of results per granularity
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
    },
    /// List all indexed files
    List,
    /// Delete a file's metadata and chunks
    Delete {
        /// Stored path of the file
        path: String,
    },
}

fn main() -> ExitCode {
    magicfolder_common::initialize_environment();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ApplicationConfig::from_file(path)?,
        None => ApplicationConfig::default(),
    };

    match cli.command {
        Command::Serve => commands::serve(&config),
        Command::Process { file_path } => commands::process(&config, &file_path),
        Command::Search { query, top_k } => commands::search(&config, &query, top_k),
        Command::List => commands::list(&config),
        Command::Delete { path } => commands::delete(&config, &path),
    }
}
