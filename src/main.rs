//! Topicmap CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use topicmap_core::{Edit, EntryPath};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "topicmap")]
#[command(about = "Turn heading-structured documents into editable topic maps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root holding topicmap.toml and the .topicmap cache
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a JSON or YAML block stream and start a new session
    Import {
        /// Block stream file
        file: PathBuf,
    },
    /// Print the current map
    Show,
    /// Preview a depth/key filter, optionally committing it
    Filter {
        /// Deepest level kept as its own entry
        #[arg(short = 'd', long)]
        max_depth: Option<u32>,

        /// Classification key to fold into its parent (repeatable)
        #[arg(short = 'x', long)]
        exclude: Vec<String>,

        /// Commit the result instead of only previewing it
        #[arg(long)]
        commit: bool,
    },
    /// Rename an entry
    Rename { path: EntryPath, title: String },
    /// Move an entry among its siblings
    Move {
        path: EntryPath,
        #[arg(allow_negative_numbers = true)]
        offset: i64,
    },
    /// Move an entry up one level
    Promote { path: EntryPath },
    /// Nest an entry under its preceding sibling
    Demote { path: EntryPath },
    /// Delete an entry and everything beneath it
    Delete { path: EntryPath },
    /// Join sibling units into the first one
    Join { path: EntryPath, count: usize },
    /// Revert the last change
    Undo,
    /// Reapply the last undone change
    Redo,
    /// Return to the structure as imported
    Restore,
    /// List the undo history
    History,
    /// Show counts and levels per classification key
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Write the current structure and assets to a directory
    Export { out: PathBuf },
    /// Clear the cache
    Clear,
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("topicmap={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Project root: {}", cli.root.display());

    let root = cli.root;
    match cli.command {
        Commands::Import { file } => commands::import(&root, &file),
        Commands::Show => commands::show(&root),
        Commands::Filter {
            max_depth,
            exclude,
            commit,
        } => commands::filter(&root, max_depth, exclude, commit),
        Commands::Rename { path, title } => commands::edit(&root, Edit::Rename { path, title }),
        Commands::Move { path, offset } => commands::edit(&root, Edit::MoveSibling { path, offset }),
        Commands::Promote { path } => commands::edit(&root, Edit::Promote { path }),
        Commands::Demote { path } => commands::edit(&root, Edit::Demote { path }),
        Commands::Delete { path } => commands::edit(&root, Edit::DeleteSubtree { path }),
        Commands::Join { path, count } => commands::edit(&root, Edit::JoinSiblings { path, count }),
        Commands::Undo => commands::undo(&root),
        Commands::Redo => commands::redo(&root),
        Commands::Restore => commands::restore(&root),
        Commands::History => commands::history(&root),
        Commands::Stats { json } => commands::stats(&root, json),
        Commands::Export { out } => commands::export(&root, &out),
        Commands::Clear => commands::clear(&root),
        Commands::Version => {
            println!("Topicmap v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
