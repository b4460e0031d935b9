//! packfetch CLI - Command-line interface
//!
//! Thin command-line surface over the packfetch library: fetch the mods of a
//! pack manifest, maintain the artifact cache and manage the config file.

mod commands;
mod error;
mod progress;
mod prompt;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::config::ConfigAction;
use commands::fetch::FetchArgs;

#[derive(Parser)]
#[command(name = "packfetch", version)]
#[command(about = "Fetch and verify the mods of a CurseForge modpack", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and verify every mod referenced by a pack manifest
    Fetch(FetchArgs),

    /// Manage the shared artifact cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch(args) => commands::fetch::run(args, cli.verbose),
        Commands::Cache { action } => commands::cache::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        e.exit();
    }
}
