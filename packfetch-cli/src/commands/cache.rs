//! Cache management CLI commands.

use clap::Subcommand;
use packfetch::cache::{format_size, ArtifactCache};
use packfetch::config::ConfigFile;

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Delete every cached artifact
    Clear,
    /// Show cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let cache = ArtifactCache::new(&config.cache.directory);

    match action {
        CacheAction::Clear => {
            println!("Clearing artifact cache at: {}", cache.root().display());
            let removed = cache.clear().map_err(|e| CliError::Cache(e.to_string()))?;
            println!(
                "Deleted {} files, freed {}",
                removed.files,
                format_size(removed.bytes)
            );
            Ok(())
        }
        CacheAction::Stats => {
            println!("Artifact cache: {}", cache.root().display());
            let stats = cache.stats().map_err(|e| CliError::Cache(e.to_string()))?;
            println!("  Files: {}", stats.files);
            println!("  Size:  {}", format_size(stats.bytes));
            Ok(())
        }
    }
}
