//! Configuration CLI commands.

use clap::Subcommand;
use packfetch::config::{config_path, ConfigFile};

use crate::error::CliError;

/// Config action subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the path of the configuration file
    Path,
    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(action: ConfigAction) -> Result<(), CliError> {
    let path = config_path();

    match action {
        ConfigAction::Show => {
            let config = ConfigFile::load()?;
            if !path.exists() {
                println!("# {} does not exist; showing defaults", path.display());
            }
            print!("{}", config.to_ini_string());
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                println!("Config file already exists: {}", path.display());
                println!("Use --force to overwrite it with defaults.");
                return Ok(());
            }
            ConfigFile::default().save_to(&path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
