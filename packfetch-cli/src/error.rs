//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use packfetch::config::ConfigFileError;
use packfetch::manifest::ManifestError;
use packfetch::manual::ReconcileError;
use packfetch::AcquireError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file problem
    Config(ConfigFileError),
    /// Manifest missing or corrupt
    Manifest(ManifestError),
    /// Acquisition run aborted
    Acquire(AcquireError),
    /// Placing manual downloads failed
    Reconcile(ReconcileError),
    /// Cache maintenance failed
    Cache(String),
    /// Failed to write an output file
    FileWrite { path: PathBuf, error: std::io::Error },
    /// Some artifacts are still missing after the run
    Incomplete { missing: usize },
}

impl CliError {
    /// Exit the process with an error message and status 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value in the config file or recreate it with:");
                eprintln!("  packfetch config init --force");
            }
            CliError::Incomplete { .. } => {
                eprintln!();
                eprintln!("Run the same command again once the files are downloaded;");
                eprintln!("verified artifacts are kept in the cache.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Manifest(e) => write!(f, "{}", e),
            CliError::Acquire(e) => write!(f, "Acquisition failed: {}", e),
            CliError::Reconcile(e) => write!(f, "Manual download failed: {}", e),
            CliError::Cache(msg) => write!(f, "Cache error: {}", msg),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
            CliError::Incomplete { missing } => {
                write!(f, "{} artifact(s) are still missing", missing)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Manifest(e) => Some(e),
            CliError::Acquire(e) => Some(e),
            CliError::Reconcile(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        CliError::Manifest(e)
    }
}

impl From<AcquireError> for CliError {
    fn from(e: AcquireError) -> Self {
        CliError::Acquire(e)
    }
}

impl From<ReconcileError> for CliError {
    fn from(e: ReconcileError) -> Self {
        CliError::Reconcile(e)
    }
}
