//! Run-level error types.
//!
//! Per-artifact failures (timeouts, corrupt transfers, distribution
//! restrictions) never show up here: the fetcher classifies them into
//! [`FetchOutcome`](crate::acquire::FetchOutcome)s. Only conditions that make
//! the whole run meaningless propagate as an [`AcquireError`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::ManifestError;
use crate::manual::ReconcileError;
use crate::transport::TransportError;

/// Result type for acquisition runs.
pub type AcquireResult<T> = Result<T, AcquireError>;

/// Fatal errors that abort an acquisition run.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The pack manifest is missing or corrupt.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A local directory or file could not be prepared.
    #[error("failed to prepare {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    /// The shared HTTP session could not be created.
    #[error("failed to create HTTP session: {0}")]
    Session(#[source] TransportError),

    /// Placing a manually downloaded file failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}
