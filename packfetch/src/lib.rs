//! packfetch - modpack artifact acquisition
//!
//! This library resolves the mod files referenced by a CurseForge-style pack
//! manifest against a remote catalog, downloads and verifies them through a
//! shared on-disk cache, and hands back the artifacts that need a manual
//! download because their publisher disabled third-party distribution.
//!
//! # Architecture
//!
//! ```text
//! Manifest ──► AcquisitionOrchestrator ──► AcquisitionReport ──► Reconciler
//!                     │                      (ready + manual)     (manual only)
//!                     ├── ArtifactFetcher (one per reference, per wave)
//!                     │       ├── CatalogClient ── RateLimiter
//!                     │       ├── Transport (shared HTTP session)
//!                     │       └── verify (size + checksum)
//!                     └── RetryPolicy (waves, backoff)
//! ```
//!
//! Layout of the installation directory, linking and override copying are the
//! caller's concern; the engine only fills the cache and reports paths.

pub mod acquire;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod manual;
pub mod transport;
pub mod verify;

pub use acquire::{AcquisitionOrchestrator, AcquisitionReport};
pub use error::{AcquireError, AcquireResult};
pub use manifest::{ArtifactReference, Manifest};
