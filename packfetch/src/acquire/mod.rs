//! Acquisition engine.
//!
//! The [`AcquisitionOrchestrator`] fans references out over a worker pool in
//! waves; each worker runs an [`ArtifactFetcher`] that classifies its result
//! as a [`FetchOutcome`]:
//!
//! | Outcome                  | First attempt | Retry        |
//! |--------------------------|---------------|--------------|
//! | catalog unavailable      | retry         | retry        |
//! | download failure         | retry         | retry        |
//! | checksum mismatch        | retry         | retry        |
//! | 0 or >1 matching version | retry         | manual       |
//! | other unexpected error   | retry         | manual       |

mod fetcher;
mod orchestrator;
mod outcome;
mod policy;
mod progress;
mod report;

pub use fetcher::ArtifactFetcher;
pub use orchestrator::AcquisitionOrchestrator;
pub use outcome::{
    AcquiredArtifact, ArtifactKind, ArtifactSource, ArtifactStatus, AttemptKind, FetchOutcome,
};
pub use policy::{
    Backoff, RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_BACKOFF_SECS,
    DEFAULT_RETRY_BACKOFF_SECS,
};
pub use progress::{ProgressEvent, ProgressObserver};
pub use report::{AcquisitionReport, AcquisitionStats};
