//! Progress events published by the orchestrator.

use std::sync::Arc;

use super::outcome::AttemptKind;
use crate::manifest::ArtifactReference;

/// Something observable happened during an acquisition run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A wave is about to fan out over `artifacts` references.
    WaveStarted {
        wave: u32,
        attempt: AttemptKind,
        artifacts: usize,
    },

    /// One fetch attempt finished; `label` is the outcome label
    /// ("ready", "cached", "retry", "manual").
    ArtifactFinished {
        wave: u32,
        reference: ArtifactReference,
        label: &'static str,
    },

    /// A wave completed; `retries` references go into the next wave.
    WaveFinished { wave: u32, retries: usize },
}

/// Callback receiving progress events. Called from pool worker threads.
pub type ProgressObserver = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
