//! Per-attempt outcomes and final artifact records.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::{ProjectInfo, VersionRecord};
use crate::manifest::ArtifactReference;

/// Which attempt of a reference is being made.
///
/// Structural anomalies are forgiven once: on the first attempt they are
/// retried, on a retry they are taken as a distribution restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    First,
    Retry,
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptKind::First => write!(f, "first"),
            AttemptKind::Retry => write!(f, "retry"),
        }
    }
}

/// Pass-through classification of an artifact for the layout builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ArtifactKind {
    #[default]
    #[serde(rename = "mc-mods")]
    ModJar,
    #[serde(rename = "texture-packs")]
    TexturePack,
}

/// Where a ready artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactSource {
    /// Verified cache entry from an earlier run; nothing was downloaded.
    Cache,
    /// Downloaded and verified during this run.
    Download,
    /// Supplied by the user through manual reconciliation.
    Manual,
}

/// Result of one fetch attempt for one reference.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The artifact is on disk and verified.
    Ready {
        reference: ArtifactReference,
        path: PathBuf,
        kind: ArtifactKind,
        source: ArtifactSource,
    },

    /// Network failure, corrupt transfer or a one-off anomaly; retry later.
    Transient {
        reference: ArtifactReference,
        reason: String,
    },

    /// The artifact cannot be fetched automatically; the user has to
    /// download it by hand.
    DistributionRestricted {
        reference: ArtifactReference,
        project: Option<ProjectInfo>,
        record: Option<VersionRecord>,
        reason: String,
    },
}

impl FetchOutcome {
    /// The reference this outcome belongs to.
    pub fn reference(&self) -> ArtifactReference {
        match self {
            Self::Ready { reference, .. }
            | Self::Transient { reference, .. }
            | Self::DistributionRestricted { reference, .. } => *reference,
        }
    }

    /// Short label for logs and progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready {
                source: ArtifactSource::Cache,
                ..
            } => "cached",
            Self::Ready { .. } => "ready",
            Self::Transient { .. } => "retry",
            Self::DistributionRestricted { .. } => "manual",
        }
    }
}

/// Status of an artifact in the final result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "status", content = "source")]
pub enum ArtifactStatus {
    /// Present and verified.
    Verified(ArtifactSource),
    /// Placeholder for an artifact awaiting manual download; the path is
    /// where the file is expected to appear.
    PendingManual,
}

/// One slot of the final artifact list handed to the layout builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquiredArtifact {
    pub reference: ArtifactReference,
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub status: ArtifactStatus,
}

impl AcquiredArtifact {
    /// Whether the file is known to be present and intact.
    pub fn is_verified(&self) -> bool {
        matches!(self.status, ArtifactStatus::Verified(_))
    }
}
