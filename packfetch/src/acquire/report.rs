//! Result of an acquisition run.

use serde::Serialize;

use super::outcome::{
    AcquiredArtifact, ArtifactKind, ArtifactSource, ArtifactStatus, FetchOutcome,
};
use crate::cache::ArtifactCache;
use crate::manifest::ArtifactReference;
use crate::manual::ManualDownloadEntry;

/// Counters collected over all waves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionStats {
    /// Waves run, including the first.
    pub waves: u32,
    /// Artifacts downloaded and verified.
    pub downloads: usize,
    /// Artifacts served from a verified cache entry.
    pub cache_hits: usize,
    /// Transient outcomes across all waves.
    pub transient_failures: usize,
    /// Artifacts left for manual download.
    pub restricted: usize,
}

/// Everything an acquisition run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionReport {
    /// One slot per unique reference that is not unresolved: verified
    /// artifacts plus `PendingManual` placeholders.
    pub ready: Vec<AcquiredArtifact>,
    /// Artifacts the user has to download by hand.
    pub manual: Vec<ManualDownloadEntry>,
    /// References still transient when the retry ceiling was hit.
    pub unresolved: Vec<ArtifactReference>,
    pub stats: AcquisitionStats,
}

impl AcquisitionReport {
    /// Fold one wave's outcomes into the report.
    ///
    /// Returns the references to retry.
    pub(crate) fn absorb(
        &mut self,
        outcomes: Vec<FetchOutcome>,
        cache: &ArtifactCache,
    ) -> Vec<ArtifactReference> {
        let mut retry = Vec::new();

        for outcome in outcomes {
            match outcome {
                FetchOutcome::Ready {
                    reference,
                    path,
                    kind,
                    source,
                } => {
                    match source {
                        ArtifactSource::Cache => self.stats.cache_hits += 1,
                        _ => self.stats.downloads += 1,
                    }
                    self.ready.push(AcquiredArtifact {
                        reference,
                        path,
                        kind,
                        status: ArtifactStatus::Verified(source),
                    });
                }
                FetchOutcome::Transient { reference, .. } => {
                    self.stats.transient_failures += 1;
                    retry.push(reference);
                }
                FetchOutcome::DistributionRestricted {
                    reference,
                    project,
                    record,
                    ..
                } => {
                    let entry = ManualDownloadEntry::from_restriction(
                        reference,
                        project.as_ref(),
                        record,
                        cache,
                    );
                    self.stats.restricted += 1;
                    self.ready.push(AcquiredArtifact {
                        reference,
                        path: entry.target.clone(),
                        kind: ArtifactKind::ModJar,
                        status: ArtifactStatus::PendingManual,
                    });
                    self.manual.push(entry);
                }
            }
        }
        retry
    }

    /// Artifacts that are present and verified.
    pub fn verified(&self) -> impl Iterator<Item = &AcquiredArtifact> {
        self.ready.iter().filter(|a| a.is_verified())
    }

    /// Placeholders awaiting manual download.
    pub fn placeholders(&self) -> impl Iterator<Item = &AcquiredArtifact> {
        self.ready.iter().filter(|a| !a.is_verified())
    }

    /// Whether every reference ended up verified.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.ready.iter().all(AcquiredArtifact::is_verified)
    }

    /// Record that the manual download for `reference` was placed.
    ///
    /// Returns false if there was no placeholder for it.
    pub fn mark_placed(&mut self, reference: ArtifactReference) -> bool {
        let mut found = false;
        for artifact in self.ready.iter_mut().filter(|a| a.reference == reference) {
            if artifact.status == ArtifactStatus::PendingManual {
                artifact.status = ArtifactStatus::Verified(ArtifactSource::Manual);
                found = true;
            }
        }
        if found {
            self.manual.retain(|e| e.reference != reference);
        }
        found
    }
}
