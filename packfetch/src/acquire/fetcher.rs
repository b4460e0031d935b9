//! Single-artifact fetch pipeline.
//!
//! [`ArtifactFetcher::fetch`] resolves one reference end to end (lookup,
//! version selection, cache check, download, verification) and classifies
//! whatever happens into a [`FetchOutcome`]. It never returns an error.

use std::fs;
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use super::outcome::{ArtifactKind, ArtifactSource, AttemptKind, FetchOutcome};
use crate::cache::ArtifactCache;
use crate::catalog::{CatalogClient, ProjectInfo, RateLimiter, VersionRecord};
use crate::manifest::ArtifactReference;
use crate::transport::Transport;
use crate::verify::{self, ChecksumAlgorithm};

/// Fetches and verifies single artifacts into the shared cache.
pub struct ArtifactFetcher {
    catalog: Arc<dyn CatalogClient>,
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    cache: ArtifactCache,
}

impl ArtifactFetcher {
    /// Create a fetcher over shared collaborators.
    ///
    /// `limiter` should be the same instance the catalog client takes its
    /// tickets from; the fetcher only draws start-up jitter from it.
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        cache: ArtifactCache,
    ) -> Self {
        Self {
            catalog,
            transport,
            limiter,
            cache,
        }
    }

    /// The cache this fetcher writes into.
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Resolve one reference.
    pub fn fetch(&self, reference: ArtifactReference, attempt: AttemptKind) -> FetchOutcome {
        let jitter = self.limiter.jitter();
        if !jitter.is_zero() {
            thread::sleep(jitter);
        }

        let project = match self.catalog.lookup_project(reference.project_id) {
            Ok(project) => project,
            Err(e) if e.is_unavailable() => {
                debug!(%reference, error = %e, "Catalog unavailable");
                return FetchOutcome::Transient {
                    reference,
                    reason: e.to_string(),
                };
            }
            Err(e) => return Self::unexpected(reference, attempt, None, None, e.to_string()),
        };

        let matches = project.versions_matching(reference.file_id);
        if matches.len() != 1 {
            let reason = format!(
                "{} catalog versions match fileID {}",
                matches.len(),
                reference.file_id
            );
            return Self::unexpected(reference, attempt, Some(project), None, reason);
        }
        let record = matches[0].clone();

        let Some(file_name) = record.file_name().map(str::to_string) else {
            let reason = format!("catalog publishes no file name for fileID {}", record.id);
            return Self::unexpected(reference, attempt, Some(project), Some(record), reason);
        };

        if ChecksumAlgorithm::detect(&record.sha1).is_none() {
            let reason = format!("catalog publishes no usable checksum for {}", file_name);
            return Self::unexpected(reference, attempt, Some(project), Some(record), reason);
        }

        let path = self.cache.path_for(&file_name);
        if verify::verify_record(&path, &record) {
            debug!(%reference, path = %path.display(), "Cache hit");
            return FetchOutcome::Ready {
                reference,
                path,
                kind: ArtifactKind::ModJar,
                source: ArtifactSource::Cache,
            };
        }

        let Some(url) = record.download_url().map(str::to_string) else {
            let reason = format!("catalog publishes no download URL for {}", file_name);
            return Self::unexpected(reference, attempt, Some(project), Some(record), reason);
        };

        debug!(%reference, url = %url, path = %path.display(), "Downloading");
        match self.transport.download(&url, &path) {
            Ok(bytes) => debug!(%reference, bytes, "Download complete"),
            Err(e) if e.is_local() => {
                remove_partial(&path);
                let reason = e.to_string();
                return Self::unexpected(reference, attempt, Some(project), Some(record), reason);
            }
            Err(e) => {
                remove_partial(&path);
                warn!(%reference, error = %e, "Download failed, will retry");
                return FetchOutcome::Transient {
                    reference,
                    reason: e.to_string(),
                };
            }
        }

        if !verify::verify_record(&path, &record) {
            remove_partial(&path);
            warn!(%reference, file = %file_name, "Checksum mismatch after download, will retry");
            return FetchOutcome::Transient {
                reference,
                reason: format!("checksum mismatch for {}", file_name),
            };
        }

        FetchOutcome::Ready {
            reference,
            path,
            kind: ArtifactKind::ModJar,
            source: ArtifactSource::Download,
        }
    }

    /// Forgive an anomaly on the first attempt; on a retry treat it as a
    /// distribution restriction.
    fn unexpected(
        reference: ArtifactReference,
        attempt: AttemptKind,
        project: Option<ProjectInfo>,
        record: Option<VersionRecord>,
        reason: String,
    ) -> FetchOutcome {
        match attempt {
            AttemptKind::First => {
                debug!(%reference, %reason, "Unexpected result on first attempt, will retry");
                FetchOutcome::Transient { reference, reason }
            }
            AttemptKind::Retry => {
                warn!(%reference, %reason, "Treating artifact as distribution-restricted");
                FetchOutcome::DistributionRestricted {
                    reference,
                    project,
                    record,
                    reason,
                }
            }
        }
    }
}

fn remove_partial(path: &std::path::Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove bad file");
        }
    }
}
