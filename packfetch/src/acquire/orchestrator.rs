//! Wave-based acquisition orchestrator.
//!
//! All references are fetched in one wave on a bounded worker pool; the
//! orchestrator waits for the whole wave, partitions the outcomes and runs
//! another wave over exactly the transient failures until none remain (or
//! the retry ceiling is reached).

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{info, warn};

use super::fetcher::ArtifactFetcher;
use super::outcome::{AttemptKind, FetchOutcome};
use super::policy::RetryPolicy;
use super::progress::{ProgressEvent, ProgressObserver};
use super::report::AcquisitionReport;
use crate::cache::ArtifactCache;
use crate::catalog::{CatalogClient, HttpCatalogClient, RateLimiter};
use crate::config::AcquireConfig;
use crate::error::{AcquireError, AcquireResult};
use crate::manifest::ArtifactReference;
use crate::transport::{ReqwestTransport, Transport};

/// Runs fetch waves over a fixed-size worker pool.
pub struct AcquisitionOrchestrator {
    fetcher: ArtifactFetcher,
    concurrency: usize,
    retry: RetryPolicy,
    observer: Option<ProgressObserver>,
}

impl AcquisitionOrchestrator {
    /// Create an orchestrator around a fetcher.
    pub fn new(fetcher: ArtifactFetcher, concurrency: usize, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
            retry,
            observer: None,
        }
    }

    /// Build the full engine from configuration with a real HTTP session.
    pub fn from_config(config: &AcquireConfig) -> AcquireResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(
            ReqwestTransport::with_download_timeout(config.download_timeout)
                .map_err(AcquireError::Session)?,
        );
        Ok(Self::with_transport(config, transport))
    }

    /// Build the engine over an injected transport, with the HTTP catalog
    /// client on top of it.
    pub fn with_transport(config: &AcquireConfig, transport: Arc<dyn Transport>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.requests_per_second));
        let catalog: Arc<dyn CatalogClient> = Arc::new(HttpCatalogClient::new(
            Arc::clone(&transport),
            Arc::clone(&limiter),
            config.catalog_base_url.clone(),
            config.timeouts.clone(),
        ));
        Self::with_collaborators(config, catalog, transport, limiter)
    }

    /// Build the engine over injected collaborators.
    pub fn with_collaborators(
        config: &AcquireConfig,
        catalog: Arc<dyn CatalogClient>,
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let fetcher = ArtifactFetcher::new(
            catalog,
            transport,
            limiter,
            ArtifactCache::new(&config.cache_dir),
        );
        Self::new(fetcher, config.concurrency, config.retry.clone())
    }

    /// Publish progress events to `observer`.
    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Number of pool workers.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The cache artifacts are written to.
    pub fn cache(&self) -> &ArtifactCache {
        self.fetcher.cache()
    }

    /// Acquire every reference.
    ///
    /// Per-artifact failures end up in the report; only a cache directory
    /// that cannot be created or a pool that cannot start is an error.
    pub fn acquire_all(
        &self,
        references: &[ArtifactReference],
    ) -> AcquireResult<AcquisitionReport> {
        let cache = self.fetcher.cache();
        cache.ensure_dir().map_err(|source| AcquireError::LocalIo {
            path: cache.root().to_path_buf(),
            source,
        })?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("packfetch-worker-{}", i))
            .build()
            .map_err(|e| AcquireError::WorkerPool(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut pending: Vec<ArtifactReference> = references
            .iter()
            .copied()
            .filter(|r| seen.insert(*r))
            .collect();
        if pending.len() < references.len() {
            info!(
                duplicates = references.len() - pending.len(),
                "Ignoring duplicate manifest entries"
            );
        }

        let mut report = AcquisitionReport::default();
        let mut attempt = AttemptKind::First;
        let mut wave: u32 = 0;

        while !pending.is_empty() {
            if wave > 0 {
                match self.retry.delay_before_retry(wave) {
                    Some(delay) => {
                        info!(
                            wave = wave + 1,
                            retrying = pending.len(),
                            delay_ms = delay.as_millis() as u64,
                            "Backing off before retry wave"
                        );
                        if !delay.is_zero() {
                            thread::sleep(delay);
                        }
                    }
                    None => {
                        warn!(
                            unresolved = pending.len(),
                            waves = wave,
                            "Retry ceiling reached, giving up on remaining artifacts"
                        );
                        report.unresolved = pending;
                        break;
                    }
                }
            }

            wave += 1;
            report.stats.waves = wave;
            info!(wave, %attempt, artifacts = pending.len(), "Starting wave");
            self.emit(ProgressEvent::WaveStarted {
                wave,
                attempt,
                artifacts: pending.len(),
            });

            let outcomes = self.run_wave(&pool, &pending, attempt, wave);
            pending = report.absorb(outcomes, cache);

            info!(
                wave,
                ready = report.ready.len(),
                manual = report.manual.len(),
                retry = pending.len(),
                "Wave finished"
            );
            self.emit(ProgressEvent::WaveFinished {
                wave,
                retries: pending.len(),
            });
            attempt = AttemptKind::Retry;
        }

        info!(
            waves = report.stats.waves,
            downloads = report.stats.downloads,
            cache_hits = report.stats.cache_hits,
            manual = report.manual.len(),
            unresolved = report.unresolved.len(),
            "Acquisition complete"
        );
        Ok(report)
    }

    /// Fetch `references` concurrently and wait for all of them.
    fn run_wave(
        &self,
        pool: &ThreadPool,
        references: &[ArtifactReference],
        attempt: AttemptKind,
        wave: u32,
    ) -> Vec<FetchOutcome> {
        pool.install(|| {
            references
                .par_iter()
                .map(|reference| {
                    let outcome = self.fetcher.fetch(*reference, attempt);
                    self.emit(ProgressEvent::ArtifactFinished {
                        wave,
                        reference: *reference,
                        label: outcome.label(),
                    });
                    outcome
                })
                .collect()
        })
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::{ArtifactStatus, Backoff};
    use crate::catalog::{LookupError, MockCatalog, ProjectInfo, VersionRecord, WebLinks};
    use crate::transport::tests::MockTransport;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

    fn project(pid: u64, fid: u64) -> ProjectInfo {
        ProjectInfo {
            id: pid,
            name: format!("Project {}", pid),
            versions: vec![VersionRecord {
                id: fid,
                name: format!("mod-{}.jar", pid),
                url: Some(format!("https://cdn.test/{}.jar", pid)),
                size: 11,
                sha1: HELLO_SHA1.to_string(),
                links: WebLinks::default(),
            }],
            links: WebLinks::default(),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::unbounded().with_backoff(Backoff::Fixed(Duration::ZERO))
    }

    fn orchestrator(
        temp: &TempDir,
        catalog: MockCatalog,
        transport: Arc<MockTransport>,
        retry: RetryPolicy,
    ) -> AcquisitionOrchestrator {
        let config = AcquireConfig::new(temp.path().join("cache"))
            .with_concurrency(3)
            .with_retry(retry);
        AcquisitionOrchestrator::with_collaborators(
            &config,
            Arc::new(catalog),
            transport,
            Arc::new(RateLimiter::unlimited()),
        )
    }

    fn transport_for(pids: &[u64]) -> Arc<MockTransport> {
        let transport = MockTransport::default();
        for pid in pids {
            transport
                .bodies
                .lock()
                .insert(format!("https://cdn.test/{}.jar", pid), b"hello world".to_vec());
        }
        Arc::new(transport)
    }

    #[test]
    fn test_creates_cache_dir() {
        let temp = TempDir::new().unwrap();
        let orch = orchestrator(&temp, MockCatalog::default(), transport_for(&[]), fast_retry());

        let report = orch.acquire_all(&[]).unwrap();

        assert!(temp.path().join("cache").is_dir());
        assert!(report.ready.is_empty());
        assert_eq!(report.stats.waves, 0);
    }

    #[test]
    fn test_single_wave_success() {
        let temp = TempDir::new().unwrap();
        let catalog = MockCatalog::default()
            .respond(1, vec![Ok(project(1, 10))])
            .respond(2, vec![Ok(project(2, 20))]);
        let orch = orchestrator(&temp, catalog, transport_for(&[1, 2]), fast_retry());

        let report = orch
            .acquire_all(&[ArtifactReference::new(1, 10), ArtifactReference::new(2, 20)])
            .unwrap();

        assert_eq!(report.ready.len(), 2);
        assert_eq!(report.stats.waves, 1);
        assert_eq!(report.stats.downloads, 2);
        assert!(report.is_complete());
    }

    #[test]
    fn test_duplicates_fetched_once() {
        let temp = TempDir::new().unwrap();
        let transport = transport_for(&[1]);
        let catalog = MockCatalog::default().respond(1, vec![Ok(project(1, 10))]);
        let orch = orchestrator(&temp, catalog, Arc::clone(&transport), fast_retry());

        let reference = ArtifactReference::new(1, 10);
        let report = orch.acquire_all(&[reference, reference]).unwrap();

        assert_eq!(report.ready.len(), 1);
        assert_eq!(transport.download_count(), 1);
    }

    #[test]
    fn test_transient_then_success_converges() {
        let temp = TempDir::new().unwrap();
        let catalog = MockCatalog::default().respond(
            1,
            vec![
                Err(LookupError::Timeout {
                    project_id: 1,
                    attempts: 6,
                }),
                Err(LookupError::Transport {
                    project_id: 1,
                    reason: "reset".to_string(),
                }),
                Ok(project(1, 10)),
            ],
        );
        let orch = orchestrator(&temp, catalog, transport_for(&[1]), fast_retry());

        let report = orch.acquire_all(&[ArtifactReference::new(1, 10)]).unwrap();

        assert_eq!(report.stats.waves, 3);
        assert_eq!(report.stats.transient_failures, 2);
        assert_eq!(report.verified().count(), 1);
    }

    #[test]
    fn test_retry_ceiling_leaves_unresolved() {
        let temp = TempDir::new().unwrap();
        let catalog = MockCatalog::default().respond(
            1,
            vec![Err(LookupError::Timeout {
                project_id: 1,
                attempts: 6,
            })],
        );
        let retry = fast_retry().with_max_retry_waves(Some(2));
        let orch = orchestrator(&temp, catalog, transport_for(&[]), retry);

        let report = orch.acquire_all(&[ArtifactReference::new(1, 10)]).unwrap();

        assert_eq!(report.stats.waves, 3);
        assert_eq!(report.unresolved, vec![ArtifactReference::new(1, 10)]);
        assert!(report.ready.is_empty());
        assert!(!report.is_complete());
    }

    #[test]
    fn test_restricted_gets_placeholder_and_manual_entry() {
        let temp = TempDir::new().unwrap();
        // fileID 99 is not among the published versions
        let catalog = MockCatalog::default().respond(1, vec![Ok(project(1, 10))]);
        let orch = orchestrator(&temp, catalog, transport_for(&[1]), fast_retry());

        let report = orch.acquire_all(&[ArtifactReference::new(1, 99)]).unwrap();

        assert_eq!(report.stats.waves, 2);
        assert_eq!(report.manual.len(), 1);
        assert!(report.manual[0].url.ends_with("/download/99"));
        assert_eq!(report.ready.len(), 1);
        assert_eq!(report.ready[0].status, ArtifactStatus::PendingManual);
    }

    #[test]
    fn test_observer_sees_waves() {
        let temp = TempDir::new().unwrap();
        let catalog = MockCatalog::default().respond(1, vec![Ok(project(1, 10))]);
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let orch = orchestrator(&temp, catalog, transport_for(&[1]), fast_retry())
            .with_observer(Arc::new(move |e: &ProgressEvent| sink.lock().push(e.clone())));

        orch.acquire_all(&[ArtifactReference::new(1, 10)]).unwrap();

        let events = events.lock();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ProgressEvent::WaveStarted { wave: 1, artifacts: 1, .. }));
        assert!(matches!(events[1], ProgressEvent::ArtifactFinished { label: "ready", .. }));
        assert!(matches!(events[2], ProgressEvent::WaveFinished { wave: 1, retries: 0 }));
    }

    #[test]
    fn test_unwritable_cache_dir_is_fatal() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("cache");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let orch = orchestrator(&temp, MockCatalog::default(), transport_for(&[]), fast_retry());

        let result = orch.acquire_all(&[ArtifactReference::new(1, 10)]);

        assert!(matches!(result, Err(AcquireError::LocalIo { .. })));
    }
}
