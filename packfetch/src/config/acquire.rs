//! Configuration for an acquisition run.

use std::path::PathBuf;
use std::time::Duration;

use crate::acquire::RetryPolicy;
use crate::catalog::{TimeoutSchedule, DEFAULT_CATALOG_URL, DEFAULT_REQUESTS_PER_SECOND};
use crate::transport::DEFAULT_DOWNLOAD_TIMEOUT_SECS;

/// Default number of pool workers.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Configuration for an acquisition run.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquireConfig {
    /// Shared artifact cache directory.
    pub cache_dir: PathBuf,

    /// Catalog API base URL.
    pub catalog_base_url: String,

    /// Number of pool workers.
    pub concurrency: usize,

    /// Ceiling on catalog requests per second across all workers.
    ///
    /// Zero disables rate limiting.
    pub requests_per_second: f64,

    /// Timeout escalation for catalog lookups.
    pub timeouts: TimeoutSchedule,

    /// Timeout for each artifact download.
    pub download_timeout: Duration,

    /// Retry waves and backoff.
    pub retry: RetryPolicy,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".modcache"),
            catalog_base_url: DEFAULT_CATALOG_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            timeouts: TimeoutSchedule::default(),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

impl AcquireConfig {
    /// Create a configuration caching into `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    /// Set the catalog base URL.
    pub fn with_catalog_base_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_base_url = url.into();
        self
    }

    /// Set the worker count. Values below one are raised to one.
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers.max(1);
        self
    }

    /// Set the catalog request ceiling.
    pub fn with_requests_per_second(mut self, rps: f64) -> Self {
        self.requests_per_second = rps;
        self
    }

    /// Set the lookup timeout schedule.
    pub fn with_timeouts(mut self, timeouts: TimeoutSchedule) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the download timeout.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
