//! Catalog client with timeout escalation.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::rate_limit::RateLimiter;
use super::types::ProjectInfo;
use crate::transport::{Transport, TransportError};

/// Default catalog API base URL.
pub const DEFAULT_CATALOG_URL: &str = "https://api.modpacks.ch/public";

/// Default short timeout tiers, in seconds, tried in order.
pub const DEFAULT_TIMEOUT_TIERS_SECS: [u64; 5] = [4, 5, 10, 20, 30];

/// Default final long timeout in seconds.
pub const DEFAULT_LONG_TIMEOUT_SECS: u64 = 120;

/// Why a project lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The catalog does not know the project.
    #[error("project {project_id} not found in catalog")]
    NotFound { project_id: u64 },

    /// Every timeout tier expired without a response.
    #[error("project {project_id} lookup timed out after {attempts} attempts")]
    Timeout { project_id: u64, attempts: usize },

    /// Connection or HTTP failure other than a timeout.
    #[error("project {project_id} lookup failed: {reason}")]
    Transport { project_id: u64, reason: String },

    /// The response body was not a valid project document.
    #[error("project {project_id} response could not be parsed: {reason}")]
    Parse { project_id: u64, reason: String },
}

impl LookupError {
    /// Whether the failure means "no response", as opposed to a response
    /// that made no sense.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }
}

/// Escalating timeout schedule for metadata lookups.
///
/// Short tiers keep the common case responsive; the final long timeout
/// tolerates a slow but alive server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutSchedule {
    tiers: Vec<Duration>,
    long: Duration,
}

impl Default for TimeoutSchedule {
    fn default() -> Self {
        Self::new(
            DEFAULT_TIMEOUT_TIERS_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            Duration::from_secs(DEFAULT_LONG_TIMEOUT_SECS),
        )
    }
}

impl TimeoutSchedule {
    /// Create a schedule from short tiers and the final long timeout.
    pub fn new(tiers: Vec<Duration>, long: Duration) -> Self {
        Self { tiers, long }
    }

    /// Short tiers in order.
    pub fn tiers(&self) -> &[Duration] {
        &self.tiers
    }

    /// The final long timeout.
    pub fn long(&self) -> Duration {
        self.long
    }

    /// Every timeout to try, short tiers first, long timeout last.
    pub fn attempts(&self) -> impl Iterator<Item = Duration> + '_ {
        self.tiers.iter().copied().chain(std::iter::once(self.long))
    }

    /// Total number of attempts.
    pub fn len(&self) -> usize {
        self.tiers.len() + 1
    }

    /// Always false; a schedule has at least the long timeout.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Metadata lookups against the remote catalog.
pub trait CatalogClient: Send + Sync {
    /// Fetch project info, including its full version list.
    fn lookup_project(&self, project_id: u64) -> Result<ProjectInfo, LookupError>;
}

/// [`CatalogClient`] speaking the modpacks.ch JSON API over a shared transport.
pub struct HttpCatalogClient {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    base_url: String,
    schedule: TimeoutSchedule,
}

impl HttpCatalogClient {
    /// Create a client.
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        base_url: impl Into<String>,
        schedule: TimeoutSchedule,
    ) -> Self {
        Self {
            transport,
            limiter,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            schedule,
        }
    }

    /// URL of a project document.
    pub fn project_url(&self, project_id: u64) -> String {
        format!("{}/mod/{}", self.base_url, project_id)
    }

    fn parse(project_id: u64, body: &[u8]) -> Result<ProjectInfo, LookupError> {
        serde_json::from_slice(body).map_err(|e| LookupError::Parse {
            project_id,
            reason: e.to_string(),
        })
    }
}

impl CatalogClient for HttpCatalogClient {
    fn lookup_project(&self, project_id: u64) -> Result<ProjectInfo, LookupError> {
        let url = self.project_url(project_id);
        let total = self.schedule.len();

        for (index, timeout) in self.schedule.attempts().enumerate() {
            let tier = index + 1;
            self.limiter.acquire();
            debug!(
                project_id,
                tier,
                of = total,
                timeout_secs = timeout.as_secs_f64(),
                url = %url,
                "GET (json)"
            );

            match self.transport.get(&url, timeout) {
                Ok(body) => return Self::parse(project_id, &body),
                Err(TransportError::Timeout { .. }) => {
                    debug!(project_id, tier, "Catalog lookup timed out, escalating");
                }
                Err(TransportError::Status { status: 404, .. }) => {
                    return Err(LookupError::NotFound { project_id });
                }
                Err(e) => {
                    return Err(LookupError::Transport {
                        project_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        warn!(project_id, attempts = total, url = %url, "Catalog lookup timed out on every tier");
        Err(LookupError::Timeout {
            project_id,
            attempts: total,
        })
    }
}
