//! Retry wave policy.
//!
//! Controls how long the orchestrator waits between waves and whether the
//! number of retry waves is capped.
//!
//! # Example
//!
//! ```
//! use packfetch::acquire::{Backoff, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::unbounded().with_max_retry_waves(Some(3));
//! assert_eq!(policy.delay_before_retry(1), Some(Duration::from_secs(2)));
//! assert_eq!(policy.delay_before_retry(4), None);
//! ```

use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default pause between retry waves (2 seconds).
pub const DEFAULT_RETRY_BACKOFF_SECS: u64 = 2;

/// Default cap for exponential backoff (60 seconds).
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 60;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Delay applied before each retry wave.
#[derive(Clone, Debug, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry wave.
    Fixed(Duration),

    /// Delay grows by `multiplier` per wave, capped at `max`.
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: f64,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS))
    }
}

impl Backoff {
    /// Exponential backoff starting at `initial` with default cap and multiplier.
    pub fn exponential(initial: Duration) -> Self {
        Self::Exponential {
            initial,
            max: Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Delay before retry wave `retry_wave` (1-based).
    pub fn delay(&self, retry_wave: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let exponent = retry_wave.saturating_sub(1).min(i32::MAX as u32) as i32;
                let factor = multiplier.powi(exponent);
                let delay_ms = (initial.as_millis() as f64 * factor).min(max.as_millis() as f64);
                Duration::from_millis(delay_ms as u64).min(*max)
            }
        }
    }
}

/// How transient failures are retried across waves.
///
/// The default retries until nothing is transient, pausing a fixed two
/// seconds between waves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetryPolicy {
    max_retry_waves: Option<u32>,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Retry forever with the default fixed backoff.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Cap the number of retry waves. `None` removes the cap.
    pub fn with_max_retry_waves(mut self, max: Option<u32>) -> Self {
        self.max_retry_waves = max;
        self
    }

    /// Replace the backoff between waves.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// The retry wave cap, if any.
    pub fn max_retry_waves(&self) -> Option<u32> {
        self.max_retry_waves
    }

    /// The configured backoff.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Whether the number of retry waves is capped.
    pub fn is_bounded(&self) -> bool {
        self.max_retry_waves.is_some()
    }

    /// Delay to wait before retry wave `retry_wave` (1 is the first retry),
    /// or `None` when the cap forbids that wave.
    pub fn delay_before_retry(&self, retry_wave: u32) -> Option<Duration> {
        match self.max_retry_waves {
            Some(max) if retry_wave > max => None,
            _ => Some(self.backoff.delay(retry_wave)),
        }
    }
}
