//! Shared request-rate limiter.
//!
//! Every catalog request takes a ticket from one [`RateLimiter`] shared by all
//! pool workers. Tickets are handed out on a fixed spacing of
//! `1 / requests_per_second`, so the global request rate stays under the
//! ceiling regardless of how many workers are running.
//!
//! # Example
//!
//! ```
//! use packfetch::catalog::RateLimiter;
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new(4.0);
//! assert_eq!(limiter.spacing(), Duration::from_millis(250));
//! ```

use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;

/// Default ceiling on catalog requests per second across all workers.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 6.0;

/// Longest spacing a limiter will use, however low the rate.
pub const MAX_SPACING: Duration = Duration::from_secs(24 * 60 * 60);

/// Ticket-based limiter enforcing a minimum spacing between requests.
#[derive(Debug)]
pub struct RateLimiter {
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND)
    }
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` requests.
    ///
    /// Zero, negative or non-finite rates disable limiting. Rates below one
    /// request per [`MAX_SPACING`] are clamped to it.
    pub fn new(requests_per_second: f64) -> Self {
        let spacing = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / requests_per_second)
                .map_or(MAX_SPACING, |spacing| spacing.min(MAX_SPACING))
        } else {
            Duration::ZERO
        };
        Self {
            spacing,
            next_slot: Mutex::new(None),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(0.0)
    }

    /// Minimum spacing between two tickets.
    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Whether this limiter ever delays a request.
    pub fn is_limited(&self) -> bool {
        !self.spacing.is_zero()
    }

    /// Reserve the next free slot as seen at `now`.
    ///
    /// Returns how long the caller has to wait before its slot starts.
    pub fn reserve_at(&self, now: Instant) -> Duration {
        if !self.is_limited() {
            return Duration::ZERO;
        }

        let mut next = self.next_slot.lock();
        let slot = match *next {
            Some(free) if free > now => free,
            _ => now,
        };
        *next = Some(slot + self.spacing);
        slot - now
    }

    /// Block until a ticket is available.
    pub fn acquire(&self) {
        let wait = self.reserve_at(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }

    /// Random delay in `[0, spacing)` used to desynchronize workers that
    /// start at the same time.
    pub fn jitter(&self) -> Duration {
        if !self.is_limited() {
            return Duration::ZERO;
        }
        let nanos = self.spacing.as_nanos() as u64;
        Duration::from_nanos(rand::rng().random_range(0..nanos))
    }
}
