//! Remote catalog access.
//!
//! This module provides rate-limited metadata lookups against the mod catalog:
//! - Response types for projects and file versions (`types`)
//! - The [`CatalogClient`] trait and its HTTP implementation (`client`)
//! - A shared ticket [`RateLimiter`] (`rate_limit`)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use packfetch::catalog::{
//!     HttpCatalogClient, RateLimiter, TimeoutSchedule, DEFAULT_CATALOG_URL,
//! };
//! use packfetch::transport::ReqwestTransport;
//!
//! let transport = Arc::new(ReqwestTransport::new()?);
//! let limiter = Arc::new(RateLimiter::new(6.0));
//! let schedule = TimeoutSchedule::default();
//! let client = HttpCatalogClient::new(transport, limiter, DEFAULT_CATALOG_URL, schedule);
//! let project = client.lookup_project(238222)?;
//! ```

mod client;
mod rate_limit;
mod types;

pub use client::{
    CatalogClient, HttpCatalogClient, LookupError, TimeoutSchedule, DEFAULT_CATALOG_URL,
    DEFAULT_LONG_TIMEOUT_SECS, DEFAULT_TIMEOUT_TIERS_SECS,
};
pub use rate_limit::{RateLimiter, DEFAULT_REQUESTS_PER_SECOND};
pub use types::{manual_download_url, ProjectInfo, VersionRecord, WebLink, WebLinks};

#[cfg(test)]
pub use client::tests::MockCatalog;
