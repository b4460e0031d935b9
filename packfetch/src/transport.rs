//! Shared HTTP session abstraction.
//!
//! All catalog lookups and artifact downloads go through one [`Transport`].
//! The real implementation wraps a single `reqwest` blocking client so that
//! every worker reuses the same connection pool. Timeouts are passed per
//! request and never stored on the shared client.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

/// Default timeout for artifact downloads in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for streaming downloads to disk (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Errors surfaced by a [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a non-success status.
    #[error("GET {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Connection, protocol or body read failure.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// Writing the response body to disk failed.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Whether the error came from the local filesystem rather than the network.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// HTTP operations used by the engine.
///
/// Implementations must be safe to share between all pool workers.
pub trait Transport: Send + Sync {
    /// GET `url` and return the body, giving up after `timeout`.
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// GET `url` and stream the body verbatim into `dest`.
    ///
    /// Returns the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError>;
}

/// [`Transport`] backed by one shared `reqwest` blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    download_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with the default download timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_download_timeout(Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS))
    }

    /// Create a transport with a custom download timeout.
    pub fn with_download_timeout(download_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("packfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            download_timeout,
        })
    }

    /// Timeout applied to each artifact download.
    pub fn download_timeout(&self) -> Duration {
        self.download_timeout
    }

    fn map_send_error(url: &str, timeout: Duration, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| Self::map_send_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| Self::map_send_error(url, timeout, e))
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        let mut response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .map_err(|e| Self::map_send_error(url, self.download_timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| TransportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(dest).map_err(|source| TransportError::Io {
            path: dest.to_path_buf(),
            source,
        })?;

        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut written = 0u64;

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| TransportError::Request {
                    url: url.to_string(),
                    reason: format!("read error: {}", e),
                })?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|source| TransportError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
            written += bytes_read as u64;
        }

        writer.flush().map_err(|source| TransportError::Io {
            path: dest.to_path_buf(),
            source,
        })?;

        Ok(written)
    }
}
