//! INI configuration file.
//!
//! Lives at `<config_dir>/packfetch/config.ini`. Every key is optional;
//! missing keys keep their defaults and unknown keys are ignored.
//!
//! ```ini
//! [catalog]
//! base_url = https://api.modpacks.ch/public
//! requests_per_second = 6
//! timeout_tiers = 4, 5, 10, 20, 30
//! long_timeout = 120
//!
//! [download]
//! concurrency = 6
//! timeout = 300
//! retry_backoff = 2
//! max_retry_waves = unbounded
//!
//! [cache]
//! directory = ~/.cache/packfetch/artifacts
//!
//! [manual]
//! mode = interactive
//! downloads_dir = ~/Downloads
//! poll_interval = 5
//! poll_timeout = 1800
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::acquire::{AcquireConfig, DEFAULT_CONCURRENCY};
use crate::acquire::{Backoff, RetryPolicy, DEFAULT_RETRY_BACKOFF_SECS};
use crate::catalog::{
    TimeoutSchedule, DEFAULT_CATALOG_URL, DEFAULT_LONG_TIMEOUT_SECS, DEFAULT_REQUESTS_PER_SECOND,
    DEFAULT_TIMEOUT_TIERS_SECS,
};
use crate::manual::{
    ManualMode, ReconcilePolicy, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS,
};
use crate::transport::DEFAULT_DOWNLOAD_TIMEOUT_SECS;

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file exists but could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid INI.
    #[error("failed to parse config file {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// A key has a value of the wrong shape.
    #[error("invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// The file or its directory could not be written.
    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `[catalog]` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSettings {
    pub base_url: String,
    pub requests_per_second: f64,
    /// Short lookup timeouts in seconds.
    pub timeout_tiers: Vec<u64>,
    /// Final lookup timeout in seconds.
    pub long_timeout: u64,
}

/// `[download]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub concurrency: usize,
    /// Per-download timeout in seconds.
    pub timeout: u64,
    /// Pause between retry waves in seconds.
    pub retry_backoff: u64,
    /// `None` retries until nothing is transient.
    pub max_retry_waves: Option<u32>,
}

/// `[cache]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub directory: PathBuf,
}

/// `[manual]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualSettings {
    pub mode: ManualMode,
    /// `None` uses the platform downloads directory.
    pub downloads_dir: Option<PathBuf>,
    pub poll_interval: u64,
    pub poll_timeout: u64,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub catalog: CatalogSettings,
    pub download: DownloadSettings,
    pub cache: CacheSettings,
    pub manual: ManualSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            catalog: CatalogSettings {
                base_url: DEFAULT_CATALOG_URL.to_string(),
                requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
                timeout_tiers: DEFAULT_TIMEOUT_TIERS_SECS.to_vec(),
                long_timeout: DEFAULT_LONG_TIMEOUT_SECS,
            },
            download: DownloadSettings {
                concurrency: DEFAULT_CONCURRENCY,
                timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
                retry_backoff: DEFAULT_RETRY_BACKOFF_SECS,
                max_retry_waves: None,
            },
            cache: CacheSettings {
                directory: default_cache_dir(),
            },
            manual: ManualSettings {
                mode: ManualMode::default(),
                downloads_dir: None,
                poll_interval: DEFAULT_POLL_INTERVAL_SECS,
                poll_timeout: DEFAULT_POLL_TIMEOUT_SECS,
            },
        }
    }
}

impl ConfigFile {
    /// Load from [`config_path`]. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_path())
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigFileError::Read {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigFileError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;
        parse_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse_str(text: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigFileError::Parse {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        parse_ini(&ini)
    }

    /// Write this configuration, with comments, to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigFileError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, self.to_ini_string()).map_err(|source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render as commented INI.
    pub fn to_ini_string(&self) -> String {
        let tiers = self
            .catalog
            .timeout_tiers
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let max_waves = self
            .download
            .max_retry_waves
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unbounded".to_string());
        let downloads_dir = self
            .manual
            .downloads_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        format!(
            r#"# packfetch configuration

[catalog]
# Catalog API base URL
base_url = {base_url}
# Ceiling on catalog requests per second across all workers (0 = unlimited)
requests_per_second = {rps}
# Lookup timeouts in seconds, tried in order until one gets a response
timeout_tiers = {tiers}
# Final lookup timeout in seconds
long_timeout = {long_timeout}

[download]
# Number of parallel workers
concurrency = {concurrency}
# Per-download timeout in seconds
timeout = {timeout}
# Pause between retry waves in seconds
retry_backoff = {retry_backoff}
# Maximum retry waves, or "unbounded"
max_retry_waves = {max_waves}

[cache]
# Shared artifact cache
directory = {cache_dir}

[manual]
# interactive, poll or report
mode = {mode}
# Where manual downloads are saved (empty = platform downloads directory)
downloads_dir = {downloads_dir}
# Seconds between scans in poll mode
poll_interval = {poll_interval}
# Seconds before poll mode gives up
poll_timeout = {poll_timeout}
"#,
            base_url = self.catalog.base_url,
            rps = self.catalog.requests_per_second,
            tiers = tiers,
            long_timeout = self.catalog.long_timeout,
            concurrency = self.download.concurrency,
            timeout = self.download.timeout,
            retry_backoff = self.download.retry_backoff,
            max_waves = max_waves,
            cache_dir = self.cache.directory.display(),
            mode = self.manual.mode,
            downloads_dir = downloads_dir,
            poll_interval = self.manual.poll_interval,
            poll_timeout = self.manual.poll_timeout,
        )
    }

    /// Engine configuration derived from this file.
    pub fn to_acquire_config(&self) -> AcquireConfig {
        let timeouts = TimeoutSchedule::new(
            self.catalog
                .timeout_tiers
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            Duration::from_secs(self.catalog.long_timeout),
        );
        let retry = RetryPolicy::unbounded()
            .with_max_retry_waves(self.download.max_retry_waves)
            .with_backoff(Backoff::Fixed(Duration::from_secs(self.download.retry_backoff)));

        AcquireConfig::new(&self.cache.directory)
            .with_catalog_base_url(&self.catalog.base_url)
            .with_concurrency(self.download.concurrency)
            .with_requests_per_second(self.catalog.requests_per_second)
            .with_timeouts(timeouts)
            .with_download_timeout(Duration::from_secs(self.download.timeout))
            .with_retry(retry)
    }

    /// Manual reconciliation policy derived from this file.
    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        self.manual.mode.policy(
            Duration::from_secs(self.manual.poll_interval),
            Duration::from_secs(self.manual.poll_timeout),
        )
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_secs(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer (seconds)"))
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("catalog")) {
        if let Some(v) = section.get("base_url") {
            let v = v.trim();
            if !v.starts_with("http://") && !v.starts_with("https://") {
                return Err(invalid("catalog", "base_url", v, "must be an http(s) URL"));
            }
            config.catalog.base_url = v.to_string();
        }
        if let Some(v) = section.get("requests_per_second") {
            let rps: f64 = v.trim().parse().map_err(|_| {
                invalid("catalog", "requests_per_second", v, "must be a number")
            })?;
            if !rps.is_finite() || rps < 0.0 {
                return Err(invalid(
                    "catalog",
                    "requests_per_second",
                    v,
                    "must be zero or positive",
                ));
            }
            config.catalog.requests_per_second = rps;
        }
        if let Some(v) = section.get("timeout_tiers") {
            config.catalog.timeout_tiers = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| match s.parse::<u64>() {
                    Ok(secs) if secs > 0 => Ok(secs),
                    _ => Err(invalid(
                        "catalog",
                        "timeout_tiers",
                        v,
                        "must be a comma-separated list of positive seconds",
                    )),
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = section.get("long_timeout") {
            config.catalog.long_timeout = parse_secs("catalog", "long_timeout", v)?;
        }
    }

    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("concurrency") {
            config.download.concurrency = match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(invalid(
                        "download",
                        "concurrency",
                        v,
                        "must be a positive integer",
                    ))
                }
            };
        }
        if let Some(v) = section.get("timeout") {
            config.download.timeout = parse_secs("download", "timeout", v)?;
        }
        if let Some(v) = section.get("retry_backoff") {
            config.download.retry_backoff = parse_secs("download", "retry_backoff", v)?;
        }
        if let Some(v) = section.get("max_retry_waves") {
            let v = v.trim();
            config.download.max_retry_waves = match v.to_ascii_lowercase().as_str() {
                "" | "unbounded" | "none" => None,
                n => Some(n.parse().map_err(|_| {
                    invalid(
                        "download",
                        "max_retry_waves",
                        v,
                        "must be a non-negative integer or 'unbounded'",
                    )
                })?),
            };
        }
    }

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
    }

    if let Some(section) = ini.section(Some("manual")) {
        if let Some(v) = section.get("mode") {
            config.manual.mode = v
                .parse()
                .map_err(|reason: String| invalid("manual", "mode", v, &reason))?;
        }
        if let Some(v) = section.get("downloads_dir") {
            let v = v.trim();
            config.manual.downloads_dir = (!v.is_empty()).then(|| expand_tilde(v));
        }
        if let Some(v) = section.get("poll_interval") {
            config.manual.poll_interval = parse_secs("manual", "poll_interval", v)?;
        }
        if let Some(v) = section.get("poll_timeout") {
            config.manual.poll_timeout = parse_secs("manual", "poll_timeout", v)?;
        }
    }

    Ok(config)
}

/// Path of the configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("packfetch")
        .join("config.ini")
}

/// Default shared cache: `<cache_dir>/packfetch/artifacts`, or `.modcache`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("packfetch").join("artifacts"))
        .unwrap_or_else(|| PathBuf::from(".modcache"))
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
