//! Configuration.
//!
//! [`AcquireConfig`] is what the engine consumes; [`ConfigFile`] is the
//! user-editable INI file it is usually built from.

mod acquire;
mod file;

pub use acquire::{AcquireConfig, DEFAULT_CONCURRENCY};
pub use file::{
    config_path, default_cache_dir, expand_tilde, CacheSettings, CatalogSettings, ConfigFile,
    ConfigFileError, DownloadSettings, ManualSettings,
};
