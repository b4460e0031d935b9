//! Shared on-disk artifact cache.
//!
//! The cache is a flat directory keyed by artifact file name. It persists
//! across runs; entries are only trusted after verification against the
//! current catalog record.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Flat artifact cache rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCache {
    root: PathBuf,
}

/// File count and total size of a cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub files: usize,
    pub bytes: u64,
}

impl ArtifactCache {
    /// Create a cache rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic path for an artifact name.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(sanitize_file_name(name))
    }

    /// Create the cache directory if it does not exist.
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Count files and bytes in the cache. A missing directory is empty.
    pub fn stats(&self) -> io::Result<CacheStats> {
        let mut stats = CacheStats::default();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let metadata = entry?.metadata()?;
            if metadata.is_file() {
                stats.files += 1;
                stats.bytes += metadata.len();
            }
        }
        Ok(stats)
    }

    /// Delete every cached file and report what was removed.
    pub fn clear(&self) -> io::Result<CacheStats> {
        let mut removed = CacheStats::default();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(removed),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                fs::remove_file(entry.path())?;
                removed.files += 1;
                removed.bytes += metadata.len();
            }
        }
        Ok(removed)
    }
}

/// Reduce a catalog-supplied name to a single safe path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Format a byte count for display (e.g. "1.5 MB").
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
