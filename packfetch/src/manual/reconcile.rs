//! Scan, match and place manually downloaded files.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{ManualDownloadEntry, ReconcileError};
use crate::verify;

/// A downloaded file matched to the entry it satisfies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileMatch<'a> {
    pub entry: &'a ManualDownloadEntry,
    pub source: PathBuf,
}

/// Entries whose target file does not exist yet.
pub fn outstanding(entries: &[ManualDownloadEntry]) -> Vec<&ManualDownloadEntry> {
    entries.iter().filter(|e| !e.is_present()).collect()
}

/// Names a browser may have saved `file_name` under.
///
/// Some browsers replace spaces with `+` when saving.
pub fn candidate_names(file_name: &str) -> Vec<String> {
    let mut names = vec![file_name.to_string()];
    let plus = file_name.replace(' ', "+");
    if plus != file_name {
        names.push(plus);
    }
    names
}

/// Look for the files of `pending` in `dir`.
///
/// Each target is matched at most once, even when several entries share a
/// file name.
pub fn scan_directory<'a>(
    dir: &Path,
    pending: &[&'a ManualDownloadEntry],
) -> Result<Vec<ReconcileMatch<'a>>, ReconcileError> {
    let read_err = |source: io::Error| ReconcileError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files: HashMap<String, PathBuf> = HashMap::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            files.insert(name.to_string(), entry.path());
        }
    }

    let mut claimed: HashSet<&Path> = HashSet::new();
    let mut matches = Vec::new();
    for entry in pending.iter().copied() {
        if claimed.contains(entry.target.as_path()) {
            continue;
        }
        let found = candidate_names(&entry.file_name)
            .into_iter()
            .find_map(|name| files.get(&name).cloned());
        if let Some(source) = found {
            claimed.insert(entry.target.as_path());
            matches.push(ReconcileMatch { entry, source });
        }
    }
    Ok(matches)
}

/// Outcome of placing a batch of matches.
#[derive(Debug, Default)]
pub struct Placement<'a> {
    /// Entries whose file now sits at its target.
    pub placed: Vec<&'a ManualDownloadEntry>,
    /// Entries that could not be placed, with the reason.
    pub failed: Vec<(&'a ManualDownloadEntry, ReconcileError)>,
}

/// Move every matched file to its target.
///
/// Targets are never overwritten. A failure affects only its own entry; the
/// rest of the batch is still placed. Files whose catalog record is known
/// are verified after placement; a mismatch is logged and the file kept.
pub fn place<'a>(matches: &[ReconcileMatch<'a>]) -> Placement<'a> {
    let mut placement = Placement::default();

    for m in matches {
        match place_one(m) {
            Ok(()) => placement.placed.push(m.entry),
            Err(e) => {
                warn!(
                    reference = %m.entry.reference,
                    error = %e,
                    "Could not place manual download"
                );
                placement.failed.push((m.entry, e));
            }
        }
    }
    placement
}

fn place_one(m: &ReconcileMatch<'_>) -> Result<(), ReconcileError> {
    let target = &m.entry.target;
    if target.exists() {
        return Err(ReconcileError::Collision {
            target: target.clone(),
        });
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| ReconcileError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    move_file(&m.source, target).map_err(|source| ReconcileError::Io {
        path: target.clone(),
        source,
    })?;
    info!(
        reference = %m.entry.reference,
        from = %m.source.display(),
        to = %target.display(),
        "Placed manual download"
    );

    if let Some(record) = &m.entry.expected {
        if !verify::verify_record(target, record) {
            warn!(
                reference = %m.entry.reference,
                file = %m.entry.file_name,
                "Manually downloaded file does not match the catalog checksum"
            );
        }
    }
    Ok(())
}

fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    fs::copy(source, target)?;
    fs::remove_file(source)
}
