//! Manual download report and README.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ManualDownloadEntry, ReconcileError};

/// README written next to the artifacts awaiting manual download.
pub const README_FILE_NAME: &str = "MANUAL-DOWNLOAD-README.txt";

/// Render the list of files to download by hand.
pub fn render_report<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = &'a ManualDownloadEntry>,
{
    let entries: Vec<&ManualDownloadEntry> = entries.into_iter().collect();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} file(s) could not be downloaded automatically because their authors",
        entries.len()
    );
    let _ = writeln!(out, "disabled third-party distribution. Download each one from the page");
    let _ = writeln!(out, "below. Files marked \"Save to\" are picked up from your downloads");
    let _ = writeln!(out, "directory, or you can move them to the path shown. Files marked");
    let _ = writeln!(out, "\"Save as\" have no published file name: save or rename the download");
    let _ = writeln!(out, "to exactly the path shown.");

    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}. {} ({})", i + 1, entry.file_name, entry.reference);
        let _ = writeln!(out, "   Download: {}", entry.url);
        if entry.has_catalog_name() {
            let _ = writeln!(out, "   Save to:  {}", entry.target.display());
        } else {
            let _ = writeln!(out, "   Save as:  {}", entry.target.display());
        }
    }
    out
}

/// Write [`README_FILE_NAME`] into `dir` and return its path.
pub fn write_manual_readme<'a, I>(dir: &Path, entries: I) -> Result<PathBuf, ReconcileError>
where
    I: IntoIterator<Item = &'a ManualDownloadEntry>,
{
    fs::create_dir_all(dir).map_err(|source| ReconcileError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(README_FILE_NAME);
    fs::write(&path, render_report(entries)).map_err(|source| ReconcileError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
