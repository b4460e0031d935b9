//! Manual download fallback.
//!
//! Artifacts whose publishers disabled third-party distribution end up as
//! [`ManualDownloadEntry`]s. This module turns them back into verified files:
//!
//! - `reconcile`: pure scan/match/place functions over a downloads directory
//! - `report`: the user-facing report and `MANUAL-DOWNLOAD-README.txt`
//! - `policy`: the [`Reconciler`] loop (interactive, polling or report only)

mod policy;
mod reconcile;
mod report;

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::cache::{sanitize_file_name, ArtifactCache};
use crate::catalog::{manual_download_url, ProjectInfo, VersionRecord};
use crate::manifest::ArtifactReference;

pub use policy::{
    default_downloads_dir, DownloadsPrompt, LogPrompt, ManualMode, PromptAnswer, ReconcilePolicy,
    ReconcileSummary, Reconciler, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS,
};
pub use reconcile::{
    candidate_names, outstanding, place, scan_directory, Placement, ReconcileMatch,
};
pub use report::{render_report, write_manual_readme, README_FILE_NAME};

/// Errors raised while placing manually downloaded files.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The target already exists; it is never overwritten.
    #[error("refusing to overwrite existing file {}", .target.display())]
    Collision { target: PathBuf },

    /// Moving, copying or writing a file failed.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The downloads directory could not be listed.
    #[error("failed to read directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An artifact the user has to download by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualDownloadEntry {
    pub reference: ArtifactReference,
    /// Page where the file can be downloaded.
    pub url: String,
    /// Expected file name in the downloads directory.
    pub file_name: String,
    /// Where the file must end up.
    pub target: PathBuf,
    /// Catalog record to verify against, when the catalog had one.
    pub expected: Option<VersionRecord>,
}

impl ManualDownloadEntry {
    /// Build the entry for a distribution-restricted artifact.
    ///
    /// The file name is the catalog's whenever the record carries one;
    /// otherwise it is a synthetic `{projectID}-{fileID}.jar` the user has to
    /// rename the download to.
    pub fn from_restriction(
        reference: ArtifactReference,
        project: Option<&ProjectInfo>,
        record: Option<VersionRecord>,
        cache: &ArtifactCache,
    ) -> Self {
        let file_name = record
            .as_ref()
            .and_then(VersionRecord::file_name)
            .map(sanitize_file_name)
            .unwrap_or_else(|| placeholder_name(reference));

        Self {
            reference,
            url: manual_download_url(project, reference.project_id, reference.file_id),
            target: cache.path_for(&file_name),
            file_name,
            expected: record,
        }
    }

    /// Whether `file_name` is the name the catalog publishes, and so the name
    /// a browser saves the download under.
    pub fn has_catalog_name(&self) -> bool {
        self.expected
            .as_ref()
            .and_then(VersionRecord::file_name)
            .is_some()
    }

    /// Whether the target file exists.
    pub fn is_present(&self) -> bool {
        self.target.is_file()
    }

    /// The target's directory.
    pub fn target_dir(&self) -> Option<&Path> {
        self.target.parent()
    }
}

/// Synthetic file name used when no catalog record is known.
pub fn placeholder_name(reference: ArtifactReference) -> String {
    format!("{}-{}.jar", reference.project_id, reference.file_id)
}
