//! Reconciliation loop.
//!
//! The [`Reconciler`] repeatedly scans a downloads directory for the files
//! still outstanding and moves them into place. How it waits between scans
//! is the [`ReconcilePolicy`]: ask the user, poll on a timer, or only write
//! the README and return.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::reconcile::{outstanding, place, scan_directory};
use super::report::{render_report, write_manual_readme};
use super::{ManualDownloadEntry, ReconcileError};
use crate::manifest::ArtifactReference;

/// Default pause between polling scans in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default time after which polling gives up, in seconds (30 minutes).
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30 * 60;

/// How the reconciler waits for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Ask for the downloads directory after every report.
    Interactive,
    /// Rescan every `interval` until done or `timeout` elapses.
    Poll { interval: Duration, timeout: Duration },
    /// Write the README and return immediately.
    ReportOnly,
}

impl ReconcilePolicy {
    /// Polling with default interval and timeout.
    pub fn poll() -> Self {
        Self::Poll {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

/// Configuration-level name of a [`ReconcilePolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ManualMode {
    #[default]
    Interactive,
    Poll,
    Report,
}

impl ManualMode {
    /// All accepted names.
    pub const NAMES: [&'static str; 3] = ["interactive", "poll", "report"];

    /// Build the policy for this mode.
    pub fn policy(self, interval: Duration, timeout: Duration) -> ReconcilePolicy {
        match self {
            Self::Interactive => ReconcilePolicy::Interactive,
            Self::Poll => ReconcilePolicy::Poll { interval, timeout },
            Self::Report => ReconcilePolicy::ReportOnly,
        }
    }
}

impl fmt::Display for ManualMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interactive => write!(f, "interactive"),
            Self::Poll => write!(f, "poll"),
            Self::Report => write!(f, "report"),
        }
    }
}

impl FromStr for ManualMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interactive" => Ok(Self::Interactive),
            "poll" => Ok(Self::Poll),
            "report" | "report-only" => Ok(Self::Report),
            other => Err(format!(
                "unknown manual mode '{}', expected one of: {}",
                other,
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// User's answer when asked where downloads are saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswer {
    /// Rescan the current directory.
    KeepCurrent,
    /// Switch to another directory.
    UseDir(PathBuf),
    /// Stop reconciling; remaining entries stay outstanding.
    Abort,
}

/// User interaction used by [`ReconcilePolicy::Interactive`].
pub trait DownloadsPrompt {
    /// Show the outstanding entries and the directory being scanned.
    fn report(&mut self, outstanding: &[&ManualDownloadEntry], source_dir: &Path);

    /// Ask for the directory to scan next.
    fn ask_source_dir(&mut self, current: &Path) -> PromptAnswer;
}

/// Prompt that logs the report and never changes directory.
///
/// Used for polling and report-only runs, and wherever no terminal is
/// attached.
#[derive(Debug, Default)]
pub struct LogPrompt;

impl DownloadsPrompt for LogPrompt {
    fn report(&mut self, outstanding: &[&ManualDownloadEntry], source_dir: &Path) {
        info!(
            outstanding = outstanding.len(),
            dir = %source_dir.display(),
            "Waiting for manual downloads\n{}",
            render_report(outstanding.iter().copied())
        );
    }

    fn ask_source_dir(&mut self, _current: &Path) -> PromptAnswer {
        PromptAnswer::KeepCurrent
    }
}

/// What a reconciliation run achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// References whose files were moved into place during this run.
    pub placed: Vec<ArtifactReference>,
    /// References whose target exists when the run ends, whether placed now
    /// or already present beforehand.
    pub resolved: Vec<ArtifactReference>,
    /// References whose file was found but could not be placed.
    pub failed: Vec<ArtifactReference>,
    /// Entries still missing when the run ended.
    pub outstanding: Vec<ManualDownloadEntry>,
    /// README written, if any.
    pub readme: Option<PathBuf>,
}

impl ReconcileSummary {
    /// Whether every entry is in place.
    pub fn is_complete(&self) -> bool {
        self.outstanding.is_empty()
    }
}

/// The platform downloads directory, falling back to `~/Downloads` and then
/// the working directory.
pub fn default_downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Drives manual downloads to completion under a [`ReconcilePolicy`].
#[derive(Debug, Clone)]
pub struct Reconciler {
    policy: ReconcilePolicy,
    source_dir: PathBuf,
    readme_dir: Option<PathBuf>,
}

impl Reconciler {
    /// Create a reconciler scanning the platform downloads directory.
    pub fn new(policy: ReconcilePolicy) -> Self {
        Self {
            policy,
            source_dir: default_downloads_dir(),
            readme_dir: None,
        }
    }

    /// Scan `dir` instead of the platform downloads directory.
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    /// Write [`README_FILE_NAME`](super::README_FILE_NAME) into `dir`.
    pub fn with_readme_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.readme_dir = Some(dir.into());
        self
    }

    /// The policy in use.
    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// The directory scanned first.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Reconcile `entries`.
    ///
    /// A missing or unreadable downloads directory is logged and rescanned
    /// later. A file that cannot be placed is logged and its entry left
    /// outstanding; only a failure to write the README aborts.
    pub fn run(
        &self,
        entries: &[ManualDownloadEntry],
        prompt: &mut dyn DownloadsPrompt,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let mut summary = ReconcileSummary::default();

        if !outstanding(entries).is_empty() {
            if let Some(dir) = &self.readme_dir {
                summary.readme = Some(write_manual_readme(dir, outstanding(entries))?);
            }

            match &self.policy {
                ReconcilePolicy::ReportOnly => {
                    prompt.report(&outstanding(entries), &self.source_dir);
                }
                ReconcilePolicy::Interactive => {
                    self.run_interactive(entries, prompt, &mut summary);
                }
                ReconcilePolicy::Poll { interval, timeout } => {
                    self.run_poll(entries, prompt, *interval, *timeout, &mut summary);
                }
            }
        }

        let resolved: Vec<ArtifactReference> = entries
            .iter()
            .filter(|e| e.is_present())
            .map(|e| e.reference)
            .collect();
        summary.failed.retain(|r| !resolved.contains(r));
        summary.resolved = resolved;
        summary.outstanding = outstanding(entries).into_iter().cloned().collect();
        Ok(summary)
    }

    fn run_interactive(
        &self,
        entries: &[ManualDownloadEntry],
        prompt: &mut dyn DownloadsPrompt,
        summary: &mut ReconcileSummary,
    ) {
        let mut dir = self.source_dir.clone();

        loop {
            let waiting = pending(entries, &summary.failed);
            if waiting.is_empty() {
                return;
            }

            prompt.report(&waiting, &dir);
            match prompt.ask_source_dir(&dir) {
                PromptAnswer::KeepCurrent => {}
                PromptAnswer::UseDir(next) if next.is_dir() => dir = next,
                PromptAnswer::UseDir(next) => {
                    warn!(dir = %next.display(), "Not a directory, keeping {}", dir.display());
                }
                PromptAnswer::Abort => {
                    info!(outstanding = waiting.len(), "Manual reconciliation aborted");
                    return;
                }
            }

            reconcile_once(&dir, &waiting, summary);
        }
    }

    fn run_poll(
        &self,
        entries: &[ManualDownloadEntry],
        prompt: &mut dyn DownloadsPrompt,
        interval: Duration,
        timeout: Duration,
        summary: &mut ReconcileSummary,
    ) {
        // None: the timeout is too large to represent, poll until done
        let deadline = Instant::now().checked_add(timeout);
        prompt.report(&outstanding(entries), &self.source_dir);

        loop {
            let waiting = pending(entries, &summary.failed);
            if waiting.is_empty() {
                return;
            }

            reconcile_once(&self.source_dir, &waiting, summary);
            let remaining = pending(entries, &summary.failed).len();
            if remaining == 0 {
                return;
            }

            let mut pause = interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    warn!(outstanding = remaining, "Gave up waiting for manual downloads");
                    return;
                }
                pause = pause.min(deadline - now);
            }
            thread::sleep(pause);
        }
    }
}

/// Outstanding entries that have not already failed placement.
fn pending<'a>(
    entries: &'a [ManualDownloadEntry],
    failed: &[ArtifactReference],
) -> Vec<&'a ManualDownloadEntry> {
    outstanding(entries)
        .into_iter()
        .filter(|e| !failed.contains(&e.reference))
        .collect()
}

/// One scan and placement pass over `dir`.
fn reconcile_once(dir: &Path, pending: &[&ManualDownloadEntry], summary: &mut ReconcileSummary) {
    let matches = match scan_directory(dir, pending) {
        Ok(matches) => matches,
        Err(e) => {
            warn!(error = %e, "Cannot scan downloads directory");
            return;
        }
    };

    let placement = place(&matches);
    summary
        .placed
        .extend(placement.placed.iter().map(|e| e.reference));
    summary
        .failed
        .extend(placement.failed.iter().map(|(e, _)| e.reference));
}
