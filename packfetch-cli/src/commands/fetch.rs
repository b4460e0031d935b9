//! The `fetch` command: acquire every artifact of a manifest.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use console::{style, Term};
use packfetch::config::{expand_tilde, ConfigFile};
use packfetch::logging::{default_log_dir, init_logging};
use packfetch::manual::{
    default_downloads_dir, DownloadsPrompt, LogPrompt, ManualMode, ReconcilePolicy, Reconciler,
};
use packfetch::{AcquisitionOrchestrator, AcquisitionReport, Manifest};
use tracing::{info, warn};

use crate::error::CliError;
use crate::progress::WaveProgress;
use crate::prompt::TerminalPrompt;

/// How to handle artifacts whose authors disabled third-party downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ManualArg {
    /// Ask for the downloads directory and rescan on demand
    Interactive,
    /// Rescan the downloads directory until everything is placed
    Poll,
    /// Only write the download list and exit
    Report,
}

impl From<ManualArg> for ManualMode {
    fn from(arg: ManualArg) -> Self {
        match arg {
            ManualArg::Interactive => ManualMode::Interactive,
            ManualArg::Poll => ManualMode::Poll,
            ManualArg::Report => ManualMode::Report,
        }
    }
}

/// Arguments for `packfetch fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Path to the pack's manifest.json
    pub manifest: PathBuf,

    /// Artifact cache directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Number of parallel fetch workers
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Catalog requests per second (0 disables the limit)
    #[arg(long)]
    pub rps: Option<f64>,

    /// Give up after this many retry waves
    #[arg(long)]
    pub max_retry_waves: Option<u32>,

    /// Manual download handling
    #[arg(long, value_enum)]
    pub manual: Option<ManualArg>,

    /// Directory your browser saves downloads to
    #[arg(long)]
    pub downloads_dir: Option<PathBuf>,

    /// Write the acquisition report as JSON to this path
    #[arg(long)]
    pub emit_json: Option<PathBuf>,
}

impl FetchArgs {
    /// Apply command-line overrides on top of the config file.
    pub fn apply_to(&self, config: &mut ConfigFile) {
        if let Some(dir) = &self.cache_dir {
            config.cache.directory = expand_tilde(&dir.to_string_lossy());
        }
        if let Some(workers) = self.concurrency {
            config.download.concurrency = workers.max(1);
        }
        if let Some(rps) = self.rps {
            config.catalog.requests_per_second = rps.max(0.0);
        }
        if self.max_retry_waves.is_some() {
            config.download.max_retry_waves = self.max_retry_waves;
        }
        if let Some(mode) = self.manual {
            config.manual.mode = mode.into();
        }
        if let Some(dir) = &self.downloads_dir {
            config.manual.downloads_dir = Some(expand_tilde(&dir.to_string_lossy()));
        }
    }
}

/// Run the fetch command.
pub fn run(args: FetchArgs, verbose: bool) -> Result<(), CliError> {
    let mut config = ConfigFile::load()?;
    args.apply_to(&mut config);

    let _logging = init_logging(&default_log_dir(), verbose)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let manifest = Manifest::load(&args.manifest)?;
    let references = manifest.references();
    info!(
        manifest = %args.manifest.display(),
        artifacts = references.len(),
        "Loaded manifest"
    );

    let interactive = Term::stdout().is_term();
    let progress = WaveProgress::new(interactive);
    let orchestrator =
        AcquisitionOrchestrator::from_config(&config.to_acquire_config())?
            .with_observer(progress.observer());

    let mut report = orchestrator.acquire_all(&references)?;
    progress.finish();

    if !report.manual.is_empty() {
        reconcile_manual(&config, &mut report, interactive)?;
    }

    if let Some(path) = &args.emit_json {
        write_report_json(&report, path)?;
    }

    print_summary(&report, &manifest);

    let missing = report.manual.len() + report.unresolved.len();
    if missing > 0 {
        return Err(CliError::Incomplete { missing });
    }
    Ok(())
}

fn reconcile_manual(
    config: &ConfigFile,
    report: &mut AcquisitionReport,
    interactive: bool,
) -> Result<(), CliError> {
    let mut policy = config.reconcile_policy();
    if config.manual.mode == ManualMode::Interactive && !interactive {
        warn!("No terminal attached, writing the manual download list instead of prompting");
        policy = ReconcilePolicy::ReportOnly;
    }

    let source_dir = config
        .manual
        .downloads_dir
        .clone()
        .unwrap_or_else(default_downloads_dir);
    let reconciler = Reconciler::new(policy)
        .with_source_dir(source_dir)
        .with_readme_dir(&config.cache.directory);

    let mut terminal = TerminalPrompt::new();
    let mut log = LogPrompt;
    let prompt: &mut dyn DownloadsPrompt = if config.manual.mode == ManualMode::Interactive
        && interactive
    {
        &mut terminal
    } else {
        &mut log
    };

    let summary = reconciler.run(&report.manual, prompt)?;
    for reference in summary.resolved {
        report.mark_placed(reference);
    }
    if let Some(readme) = summary.readme {
        info!(path = %readme.display(), "Wrote manual download list");
    }
    Ok(())
}

fn write_report_json(report: &AcquisitionReport, path: &Path) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report).map_err(|e| CliError::FileWrite {
        path: path.to_path_buf(),
        error: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    fs::write(path, json).map_err(|error| CliError::FileWrite {
        path: path.to_path_buf(),
        error,
    })
}

fn print_summary(report: &AcquisitionReport, manifest: &Manifest) {
    let verified = report.verified().count();
    let stats = &report.stats;

    println!();
    println!(
        "{} {} of {} artifacts ready ({} downloaded, {} from cache, {} wave(s))",
        style("✓").green(),
        verified,
        report.ready.len() + report.unresolved.len(),
        stats.downloads,
        stats.cache_hits,
        stats.waves
    );

    if !report.manual.is_empty() {
        println!(
            "{} {} artifact(s) need a manual download:",
            style("!").yellow(),
            report.manual.len()
        );
        for entry in &report.manual {
            println!("    {}  {}", entry.file_name, style(&entry.url).dim());
        }
    }

    if !report.unresolved.is_empty() {
        println!(
            "{} {} artifact(s) could not be fetched after the last retry wave:",
            style("✗").red(),
            report.unresolved.len()
        );
        for reference in &report.unresolved {
            println!("    {}", reference);
        }
    }

    if let Some(hint) = manifest.install_hint() {
        println!();
        println!("{}", hint);
    }
}
