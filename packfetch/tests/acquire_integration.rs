//! Integration tests for the acquisition engine.
//!
//! These tests drive the full pipeline over a scripted in-memory transport:
//! - catalog JSON → HttpCatalogClient → ArtifactFetcher → orchestrator waves
//! - cache reuse across runs
//! - manual download reconciliation from a downloads directory
//!
//! Run with: `cargo test --test acquire_integration`

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use sha1::{Digest, Sha1};
use tempfile::TempDir;

use packfetch::acquire::{ArtifactStatus, Backoff, RetryPolicy};
use packfetch::catalog::TimeoutSchedule;
use packfetch::config::AcquireConfig;
use packfetch::manual::{LogPrompt, ReconcilePolicy, Reconciler};
use packfetch::transport::{Transport, TransportError};
use packfetch::{AcquisitionOrchestrator, ArtifactReference, Manifest};

const CATALOG: &str = "https://catalog.test/public";

// ============================================================================
// Scripted transport
// ============================================================================

/// In-memory stand-in for the catalog API and the file CDN.
///
/// Each URL has a steady body; a queue of scripted responses per URL is
/// served first.
#[derive(Default)]
struct ScriptedTransport {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    scripted: Mutex<HashMap<String, VecDeque<Scripted>>>,
    downloads: AtomicUsize,
}

/// One scripted response.
#[derive(Debug, Clone)]
enum Scripted {
    Body(Vec<u8>),
    Status(u16),
    Timeout,
}

impl ScriptedTransport {
    fn serve(&self, url: &str, body: &[u8]) {
        self.bodies.lock().insert(url.to_string(), body.to_vec());
    }

    fn script(&self, url: &str, responses: Vec<Scripted>) {
        self.scripted
            .lock()
            .insert(url.to_string(), responses.into_iter().collect());
    }

    fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn respond(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let next = self.scripted.lock().get_mut(url).and_then(|q| q.pop_front());
        let response = match next {
            Some(response) => response,
            None => match self.bodies.lock().get(url) {
                Some(body) => Scripted::Body(body.clone()),
                None => Scripted::Status(404),
            },
        };
        match response {
            Scripted::Body(body) => Ok(body),
            Scripted::Status(status) => Err(TransportError::Status {
                url: url.to_string(),
                status,
            }),
            Scripted::Timeout => Err(TransportError::Timeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.respond(url, timeout)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let body = self.respond(url, Duration::ZERO)?;
        fs::write(dest, &body).map_err(|source| TransportError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(body.len() as u64)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn sha1_hex(body: &[u8]) -> String {
    Sha1::digest(body).iter().map(|b| format!("{:02x}", b)).collect()
}

fn project_url(pid: u64) -> String {
    format!("{}/mod/{}", CATALOG, pid)
}

fn file_url(pid: u64, fid: u64) -> String {
    format!("https://cdn.test/{}/{}.jar", pid, fid)
}

fn jar_body(pid: u64, fid: u64) -> Vec<u8> {
    format!("jar contents of {}:{}", pid, fid).into_bytes()
}

/// Serve the catalog entry of `pid` with the given version records.
fn publish_versions(transport: &ScriptedTransport, pid: u64, versions: Vec<Value>) {
    let page = format!("https://www.curseforge.com/minecraft/mc-mods/mod-{}", pid);
    let project = json!({
        "id": pid,
        "name": format!("Mod {}", pid),
        "versions": versions,
        "links": [{"name": "CurseForge", "link": page, "type": "curseforge"}]
    });
    transport.serve(&project_url(pid), project.to_string().as_bytes());
}

/// Publish a project whose only version is `fid` and serve that file.
fn publish(transport: &ScriptedTransport, pid: u64, fid: u64) {
    let body = jar_body(pid, fid);
    let version = json!({
        "id": fid,
        "name": format!("mod-{}-{}.jar", pid, fid),
        "url": file_url(pid, fid),
        "size": body.len(),
        "sha1": sha1_hex(&body),
    });
    publish_versions(transport, pid, vec![version]);
    transport.serve(&file_url(pid, fid), &body);
}

fn config(cache: &Path) -> AcquireConfig {
    AcquireConfig::new(cache)
        .with_catalog_base_url(CATALOG)
        .with_requests_per_second(0.0)
        .with_concurrency(4)
        .with_retry(RetryPolicy::unbounded().with_backoff(Backoff::Fixed(Duration::ZERO)))
}

fn engine(cache: &Path, transport: &Arc<ScriptedTransport>) -> AcquisitionOrchestrator {
    let transport: Arc<dyn Transport> = transport.clone();
    AcquisitionOrchestrator::with_transport(&config(cache), transport)
}

/// Manifest with artifacts A (1:11), B (2:22) and C (3:33).
const MANIFEST: &str = r#"{
    "name": "Test Pack",
    "version": "1.0.0",
    "minecraft": {
        "version": "1.12.2",
        "modLoaders": [{"id": "forge-14.23.5.2859", "primary": true}]
    },
    "files": [
        {"projectID": 1, "fileID": 11, "required": true},
        {"projectID": 2, "fileID": 22, "required": true},
        {"projectID": 3, "fileID": 33, "required": false}
    ]
}"#;

// ============================================================================
// Integration Tests
// ============================================================================

/// A downloads on the first wave. B's lookup times out on every tier of the
/// first wave and succeeds on the retry. C's fileID is never published, so it
/// ends up as a manual download with a placeholder slot in the ready list.
#[test]
fn test_end_to_end_with_restricted_artifact() {
    let temp = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::default());
    publish(&transport, 1, 11);
    publish(&transport, 2, 22);
    publish(&transport, 3, 34);
    let tiers = TimeoutSchedule::default().len();
    transport.script(&project_url(2), vec![Scripted::Timeout; tiers]);

    let manifest = Manifest::parse(MANIFEST).unwrap();
    let report = engine(temp.path(), &transport)
        .acquire_all(&manifest.references())
        .unwrap();

    assert_eq!(report.ready.len(), 3);
    assert_eq!(report.verified().count(), 2);
    assert_eq!(report.manual.len(), 1);

    let manual = &report.manual[0];
    assert_eq!(manual.reference, ArtifactReference::new(3, 33));
    assert!(manual.url.contains("33"));
    assert_eq!(
        manual.url,
        "https://www.curseforge.com/minecraft/mc-mods/mod-3/download/33"
    );

    let placeholder = report.placeholders().next().unwrap();
    assert_eq!(placeholder.reference, ArtifactReference::new(3, 33));
    assert_eq!(placeholder.status, ArtifactStatus::PendingManual);
    assert_eq!(placeholder.path, manual.target);

    let verified: Vec<ArtifactReference> = report.verified().map(|a| a.reference).collect();
    assert!(verified.contains(&ArtifactReference::new(2, 22)));
    for artifact in report.verified() {
        assert!(artifact.path.is_file());
    }
    assert_eq!(report.stats.waves, 2);
    assert_eq!(report.stats.transient_failures, 2);
    assert_eq!(report.stats.downloads, 2);
    assert_eq!(transport.download_count(), 2);
    assert_eq!(
        manifest.install_hint().as_deref(),
        Some("You need to install: forge-14.23.5.2859")
    );
}

/// A catalog outage on the first wave is retried and converges.
#[test]
fn test_transient_failure_converges_on_retry() {
    let temp = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::default());
    publish(&transport, 1, 11);
    transport.script(&project_url(1), vec![Scripted::Status(503)]);

    let report = engine(temp.path(), &transport)
        .acquire_all(&[ArtifactReference::new(1, 11)])
        .unwrap();

    assert_eq!(report.stats.waves, 2);
    assert_eq!(report.stats.transient_failures, 1);
    assert_eq!(report.verified().count(), 1);
    assert!(report.manual.is_empty());
    assert!(report.is_complete());
}

/// Corrupt transfers are retried on every wave and never become manual.
#[test]
fn test_checksum_mismatch_is_never_permanent() {
    let temp = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::default());
    publish(&transport, 1, 11);
    transport.script(
        &file_url(1, 11),
        vec![
            Scripted::Body(b"garbage".to_vec()),
            Scripted::Body(b"more garbage".to_vec()),
        ],
    );

    let report = engine(temp.path(), &transport)
        .acquire_all(&[ArtifactReference::new(1, 11)])
        .unwrap();

    assert_eq!(report.stats.waves, 3);
    assert_eq!(report.stats.transient_failures, 2);
    assert!(report.manual.is_empty());
    assert_eq!(report.verified().count(), 1);
    assert_eq!(fs::read(&report.ready[0].path).unwrap(), jar_body(1, 11));
}

/// A second run over a warm cache downloads nothing.
#[test]
fn test_second_run_uses_cache() {
    let temp = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::default());
    publish(&transport, 1, 11);
    publish(&transport, 2, 22);
    let references = [ArtifactReference::new(1, 11), ArtifactReference::new(2, 22)];

    let first = engine(temp.path(), &transport).acquire_all(&references).unwrap();
    assert_eq!(first.stats.downloads, 2);

    let second_transport = Arc::new(ScriptedTransport::default());
    publish(&second_transport, 1, 11);
    publish(&second_transport, 2, 22);
    let second = engine(temp.path(), &second_transport)
        .acquire_all(&references)
        .unwrap();

    assert_eq!(second_transport.download_count(), 0);
    assert_eq!(second.stats.cache_hits, 2);
    assert_eq!(second.verified().count(), 2);
}

/// With a retry ceiling, persistent outages end up unresolved instead of
/// looping forever.
#[test]
fn test_retry_ceiling_reports_unresolved() {
    let temp = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::default());
    transport.script(&project_url(1), vec![Scripted::Status(503); 10]);

    let config = config(temp.path()).with_retry(
        RetryPolicy::unbounded()
            .with_backoff(Backoff::Fixed(Duration::ZERO))
            .with_max_retry_waves(Some(1)),
    );
    let transport_dyn: Arc<dyn Transport> = transport.clone();
    let report = AcquisitionOrchestrator::with_transport(&config, transport_dyn)
        .acquire_all(&[ArtifactReference::new(1, 11)])
        .unwrap();

    assert_eq!(report.stats.waves, 2);
    assert_eq!(report.unresolved, vec![ArtifactReference::new(1, 11)]);
    assert!(report.ready.is_empty());
}

/// The user drops C into their downloads directory; reconciliation moves it
/// into the cache and the placeholder becomes verified.
#[test]
fn test_manual_download_is_reconciled() {
    let temp = TempDir::new().unwrap();
    let downloads = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::default());
    publish(&transport, 1, 11);
    publish(&transport, 3, 34);

    let mut report = engine(temp.path(), &transport)
        .acquire_all(&[ArtifactReference::new(1, 11), ArtifactReference::new(3, 33)])
        .unwrap();
    assert_eq!(report.manual.len(), 1);

    let entry = report.manual[0].clone();
    assert_eq!(entry.file_name, "3-33.jar");
    fs::write(downloads.path().join(&entry.file_name), b"manually fetched").unwrap();

    let summary = Reconciler::new(ReconcilePolicy::poll())
        .with_source_dir(downloads.path())
        .with_readme_dir(temp.path())
        .run(&report.manual, &mut LogPrompt)
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.placed, vec![entry.reference]);
    assert!(summary.readme.unwrap().is_file());
    assert!(entry.target.is_file());

    for reference in &summary.placed {
        assert!(report.mark_placed(*reference));
    }
    assert!(report.is_complete());
    assert!(report.manual.is_empty());
}

/// A sibling version with a withheld URL does not stop the published file of
/// the same project from downloading on the first wave.
#[test]
fn test_withheld_sibling_does_not_block_published_file() {
    let temp = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::default());
    let body = jar_body(1, 11);
    publish_versions(
        &transport,
        1,
        vec![
            json!({"id": 10, "name": "mod-1-10.jar", "url": null, "size": 5, "sha1": null}),
            json!({
                "id": 11,
                "name": "mod-1-11.jar",
                "url": file_url(1, 11),
                "size": body.len(),
                "sha1": sha1_hex(&body),
            }),
        ],
    );
    transport.serve(&file_url(1, 11), &body);

    let report = engine(temp.path(), &transport)
        .acquire_all(&[ArtifactReference::new(1, 11)])
        .unwrap();

    assert_eq!(report.stats.waves, 1);
    assert_eq!(report.verified().count(), 1);
    assert!(report.is_complete());
}

/// A matched record without a download URL becomes a manual download that
/// keeps the catalog file name, so the file the browser saves is picked up.
#[test]
fn test_withheld_url_is_reconciled_by_catalog_name() {
    let temp = TempDir::new().unwrap();
    let downloads = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::default());
    let manual_body = b"fetched from the project page".to_vec();
    publish_versions(
        &transport,
        3,
        vec![json!({
            "id": 33,
            "name": "Quark Oddities-1.12.jar",
            "url": null,
            "size": manual_body.len(),
            "sha1": sha1_hex(&manual_body),
        })],
    );

    let mut report = engine(temp.path(), &transport)
        .acquire_all(&[ArtifactReference::new(3, 33)])
        .unwrap();

    assert_eq!(report.stats.waves, 2);
    assert_eq!(report.manual.len(), 1);
    let entry = report.manual[0].clone();
    assert_eq!(entry.file_name, "Quark Oddities-1.12.jar");
    assert!(entry.has_catalog_name());
    assert_eq!(transport.download_count(), 0);

    fs::write(downloads.path().join("Quark+Oddities-1.12.jar"), &manual_body).unwrap();
    let summary = Reconciler::new(ReconcilePolicy::poll())
        .with_source_dir(downloads.path())
        .run(&report.manual, &mut LogPrompt)
        .unwrap();

    assert_eq!(summary.resolved, vec![entry.reference]);
    assert_eq!(fs::read(&entry.target).unwrap(), manual_body);
    for reference in &summary.resolved {
        assert!(report.mark_placed(*reference));
    }
    assert!(report.is_complete());
}
