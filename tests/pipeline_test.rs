//! Full cycle tests: real HTTP against a local axum server, real files on
//! disk, recorded version control.

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode, header};
use axum::{Router, routing::get};
use slowmo::coordinator::{CoordinatorError, CycleCoordinator, CycleError};
use slowmo::jobs::{FileJobSource, JobDescriptor, RequestBody, url_digest};
use slowmo::observability::Metrics;
use slowmo::scheduler::{PoolConfig, WorkerPool};
use slowmo::storage::{self, SnapshotStore};
use slowmo::vcs::{VcsError, VersionControl};
use slowmo::worker::{HttpConfig, HttpFetcher, JobExecutor};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const PAGE: &str = "<html><head><style>body { color: red; }</style></head>\
<body><h1>Hello</h1><script>track()</script></body></html>";

/// Records what would have been handed to git
#[derive(Default)]
struct RecordingVcs {
    staged: Mutex<Vec<PathBuf>>,
    commits: Mutex<Vec<String>>,
    unhealthy: bool,
}

impl RecordingVcs {
    fn commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }

    fn staged(&self) -> Vec<PathBuf> {
        self.staged.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionControl for RecordingVcs {
    async fn init(&self) -> slowmo::vcs::Result<()> {
        Ok(())
    }

    async fn status(&self) -> slowmo::vcs::Result<()> {
        if self.unhealthy {
            return Err(VcsError::Failed {
                command: "git status --porcelain".to_string(),
                code: Some(128),
                stderr: "fatal: not a git repository".to_string(),
            });
        }
        Ok(())
    }

    async fn add(&self, path: &Path) -> slowmo::vcs::Result<()> {
        self.staged.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn commit(&self, message: &str) -> slowmo::vcs::Result<()> {
        self.commits.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

async fn start_mock_server() -> String {
    let app = Router::new()
        .route("/page", get(|| async { PAGE }))
        .route("/plain", get(|| async { "just text" }))
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
        .route(
            "/latin1",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html; charset=iso-8859-1")],
                    b"<html><body><p>caf\xE9 cr\xE8me</p></body></html>".as_slice(),
                )
            }),
        )
        .route("/echo", get(echo))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(400)).await;
                "<p>slow</p>"
            }),
        );

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let bound_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", bound_addr)
}

/// Reflects the request's token header and body into the page
async fn echo(headers: HeaderMap, body: String) -> String {
    let token = headers
        .get("x-slowmo-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");

    // `&` would come back entity-escaped from the sanitizer
    format!(
        "<html><body><p id=\"token\">{token}</p><p id=\"type\">{content_type}</p><p id=\"body\">{}</p></body></html>",
        body.replace('&', " ")
    )
}

struct Harness {
    _temp: TempDir,
    snapshots: PathBuf,
    jobs_file: PathBuf,
    vcs: Arc<RecordingVcs>,
}

impl Harness {
    fn new(vcs: RecordingVcs) -> Self {
        let temp = TempDir::new().unwrap();
        let snapshots = temp.path().join("files");
        let jobs_file = temp.path().join("requests.json");
        Self {
            snapshots,
            jobs_file,
            vcs: Arc::new(vcs),
            _temp: temp,
        }
    }

    fn write_jobs(&self, jobs: &[JobDescriptor]) {
        std::fs::write(&self.jobs_file, serde_json::to_vec(jobs).unwrap()).unwrap();
    }

    fn coordinator(&self, timeout: Duration) -> CycleCoordinator {
        let metrics = Arc::new(Metrics::new());
        let vcs: Arc<dyn VersionControl> = self.vcs.clone();
        let store = SnapshotStore::new(self.snapshots.clone(), Arc::clone(&vcs));
        let fetcher = HttpFetcher::new(HttpConfig::default()).unwrap();
        let executor = Arc::new(JobExecutor::new(
            Arc::new(fetcher),
            store,
            timeout,
            Arc::clone(&metrics),
        ));
        let pool = WorkerPool::new(
            executor,
            PoolConfig {
                max_workers: 2,
                each_interval: Duration::from_millis(10),
            },
            Arc::clone(&metrics),
        );

        CycleCoordinator::new(
            self.snapshots.clone(),
            Duration::from_millis(50),
            Arc::new(FileJobSource::new(self.jobs_file.clone())),
            pool,
            vcs,
            metrics,
        )
    }
}

#[tokio::test]
async fn test_cycle_writes_sanitized_snapshots() {
    let base = start_mock_server().await;
    let harness = Harness::new(RecordingVcs::default());
    harness.write_jobs(&[
        JobDescriptor::new(format!("{base}/page")).with_name("front"),
        JobDescriptor::new(format!("{base}/plain")),
        JobDescriptor::new(format!("{base}/missing")).with_name("gone"),
    ]);

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    coordinator.prepare().await.unwrap();
    let summary = coordinator.run_cycle().await.unwrap();

    assert_eq!(summary.report.dispatched, 3);
    assert_eq!(summary.report.succeeded(), 2);
    assert_eq!(summary.report.failed(), 1);
    assert!(summary.committed);

    let front = std::fs::read_to_string(harness.snapshots.join("front.html")).unwrap();
    assert!(front.contains("<h1>Hello</h1>"));
    assert!(!front.contains("track()"));
    assert!(!front.contains("color: red"));

    let plain_name = format!("{}.html", url_digest(&format!("{base}/plain")));
    assert!(harness.snapshots.join(&plain_name).exists());
    assert!(!harness.snapshots.join("gone.html").exists());

    let mut staged = harness.vcs.staged();
    staged.sort();
    let mut expected = vec![PathBuf::from("front.html"), PathBuf::from(plain_name)];
    expected.sort();
    assert_eq!(staged, expected);

    assert_eq!(harness.vcs.commits(), [summary.commit_message.clone()]);
    assert!(summary.commit_message.parse::<i64>().is_ok());

    let metrics = coordinator.metrics().snapshot();
    assert_eq!(metrics.jobs_dispatched, 3);
    assert_eq!(metrics.snapshots_written, 2);
    assert_eq!(metrics.jobs_failed, 1);
    assert_eq!(metrics.commits, 1);
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_snapshot() {
    let base = start_mock_server().await;
    let harness = Harness::new(RecordingVcs::default());
    std::fs::create_dir_all(&harness.snapshots).unwrap();
    std::fs::write(harness.snapshots.join("gone.html"), "<p>yesterday</p>").unwrap();
    harness.write_jobs(&[JobDescriptor::new(format!("{base}/missing")).with_name("gone")]);

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    coordinator.prepare().await.unwrap();
    coordinator.run_cycle().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(harness.snapshots.join("gone.html")).unwrap(),
        "<p>yesterday</p>"
    );
}

#[tokio::test]
async fn test_every_cycle_commits_even_without_successes() {
    let base = start_mock_server().await;
    let harness = Harness::new(RecordingVcs::default());
    harness.write_jobs(&[JobDescriptor::new(format!("{base}/missing"))]);

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    coordinator.prepare().await.unwrap();
    let first = coordinator.run_cycle().await.unwrap();
    let second = coordinator.run_cycle().await.unwrap();

    assert_eq!(first.report.succeeded(), 0);
    assert!(harness.vcs.staged().is_empty());

    let commits = harness.vcs.commits();
    assert_eq!(commits.len(), 2);
    let stamps: Vec<i64> = commits.iter().map(|c| c.parse().unwrap()).collect();
    assert!(stamps[1] > stamps[0]);
    assert_eq!(second.commit_message, commits[1]);
}

#[tokio::test]
async fn test_empty_job_list_still_commits() {
    let harness = Harness::new(RecordingVcs::default());
    harness.write_jobs(&[]);

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    coordinator.prepare().await.unwrap();
    let summary = coordinator.run_cycle().await.unwrap();

    assert_eq!(summary.report.dispatched, 0);
    assert_eq!(harness.vcs.commits().len(), 1);
}

#[tokio::test]
async fn test_job_list_edits_apply_next_cycle() {
    let base = start_mock_server().await;
    let harness = Harness::new(RecordingVcs::default());
    harness.write_jobs(&[JobDescriptor::new(format!("{base}/page")).with_name("first")]);

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    coordinator.prepare().await.unwrap();
    coordinator.run_cycle().await.unwrap();

    harness.write_jobs(&[JobDescriptor::new(format!("{base}/page")).with_name("second")]);
    let summary = coordinator.run_cycle().await.unwrap();

    assert_eq!(summary.report.dispatched, 1);
    assert!(harness.snapshots.join("first.html").exists());
    assert!(harness.snapshots.join("second.html").exists());
}

#[tokio::test]
async fn test_malformed_job_list_skips_cycle() {
    let harness = Harness::new(RecordingVcs::default());
    std::fs::write(&harness.jobs_file, "[{\"url\": ").unwrap();

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    coordinator.prepare().await.unwrap();
    let result = coordinator.run_cycle().await;

    assert!(matches!(result, Err(CycleError::JobList(_))));
    assert!(harness.vcs.commits().is_empty());
}

#[tokio::test]
async fn test_missing_job_list_is_counted_as_skipped() {
    let harness = Harness::new(RecordingVcs::default());

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        trigger.cancel();
    });

    let cycles = coordinator.run(shutdown).await.unwrap();

    assert_eq!(cycles, 0);
    assert!(coordinator.metrics().snapshot().cycles_skipped >= 1);
    assert!(harness.vcs.commits().is_empty());
}

#[tokio::test]
async fn test_timeout_does_not_stop_cycle() {
    let base = start_mock_server().await;
    let harness = Harness::new(RecordingVcs::default());
    harness.write_jobs(&[
        JobDescriptor::new(format!("{base}/slow")).with_name("slow"),
        JobDescriptor::new(format!("{base}/page")).with_name("page"),
    ]);

    let mut coordinator = harness.coordinator(Duration::from_millis(100));
    coordinator.prepare().await.unwrap();
    let summary = coordinator.run_cycle().await.unwrap();

    assert_eq!(summary.report.succeeded(), 1);
    assert!(!harness.snapshots.join("slow.html").exists());
    assert!(harness.snapshots.join("page.html").exists());
    assert_eq!(harness.vcs.commits().len(), 1);
}

#[tokio::test]
async fn test_cancel_before_start_runs_no_cycle() {
    let harness = Harness::new(RecordingVcs::default());
    harness.write_jobs(&[]);

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let cycles = coordinator.run(shutdown).await.unwrap();

    assert_eq!(cycles, 0);
    assert!(harness.snapshots.is_dir());
    assert!(harness.vcs.commits().is_empty());
}

#[tokio::test]
async fn test_cancel_mid_batch_still_commits() {
    let base = start_mock_server().await;
    let harness = Harness::new(RecordingVcs::default());
    harness.write_jobs(&[JobDescriptor::new(format!("{base}/slow")).with_name("slow")]);

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let cycles = coordinator.run(shutdown).await.unwrap();

    assert_eq!(cycles, 1);
    assert!(harness.snapshots.join("slow.html").exists());
    assert_eq!(harness.vcs.commits().len(), 1);
}

#[tokio::test]
async fn test_unhealthy_vcs_is_fatal() {
    let harness = Harness::new(RecordingVcs {
        unhealthy: true,
        ..Default::default()
    });
    harness.write_jobs(&[]);

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    let result = coordinator.run(CancellationToken::new()).await;

    assert!(matches!(result, Err(CoordinatorError::VcsUnhealthy(_))));
    assert!(harness.vcs.commits().is_empty());
}

#[tokio::test]
async fn test_reset_then_cycle_starts_clean() {
    let base = start_mock_server().await;
    let harness = Harness::new(RecordingVcs::default());
    std::fs::create_dir_all(harness.snapshots.join(".git")).unwrap();
    std::fs::write(harness.snapshots.join("stale.html"), "old").unwrap();
    harness.write_jobs(&[JobDescriptor::new(format!("{base}/page")).with_name("front")]);

    storage::reset(&harness.snapshots).await;

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    coordinator.prepare().await.unwrap();
    coordinator.run_cycle().await.unwrap();

    let names: Vec<String> = std::fs::read_dir(&harness.snapshots)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["front.html"]);
}

#[tokio::test]
async fn test_response_charset_is_decoded() {
    let base = start_mock_server().await;
    let harness = Harness::new(RecordingVcs::default());
    harness.write_jobs(&[JobDescriptor::new(format!("{base}/latin1")).with_name("latin1")]);

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    coordinator.prepare().await.unwrap();
    coordinator.run_cycle().await.unwrap();

    let saved = std::fs::read_to_string(harness.snapshots.join("latin1.html")).unwrap();
    assert!(saved.contains("café crème"), "{saved}");
    assert!(!saved.contains('\u{FFFD}'));
}

#[tokio::test]
async fn test_headers_and_body_reach_the_server() {
    let base = start_mock_server().await;
    let harness = Harness::new(RecordingVcs::default());

    let form: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(r#"{"q": "rust", "page": 2, "exact": true}"#).unwrap();
    harness.write_jobs(&[
        JobDescriptor::new(format!("{base}/echo"))
            .with_name("form")
            .with_header("X-Slowmo-Token", "s3cret")
            .with_body(RequestBody::Form(form.into_iter().collect())),
        JobDescriptor::new(format!("{base}/echo"))
            .with_name("raw")
            .with_header("Content-Type", "text/plain")
            .with_body(RequestBody::Raw("hello-raw".to_string())),
    ]);

    let mut coordinator = harness.coordinator(Duration::from_secs(5));
    coordinator.prepare().await.unwrap();
    let summary = coordinator.run_cycle().await.unwrap();
    assert_eq!(summary.report.succeeded(), 2);

    let form = std::fs::read_to_string(harness.snapshots.join("form.html")).unwrap();
    assert!(form.contains(r#"<p id="token">s3cret</p>"#), "{form}");
    assert!(form.contains("application/x-www-form-urlencoded"), "{form}");
    assert!(form.contains(r#"<p id="body">exact=true page=2 q=rust</p>"#), "{form}");

    let raw = std::fs::read_to_string(harness.snapshots.join("raw.html")).unwrap();
    assert!(raw.contains(r#"<p id="token">none</p>"#), "{raw}");
    assert!(raw.contains(r#"<p id="type">text/plain</p>"#), "{raw}");
    assert!(raw.contains(r#"<p id="body">hello-raw</p>"#), "{raw}");
}
