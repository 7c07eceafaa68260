//! Job executor - fetches one job and records its snapshot

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::http::{FetchError, Fetcher};
use crate::jobs::JobDescriptor;
use crate::observability::Metrics;
use crate::sanitize;
use crate::storage::{SnapshotError, SnapshotStore};

/// Only this status produces a snapshot
pub const SNAPSHOT_STATUS: u16 = 200;

/// Classified result of one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { status: u16, content: String },
    Timeout,
    NetworkError { reason: String },
    HttpError { status: u16 },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchOutcome::Success { status, .. } | FetchOutcome::HttpError { status } => {
                Some(*status)
            }
            FetchOutcome::Timeout | FetchOutcome::NetworkError { .. } => None,
        }
    }
}

/// What happened to one job in one cycle
#[derive(Debug, Clone)]
pub struct JobReport {
    pub url: String,
    pub identity: String,
    pub outcome: FetchOutcome,
    pub elapsed: Duration,
    /// Snapshot written and staged
    pub persisted: bool,
}

/// Runs a single job end to end. Never fails: every error is folded into
/// the returned [`JobReport`].
pub struct JobExecutor {
    fetcher: Arc<dyn Fetcher>,
    store: SnapshotStore,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl JobExecutor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: SnapshotStore,
        timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            fetcher,
            store,
            timeout,
            metrics,
        }
    }

    pub async fn run(&self, job: &JobDescriptor) -> JobReport {
        let started = Instant::now();
        let identity = SnapshotStore::identity_for(job);

        let result = self
            .fetcher
            .fetch(&job.url, &job.headers, job.body.as_ref(), self.timeout)
            .await;

        let outcome = match result {
            Ok(response) if response.status == SNAPSHOT_STATUS => FetchOutcome::Success {
                status: response.status,
                content: response.body,
            },
            Ok(response) => FetchOutcome::HttpError {
                status: response.status,
            },
            Err(FetchError::Timeout) => FetchOutcome::Timeout,
            Err(e) => FetchOutcome::NetworkError {
                reason: e.to_string(),
            },
        };

        let persisted = match &outcome {
            FetchOutcome::Success { content, .. } => self.record(job, content).await,
            _ => false,
        };

        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;
        let url = job.url.as_str();

        match &outcome {
            FetchOutcome::Success { status, .. } => {
                info!(status, url, identity = %identity, elapsed_ms, persisted, "Fetched")
            }
            FetchOutcome::HttpError { status } => {
                self.metrics.job_failed();
                warn!(status, url, elapsed_ms, "Unexpected HTTP status, snapshot kept as is")
            }
            FetchOutcome::Timeout => {
                self.metrics.job_failed();
                warn!(url, elapsed_ms, "Request timed out")
            }
            FetchOutcome::NetworkError { reason } => {
                self.metrics.job_failed();
                warn!(url, elapsed_ms, reason = %reason, "Request failed")
            }
        }

        JobReport {
            url: job.url.clone(),
            identity,
            outcome,
            elapsed,
            persisted,
        }
    }

    /// Sanitize, write and stage. Local failures are logged and swallowed.
    async fn record(&self, job: &JobDescriptor, content: &str) -> bool {
        let normalized = sanitize::strip(content);

        match self.store.save(job, &normalized).await {
            Ok(written) => {
                self.metrics.snapshot_written();
                debug!(identity = %written.identity, size = written.size, "Snapshot staged");
                true
            }
            Err(SnapshotError::Write { path, source }) => {
                error!(path = %path.display(), error = %source, "Failed to write snapshot");
                false
            }
            Err(SnapshotError::Stage { path, source }) => {
                error!(path = %path.display(), error = %source, "Failed to stage snapshot");
                false
            }
        }
    }
}
