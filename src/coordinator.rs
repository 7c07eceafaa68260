//! Cycle coordinator
//!
//! Owns the outer loop: reload the job list, run one batch through the
//! worker pool, commit the batch as a single revision, sleep, repeat.
//! Cancellation is only observed between cycles so an in-flight batch is
//! always committed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::jobs::{FileJobSource, JobSource, JobSourceError};
use crate::observability::Metrics;
use crate::scheduler::{CycleReport, PoolConfig, WorkerPool};
use crate::storage::{self, SnapshotStore};
use crate::vcs::{GitCli, VcsError, VersionControl};
use crate::worker::{FetchError, HttpConfig, HttpFetcher, JobExecutor};

/// Startup failures; the process cannot continue
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("failed to create snapshot directory {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("version control is not usable: {0}")]
    VcsUnhealthy(#[source] VcsError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] FetchError),
}

/// Failures that abort a single cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("job list unavailable: {0}")]
    JobList(#[from] JobSourceError),
}

/// Outcome of one completed cycle
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub report: CycleReport,
    pub commit_message: String,
    pub committed: bool,
}

/// Hands out strictly increasing unix-second commit stamps
#[derive(Debug, Default)]
pub struct CommitClock {
    last: Option<i64>,
}

impl CommitClock {
    pub fn next(&mut self, now: i64) -> i64 {
        let stamp = match self.last {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}

pub struct CycleCoordinator {
    snapshots_dir: PathBuf,
    polling_interval: Duration,
    jobs: Arc<dyn JobSource>,
    pool: WorkerPool,
    vcs: Arc<dyn VersionControl>,
    metrics: Arc<Metrics>,
    clock: CommitClock,
}

impl CycleCoordinator {
    pub fn new(
        snapshots_dir: impl Into<PathBuf>,
        polling_interval: Duration,
        jobs: Arc<dyn JobSource>,
        pool: WorkerPool,
        vcs: Arc<dyn VersionControl>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            snapshots_dir: snapshots_dir.into(),
            polling_interval,
            jobs,
            pool,
            vcs,
            metrics,
            clock: CommitClock::default(),
        }
    }

    /// Wire the production collaborators: git, reqwest and the JSON job file
    pub fn from_config(config: &Config) -> Result<Self, CoordinatorError> {
        let metrics = Arc::new(Metrics::new());
        let snapshots_dir = config.snapshots.dir.clone();

        let vcs: Arc<dyn VersionControl> =
            Arc::new(GitCli::from_config(&config.vcs, snapshots_dir.clone()));
        let store = SnapshotStore::new(snapshots_dir.clone(), Arc::clone(&vcs));

        let fetcher = HttpFetcher::new(HttpConfig {
            user_agent: config.requests.user_agent.clone(),
            ..HttpConfig::default()
        })?;

        let executor = Arc::new(JobExecutor::new(
            Arc::new(fetcher),
            store,
            config.requests.timeout.as_duration(),
            Arc::clone(&metrics),
        ));

        let pool = WorkerPool::new(
            executor,
            PoolConfig {
                max_workers: config.scheduler.max_threads,
                each_interval: config.scheduler.each_interval.as_duration(),
            },
            Arc::clone(&metrics),
        );

        let jobs = Arc::new(FileJobSource::new(config.requests.jobs_file.clone()));

        Ok(Self::new(
            snapshots_dir,
            config.scheduler.polling_interval.as_duration(),
            jobs,
            pool,
            vcs,
            metrics,
        ))
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Make sure the working tree exists and version control is usable
    pub async fn prepare(&self) -> Result<(), CoordinatorError> {
        storage::ensure_dir(&self.snapshots_dir)
            .await
            .map_err(|source| CoordinatorError::Storage {
                path: self.snapshots_dir.clone(),
                source,
            })?;

        // Re-initializing an existing repository is harmless
        if let Err(e) = self.vcs.init().await {
            warn!(error = %e, "Version control init failed");
        }

        self.vcs
            .status()
            .await
            .map_err(CoordinatorError::VcsUnhealthy)?;

        info!(dir = %self.snapshots_dir.display(), "Version control is OK");
        Ok(())
    }

    /// Load jobs, run them all, commit once
    pub async fn run_cycle(&mut self) -> Result<CycleSummary, CycleError> {
        let cycle_id = Uuid::now_v7();
        let span = info_span!("cycle", cycle_id = %cycle_id);

        async {
            let jobs = self.jobs.load().await?;
            debug!(jobs = jobs.len(), "Starting cycle");

            let report = self.pool.run_cycle(jobs).await;

            let stamp = self.clock.next(OffsetDateTime::now_utc().unix_timestamp());
            let commit_message = stamp.to_string();
            let committed = match self.vcs.commit(&commit_message).await {
                Ok(()) => {
                    self.metrics.commit_recorded();
                    true
                }
                Err(e) => {
                    warn!(error = %e, message = %commit_message, "Commit failed");
                    false
                }
            };

            info!(
                dispatched = report.dispatched,
                succeeded = report.succeeded(),
                failed = report.failed(),
                persisted = report.persisted(),
                commit = %commit_message,
                "Cycle complete"
            );
            debug!(metrics = ?self.metrics.snapshot(), "Totals");

            Ok::<_, CycleError>(CycleSummary {
                cycle_id,
                report,
                commit_message,
                committed,
            })
        }
        .instrument(span)
        .await
    }

    /// Run until `shutdown` is cancelled; returns the number of completed cycles
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<usize, CoordinatorError> {
        self.prepare().await?;

        let mut completed = 0;
        loop {
            if shutdown.is_cancelled() {
                info!("Shutdown requested, not starting another cycle");
                break;
            }

            match self.run_cycle().await {
                Ok(_) => completed += 1,
                Err(e) => {
                    self.metrics.cycle_skipped();
                    error!(error = %e, "Cycle aborted");
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping after committed cycle");
                    break;
                }
                _ = tokio::time::sleep(self.polling_interval) => {}
            }
        }

        info!(cycles = completed, "Stopped");
        Ok(completed)
    }
}
