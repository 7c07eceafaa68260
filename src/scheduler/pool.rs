use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info_span};

use super::report::{CompletedJob, CycleReport};
use crate::jobs::JobDescriptor;
use crate::observability::Metrics;
use crate::worker::{JobExecutor, JobReport};

/// Pool settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_workers: usize,
    /// Delay before every dispatch except the first of a cycle
    pub each_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            each_interval: Duration::from_secs(1),
        }
    }
}

/// Job currently occupying a slot
struct Occupant {
    index: usize,
    handle: JoinHandle<JobReport>,
}

/// Fixed set of worker slots.
///
/// Job `idx` always runs on slot `idx % max_workers`. Dispatching to a slot
/// that is still busy waits for its occupant to finish first, which holds
/// back every later dispatch too: at most `max_workers` jobs run at once and
/// each slot runs its jobs in list order.
pub struct WorkerPool {
    executor: Arc<JobExecutor>,
    config: PoolConfig,
    metrics: Arc<Metrics>,
}

impl WorkerPool {
    pub fn new(executor: Arc<JobExecutor>, config: PoolConfig, metrics: Arc<Metrics>) -> Self {
        // A zero-width pool could never dispatch
        let config = PoolConfig {
            max_workers: config.max_workers.max(1),
            ..config
        };

        Self {
            executor,
            config,
            metrics,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.config.max_workers
    }

    /// Run every job once and return after all of them have finished
    pub async fn run_cycle(&self, jobs: Vec<JobDescriptor>) -> CycleReport {
        let mut slots: Vec<Option<Occupant>> = (0..self.config.max_workers).map(|_| None).collect();
        let mut report = CycleReport::default();

        for (index, job) in jobs.into_iter().enumerate() {
            if index > 0 && !self.config.each_interval.is_zero() {
                tokio::time::sleep(self.config.each_interval).await;
            }

            let slot = index % self.config.max_workers;

            // Back-pressure: the slot's previous job must finish first
            if let Some(previous) = slots[slot].take() {
                debug!(slot, waiting_on = previous.index, next = index, "Slot busy, joining");
                report.completed.push(join(previous, slot).await);
            }

            let executor = Arc::clone(&self.executor);
            let span = info_span!("job", slot, index, url = %job.url);
            let handle = tokio::spawn(async move { executor.run(&job).await }.instrument(span));

            slots[slot] = Some(Occupant { index, handle });
            report.dispatched += 1;
            self.metrics.job_dispatched();
        }

        for (slot, occupant) in slots.into_iter().enumerate() {
            if let Some(occupant) = occupant {
                report.completed.push(join(occupant, slot).await);
            }
        }

        report
    }
}

async fn join(occupant: Occupant, slot: usize) -> CompletedJob {
    let report = match occupant.handle.await {
        Ok(report) => Some(report),
        Err(e) => {
            error!(slot, index = occupant.index, error = %e, "Job task failed");
            None
        }
    };

    CompletedJob {
        index: occupant.index,
        slot,
        report,
    }
}
