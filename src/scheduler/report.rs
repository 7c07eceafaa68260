use crate::worker::{FetchOutcome, JobReport};

/// One finished job together with where it ran
#[derive(Debug, Clone)]
pub struct CompletedJob {
    /// Position in the cycle's job list
    pub index: usize,
    pub slot: usize,
    /// `None` when the job task panicked
    pub report: Option<JobReport>,
}

/// Everything the pool observed during one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub dispatched: usize,
    /// In join order, not list order
    pub completed: Vec<CompletedJob>,
}

impl CycleReport {
    pub fn succeeded(&self) -> usize {
        self.reports()
            .filter(|r| matches!(r.outcome, FetchOutcome::Success { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.completed.len() - self.succeeded()
    }

    pub fn persisted(&self) -> usize {
        self.reports().filter(|r| r.persisted).count()
    }

    /// Job indices handled by `slot`, in the order they ran
    pub fn jobs_on_slot(&self, slot: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .completed
            .iter()
            .filter(|c| c.slot == slot)
            .map(|c| c.index)
            .collect();
        indices.sort_unstable();
        indices
    }

    fn reports(&self) -> impl Iterator<Item = &JobReport> {
        self.completed.iter().filter_map(|c| c.report.as_ref())
    }
}
