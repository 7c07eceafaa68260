//! Worker pool scheduler
//!
//! Drains one cycle's job list across a fixed number of slots with pacing
//! between dispatches, and joins everything before handing back a
//! [`CycleReport`].

mod pool;
mod report;

pub use pool::{PoolConfig, WorkerPool};
pub use report::{CompletedJob, CycleReport};
