pub mod config;
pub mod coordinator;
pub mod humanize;
pub mod jobs;
pub mod observability;
pub mod sanitize;
pub mod scheduler;
pub mod shutdown;
pub mod storage;
pub mod vcs;
pub mod worker;
