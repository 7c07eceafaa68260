//! Fetch worker
//!
//! HTTP transport plus the executor that turns one job descriptor into a
//! fetched, sanitized and staged snapshot.

pub mod executor;
pub mod http;

pub use executor::{FetchOutcome, JobExecutor, JobReport, SNAPSHOT_STATUS};
pub use http::{FetchError, FetchResponse, Fetcher, HttpConfig, HttpFetcher, form_pairs};
