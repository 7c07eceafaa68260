use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub snapshots: SnapshotConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub requests: RequestConfig,
    #[serde(default)]
    pub vcs: VcsConfig,
}

/// Where snapshot files live (the version-controlled working tree)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_dir")]
    pub dir: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: default_snapshot_dir(),
        }
    }
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("files")
}

/// Worker pool sizing and cadence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Number of worker slots (jobs running at once)
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
    /// Pause before each dispatch except the first of a cycle
    #[serde(default = "default_each_interval")]
    pub each_interval: HumanDuration,
    /// Pause between the commit of one cycle and the start of the next
    #[serde(default = "default_polling_interval")]
    pub polling_interval: HumanDuration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_threads: default_max_threads(),
            each_interval: default_each_interval(),
            polling_interval: default_polling_interval(),
        }
    }
}

fn default_max_threads() -> usize {
    4
}

fn default_each_interval() -> HumanDuration {
    HumanDuration::from_secs(1)
}

fn default_polling_interval() -> HumanDuration {
    HumanDuration::from_secs(60)
}

/// Outbound request settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestConfig {
    #[serde(default = "default_timeout")]
    pub timeout: HumanDuration,
    /// JSON job list, re-read at the top of every cycle
    #[serde(default = "default_jobs_file")]
    pub jobs_file: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            jobs_file: default_jobs_file(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_jobs_file() -> PathBuf {
    PathBuf::from("requests.json")
}

fn default_user_agent() -> String {
    concat!("slowmo/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Version control driver settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VcsConfig {
    #[serde(default = "default_vcs_program")]
    pub program: String,
    /// Committer identity, passed as `-c user.name=...` when set
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            program: default_vcs_program(),
            author_name: None,
            author_email: None,
        }
    }
}

fn default_vcs_program() -> String {
    "git".to_string()
}
