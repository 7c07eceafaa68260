use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use super::descriptor::JobDescriptor;

#[derive(Debug, Error)]
pub enum JobSourceError {
    #[error("failed to read job list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed job list {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Supplies the ordered job list for a cycle.
///
/// Implementations must read fresh on every call; edits to the underlying
/// list take effect on the next cycle.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn load(&self) -> Result<Vec<JobDescriptor>, JobSourceError>;
}

/// JSON array of job descriptors stored on disk
#[derive(Debug, Clone)]
pub struct FileJobSource {
    path: PathBuf,
}

impl FileJobSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl JobSource for FileJobSource {
    async fn load(&self) -> Result<Vec<JobDescriptor>, JobSourceError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|source| JobSourceError::Read {
                path: self.path.clone(),
                source,
            })?;

        let jobs: Vec<JobDescriptor> =
            serde_json::from_slice(&raw).map_err(|source| JobSourceError::Parse {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), count = jobs.len(), "Loaded job list");
        Ok(jobs)
    }
}
