//! Snapshot storage inside the version-controlled working tree
//!
//! One file per job at `<dir>/<identity>.html`, overwritten every cycle.
//! History lives only in version control.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::jobs::JobDescriptor;
use crate::vcs::{VcsError, VersionControl};

pub const SNAPSHOT_EXTENSION: &str = "html";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stage {path}: {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: VcsError,
    },
}

/// Storage result type
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Metadata returned after a write
#[derive(Debug, Clone)]
pub struct WrittenSnapshot {
    pub identity: String,
    pub path: PathBuf,
    pub size: usize,
}

/// Writes snapshots and stages them for the next commit
#[derive(Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    vcs: Arc<dyn VersionControl>,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, vcs: Arc<dyn VersionControl>) -> Self {
        Self {
            dir: dir.into(),
            vcs,
        }
    }

    /// Filename stem for a job
    pub fn identity_for(job: &JobDescriptor) -> String {
        job.identity()
    }

    /// File name relative to the working tree root
    pub fn file_name(identity: &str) -> PathBuf {
        PathBuf::from(format!("{}.{}", identity, SNAPSHOT_EXTENSION))
    }

    /// Overwrite the job's snapshot with `content`
    pub async fn persist(&self, job: &JobDescriptor, content: &str) -> Result<WrittenSnapshot> {
        let identity = Self::identity_for(job);
        let path = self.dir.join(Self::file_name(&identity));

        tokio::fs::write(&path, content.as_bytes())
            .await
            .map_err(|source| SnapshotError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(identity = %identity, path = %path.display(), size = content.len(), "Snapshot written");

        Ok(WrittenSnapshot {
            identity,
            path,
            size: content.len(),
        })
    }

    /// Mark a previously written snapshot for inclusion in the next commit
    pub async fn stage(&self, identity: &str) -> Result<()> {
        let relative = Self::file_name(identity);

        self.vcs
            .add(&relative)
            .await
            .map_err(|source| SnapshotError::Stage {
                path: relative,
                source,
            })
    }

    /// Write then stage
    pub async fn save(&self, job: &JobDescriptor, content: &str) -> Result<WrittenSnapshot> {
        let written = self.persist(job, content).await?;
        self.stage(&written.identity).await?;
        Ok(written)
    }
}

/// Create the snapshot directory (and parents); an existing directory is fine
pub async fn ensure_dir(dir: &Path) -> std::io::Result<bool> {
    if tokio::fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Ok(false);
    }

    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => {
            info!(dir = %dir.display(), "Created snapshot directory");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove every file and subdirectory under `dir`, keeping `dir` itself.
///
/// Best-effort: a missing directory counts as already empty and individual
/// removal failures are logged and skipped. Returns the number of top-level
/// entries removed.
pub async fn reset(dir: &Path) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Nothing to reset");
            return 0;
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to list snapshot directory");
            return 0;
        }
    };

    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                break;
            }
        };

        let path = entry.path();
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        let result = if is_dir {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };

        match result {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove"),
        }
    }

    info!(dir = %dir.display(), removed, "Removed all snapshot files");
    removed
}
