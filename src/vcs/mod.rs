//! Version control abstraction for the snapshot working tree
//!
//! The coordinator only needs four operations: make sure a repository
//! exists, check it is usable, stage one path and record a commit.

mod git;

pub use git::{CommandOutput, GitCli};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {code:?}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

pub type Result<T> = std::result::Result<T, VcsError>;

/// Version control operations over a single working tree
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Create the repository if needed; safe to call on an existing one
    async fn init(&self) -> Result<()>;

    /// Health gate; an error means the working tree cannot be used
    async fn status(&self) -> Result<()>;

    /// Stage one path, relative to the working tree root
    async fn add(&self, path: &Path) -> Result<()>;

    /// Record everything staged (and tracked modifications) as one revision.
    ///
    /// A commit with no changes is not an error.
    async fn commit(&self, message: &str) -> Result<()>;
}
