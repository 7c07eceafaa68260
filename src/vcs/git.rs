//! `git` command-line driver

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Result, VcsError, VersionControl};
use crate::config::VcsConfig;

/// Captured result of one git invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub command: String,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn into_result(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(VcsError::Failed {
                command: self.command,
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs git against one working tree.
///
/// Staging calls are serialized: git refuses concurrent writers to the
/// index (`index.lock`), and workers stage from several tasks at once.
#[derive(Debug)]
pub struct GitCli {
    program: String,
    work_tree: PathBuf,
    identity: Vec<String>,
    index: Mutex<()>,
}

impl GitCli {
    pub fn new(program: impl Into<String>, work_tree: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_tree: work_tree.into(),
            identity: Vec::new(),
            index: Mutex::new(()),
        }
    }

    pub fn from_config(config: &VcsConfig, work_tree: impl Into<PathBuf>) -> Self {
        Self::new(config.program.clone(), work_tree)
            .with_identity(config.author_name.as_deref(), config.author_email.as_deref())
    }

    /// Committer identity passed as `-c user.name=... -c user.email=...`
    pub fn with_identity(mut self, name: Option<&str>, email: Option<&str>) -> Self {
        self.identity.clear();
        if let Some(name) = name {
            self.identity.push("-c".to_string());
            self.identity.push(format!("user.name={}", name));
        }
        if let Some(email) = email {
            self.identity.push("-c".to_string());
            self.identity.push(format!("user.email={}", email));
        }
        self
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    /// Run git in the working tree and capture its output, whatever the exit code
    pub async fn exec<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command = std::iter::once(self.program.clone())
            .chain(args.iter().map(|a| a.as_ref().to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ");

        let output = Command::new(&self.program)
            .args(&self.identity)
            .args(&args)
            .current_dir(&self.work_tree)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| VcsError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            command,
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run and surface the output on the log stream
    async fn exec_logged<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.exec(args).await?;
        if output.success() {
            let stdout = output.stdout.trim();
            if !stdout.is_empty() {
                info!(command = %output.command, "{}", stdout);
            }
        } else {
            warn!(command = %output.command, code = ?output.code, "{}", output.stderr.trim());
        }
        Ok(output)
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn init(&self) -> Result<()> {
        self.exec_logged(["init"]).await?.into_result()?;
        Ok(())
    }

    async fn status(&self) -> Result<()> {
        let output = self.exec(["status", "--porcelain"]).await?.into_result()?;
        debug!(changes = output.stdout.lines().count(), "git status ok");
        Ok(())
    }

    async fn add(&self, path: &Path) -> Result<()> {
        let _guard = self.index.lock().await;
        self.exec([OsStr::new("add"), OsStr::new("--"), path.as_os_str()])
            .await?
            .into_result()?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<()> {
        let _guard = self.index.lock().await;
        let output = self
            .exec_logged(["commit", "-a", "--allow-empty", "-m", message])
            .await?;

        if !output.success() && output.stdout.contains("nothing to commit") {
            debug!(message, "Nothing to commit");
            return Ok(());
        }
        output.into_result()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_args() {
        let git = GitCli::new("git", "/tmp/x").with_identity(Some("slowmo"), Some("s@localhost"));
        assert_eq!(
            git.identity,
            ["-c", "user.name=slowmo", "-c", "user.email=s@localhost"]
        );

        let anonymous = GitCli::new("git", "/tmp/x").with_identity(None, None);
        assert!(anonymous.identity.is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = VcsConfig {
            program: "/usr/bin/git".to_string(),
            author_name: Some("bot".to_string()),
            author_email: None,
        };
        let git = GitCli::from_config(&config, "files");

        assert_eq!(git.program, "/usr/bin/git");
        assert_eq!(git.work_tree(), Path::new("files"));
        assert_eq!(git.identity, ["-c", "user.name=bot"]);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let git = GitCli::new("slowmo-definitely-not-a-real-binary", temp_dir.path());

        let result = git.status().await;
        assert!(matches!(result, Err(VcsError::Spawn { .. })));
    }

    #[test]
    fn test_failed_output_maps_to_error() {
        let output = CommandOutput {
            command: "git status".to_string(),
            code: Some(128),
            stdout: String::new(),
            stderr: "fatal: not a git repository\n".to_string(),
        };

        match output.into_result() {
            Err(VcsError::Failed { code, stderr, .. }) => {
                assert_eq!(code, Some(128));
                assert_eq!(stderr, "fatal: not a git repository");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
