use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, trace};

use crate::config::GitConfig;

/// Failure of a version-control operation
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("no repository at {}", .0.display())]
    RepositoryNotFound(PathBuf),

    #[error("directory exists but is not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("repository at {} has no remotes", .0.display())]
    NoRemote(PathBuf),

    #[error("git {operation} failed: {stderr}")]
    CommandFailed {
        operation: &'static str,
        stderr: String,
    },

    #[error("failed to execute git {operation}: {source}")]
    Spawn {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("git {operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VcsError {
    /// True when the target directory simply isn't there
    pub fn is_missing_repository(&self) -> bool {
        matches!(self, VcsError::RepositoryNotFound(_))
    }
}

/// The three primitives the batch runner needs from version control
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `url` into `dest`
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), VcsError>;

    /// Pull the first remote of the repository at `dest`
    async fn pull(&self, dest: &Path) -> Result<(), VcsError>;

    /// Write a tar archive of `HEAD` of the repository at `repo` to `output`
    async fn archive(&self, repo: &Path, output: &Path) -> Result<(), VcsError>;
}

/// Git operations handler backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitClient {
    config: GitConfig,
}

impl Default for GitClient {
    fn default() -> Self {
        Self::new(GitConfig::default())
    }
}

impl GitClient {
    /// Create a new Git client with the given configuration
    pub fn new(config: GitConfig) -> Self {
        Self { config }
    }

    /// Make sure `path` holds a working copy before operating on it
    fn ensure_repository(path: &Path) -> Result<(), VcsError> {
        if !path.exists() {
            return Err(VcsError::RepositoryNotFound(path.to_path_buf()));
        }
        if !path.join(".git").exists() {
            return Err(VcsError::NotARepository(path.to_path_buf()));
        }
        Ok(())
    }

    /// Run git with `args`, failing on a non-zero exit status
    async fn run_git(
        &self,
        operation: &'static str,
        args: &[&OsStr],
        cwd: Option<&Path>,
    ) -> Result<Output, VcsError> {
        let mut command = AsyncCommand::new(&self.config.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        trace!(
            program = %self.config.binary,
            args = ?args,
            cwd = ?cwd,
            "exec"
        );

        let output = match self.config.timeout {
            Some(seconds) => {
                match tokio::time::timeout(Duration::from_secs(seconds), command.output()).await {
                    Ok(result) => result,
                    Err(_) => return Err(VcsError::Timeout { operation, seconds }),
                }
            }
            None => command.output().await,
        }
        .map_err(|source| VcsError::Spawn { operation, source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(VcsError::CommandFailed { operation, stderr });
        }

        Ok(output)
    }

    /// Name of the first configured remote
    async fn first_remote(&self, path: &Path) -> Result<String, VcsError> {
        let output = self.run_git("remote", &[OsStr::new("remote")], Some(path)).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| VcsError::NoRemote(path.to_path_buf()))
    }
}

#[async_trait]
impl Vcs for GitClient {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), VcsError> {
        debug!("Cloning {} -> {}", url, dest.display());

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        self.run_git(
            "clone",
            &[OsStr::new("clone"), OsStr::new(url), dest.as_os_str()],
            None,
        )
        .await?;

        Ok(())
    }

    async fn pull(&self, dest: &Path) -> Result<(), VcsError> {
        Self::ensure_repository(dest)?;

        let remote = self.first_remote(dest).await?;
        debug!("Pulling {} from {}", dest.display(), remote);

        let mut args = vec![OsStr::new("pull"), OsStr::new(&remote)];
        if self.config.fast_forward_only {
            args.push(OsStr::new("--ff-only"));
        }

        self.run_git("pull", &args, Some(dest)).await?;
        Ok(())
    }

    async fn archive(&self, repo: &Path, output: &Path) -> Result<(), VcsError> {
        Self::ensure_repository(repo)?;

        // git runs inside the repository, so a relative output must be anchored first
        let output = if output.is_absolute() {
            output.to_path_buf()
        } else {
            std::env::current_dir()?.join(output)
        };
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut output_arg = OsString::from("--output=");
        output_arg.push(&output);

        debug!("Archiving {} -> {}", repo.display(), output.display());
        self.run_git(
            "archive",
            &[
                OsStr::new("archive"),
                OsStr::new("--format=tar"),
                output_arg.as_os_str(),
                OsStr::new("HEAD"),
            ],
            Some(repo),
        )
        .await?;

        Ok(())
    }
}
