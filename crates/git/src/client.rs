use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    tokio::process::Command,
    tracing::{debug, info},
};

use crate::error::{Error, Result};

/// Version-control operations needed to keep a local mirror of a catalog.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Shallow-clone `url` into `to`. The parent of `to` is created if needed.
    async fn clone_repo(&self, url: &str, to: &Path) -> Result<()>;

    /// Fast-forward the checkout at `at` to its upstream.
    async fn pull(&self, at: &Path) -> Result<()>;

    async fn is_git_repository(&self, at: &Path) -> bool;
}

/// Check if a directory is a git checkout.
pub fn is_git_repo(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// [`GitClient`] that shells out to the `git` binary.
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    /// Use a specific git executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitClient for GitCli {
    async fn clone_repo(&self, url: &str, to: &Path) -> Result<()> {
        validate_url(url)?;

        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::CloneFailed(format!("{}: {e}", parent.display())))?;
        }

        let output = Command::new(&self.program)
            .args(["clone", "--depth", "1", "--quiet", url])
            .arg(to)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|source| Error::command_execution("git clone", source))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CloneFailed(stderr.trim().to_string()));
        }

        info!(%url, dest = %to.display(), "cloned repository");
        Ok(())
    }

    async fn pull(&self, at: &Path) -> Result<()> {
        if !at.is_dir() {
            return Err(Error::directory_not_found(at));
        }

        let output = Command::new(&self.program)
            .args(["pull", "--ff-only", "--quiet"])
            .current_dir(at)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|source| Error::command_execution("git pull", source))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::PullFailed(stderr.trim().to_string()));
        }

        debug!(dir = %at.display(), "pulled repository");
        Ok(())
    }

    async fn is_git_repository(&self, at: &Path) -> bool {
        is_git_repo(at)
    }
}

/// Accept the URL shapes git itself understands for remotes.
fn validate_url(url: &str) -> Result<()> {
    let url = url.trim();
    let has_scheme = ["https://", "http://", "ssh://", "git://", "file://"]
        .iter()
        .any(|scheme| url.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()));
    let scp_like = url.starts_with("git@") && url.contains(':');
    if has_scheme || scp_like {
        Ok(())
    } else {
        Err(Error::InvalidUrl(url.to_string()))
    }
}
