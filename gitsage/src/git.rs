//! The Git collaborator: a narrow trait and a `git` CLI implementation.
//!
//! Diff text is passed to the model verbatim; nothing here parses it.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::Error;

/// Which changes a command looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffScope {
    /// Changes in the index (`git diff --cached`).
    #[default]
    Staged,
    /// Changes in the work tree not yet staged (`git diff`).
    Unstaged,
}

impl fmt::Display for DiffScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Staged => "staged",
            Self::Unstaged => "unstaged",
        })
    }
}

/// One entry of `git log`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full commit hash.
    pub hash: String,
    /// First line of the message.
    pub subject: String,
    /// Author name.
    pub author: String,
    /// Author date, `YYYY-MM-DD`.
    pub date: String,
}

/// Read and write access to the repository the commands run against.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Whether the working directory is inside a Git work tree.
    async fn is_inside_work_tree(&self) -> Result<bool, Error>;

    /// Unified diff for `scope`.
    async fn diff(&self, scope: DiffScope) -> Result<String, Error>;

    /// Changes on `HEAD` since it forked from `base` (`git diff base...HEAD`).
    async fn branch_diff(&self, base: &str) -> Result<String, Error>;

    /// Up to `count` most recent commits on `HEAD`, newest first.
    async fn recent_commits(&self, count: usize) -> Result<Vec<CommitInfo>, Error>;

    /// Current branch name, empty when detached.
    async fn current_branch(&self) -> Result<String, Error>;

    /// Short repository name.
    async fn repo_name(&self) -> Result<String, Error>;

    /// Commit the staged changes with `message`.
    async fn commit(&self, message: &str) -> Result<(), Error>;
}

/// [`Repository`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    work_dir: PathBuf,
}

impl GitCli {
    /// Run `git` inside `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<String, Error> {
        tracing::trace!(?args, dir = %self.work_dir.display(), "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(".")
    }
}

#[async_trait]
impl Repository for GitCli {
    async fn is_inside_work_tree(&self) -> Result<bool, Error> {
        match self.git(&["rev-parse", "--is-inside-work-tree"]).await {
            Ok(out) => Ok(out.trim() == "true"),
            Err(err) => {
                tracing::debug!(error = %err, "work tree check failed");
                Ok(false)
            }
        }
    }

    async fn diff(&self, scope: DiffScope) -> Result<String, Error> {
        match scope {
            DiffScope::Staged => self.git(&["--no-pager", "diff", "--cached"]).await,
            DiffScope::Unstaged => self.git(&["--no-pager", "diff"]).await,
        }
    }

    async fn branch_diff(&self, base: &str) -> Result<String, Error> {
        let range = format!("{base}...HEAD");
        self.git(&["--no-pager", "diff", &range]).await
    }

    async fn recent_commits(&self, count: usize) -> Result<Vec<CommitInfo>, Error> {
        let limit = format!("-{count}");
        let log = self
            .git(&[
                "log",
                &limit,
                "--pretty=format:%H%x1f%s%x1f%an%x1f%ad",
                "--date=short",
            ])
            .await?;
        Ok(parse_log(&log))
    }

    async fn current_branch(&self) -> Result<String, Error> {
        Ok(self
            .git(&["branch", "--show-current"])
            .await?
            .trim()
            .to_string())
    }

    async fn repo_name(&self) -> Result<String, Error> {
        if let Ok(url) = self.git(&["remote", "get-url", "origin"]).await {
            if let Some(name) = repo_name_from_url(&url) {
                return Ok(name);
            }
        }
        let dir = std::fs::canonicalize(&self.work_dir).unwrap_or_else(|_| self.work_dir.clone());
        Ok(dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".into()))
    }

    async fn commit(&self, message: &str) -> Result<(), Error> {
        self.git(&["commit", "-m", message]).await?;
        Ok(())
    }
}

/// Parse `git log` output written with unit-separated `%H %s %an %ad` fields.
fn parse_log(log: &str) -> Vec<CommitInfo> {
    log.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split('\x1f');
            Some(CommitInfo {
                hash: fields.next()?.to_string(),
                subject: fields.next()?.to_string(),
                author: fields.next().unwrap_or_default().to_string(),
                date: fields.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Last path segment of a remote URL without its `.git` suffix.
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    let last = url.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}
