//! Git publishing of a harvested directory
//!
//! After a successful fetch the target directory is committed and pushed to a
//! remote repository by running the `git` binary. Connection details come
//! from the environment:
//!
//! | Variable      | Meaning                               |
//! |---------------|---------------------------------------|
//! | `CNNVD_URL`   | HTTPS URL of the remote repository    |
//! | `REMOTE_NAME` | Remote name (default `origin`)        |
//! | `NAME`        | Commit author name                    |
//! | `EMAIL`       | Commit author email                   |
//! | `TOKEN`       | Access token injected into the URL    |

use crate::resume::lock::LOCK_FILE;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Remote name used when `REMOTE_NAME` is unset
pub const DEFAULT_REMOTE_NAME: &str = "origin";

/// Ignore file at the root of the published working tree
pub const GITIGNORE_FILE: &str = ".gitignore";

/// One git invocation of the publish sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitStep {
    /// `git init`
    Init,
    /// `git remote add` / `git remote set-url`
    Remote,
    /// `git add -A`
    Add,
    /// `git status --porcelain`
    Status,
    /// `git commit`
    Commit,
    /// `git push`
    Push,
}

impl fmt::Display for GitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GitStep::Init => "init",
            GitStep::Remote => "remote",
            GitStep::Add => "add",
            GitStep::Status => "status",
            GitStep::Commit => "commit",
            GitStep::Push => "push",
        };
        write!(f, "{s}")
    }
}

/// Publishing errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Required environment variable is not set
    #[error("missing git configuration: {0} is not set")]
    MissingConfig(&'static str),

    /// `.gitignore` could not be read or updated
    #[error("failed to update {path}: {source}")]
    IgnoreFile {
        /// Ignore file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// `git` could not be started
    #[error("failed to run git {step}: {source}")]
    Spawn {
        /// Step being run
        step: GitStep,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// `git` exited with a failure status
    #[error("git {step} failed (exit code {exit_code:?}): {stderr}")]
    CommandFailed {
        /// Step being run
        step: GitStep,
        /// Exit code, if the process exited normally
        exit_code: Option<i32>,
        /// Captured standard error (token redacted)
        stderr: String,
    },
}

/// Remote repository settings
#[derive(Clone)]
pub struct GitConfig {
    /// HTTPS URL of the remote repository
    pub url: String,
    /// Working tree to publish
    pub dir: PathBuf,
    /// Remote name
    pub remote_name: String,
    /// Commit author name
    pub name: String,
    /// Commit author email
    pub email: String,
    /// Access token
    pub token: String,
}

impl fmt::Debug for GitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitConfig")
            .field("url", &self.url)
            .field("dir", &self.dir)
            .field("remote_name", &self.remote_name)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl GitConfig {
    /// Read the settings from the process environment
    pub fn from_env(dir: impl Into<PathBuf>) -> Result<Self, PublishError> {
        Self::from_lookup(dir, |key| std::env::var(key).ok())
    }

    /// Read the settings through an arbitrary variable lookup
    pub fn from_lookup<F>(dir: impl Into<PathBuf>, lookup: F) -> Result<Self, PublishError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            url: get("CNNVD_URL").ok_or(PublishError::MissingConfig("CNNVD_URL"))?,
            dir: dir.into(),
            remote_name: get("REMOTE_NAME").unwrap_or_else(|| DEFAULT_REMOTE_NAME.to_string()),
            name: get("NAME").ok_or(PublishError::MissingConfig("NAME"))?,
            email: get("EMAIL").ok_or(PublishError::MissingConfig("EMAIL"))?,
            token: get("TOKEN").unwrap_or_default(),
        })
    }

    /// Remote URL with the token embedded as credentials
    ///
    /// URLs that are not `https://` or already carry credentials are returned unchanged.
    pub fn authenticated_url(&self) -> String {
        match self.url.strip_prefix("https://") {
            Some(rest) if !self.token.is_empty() && !rest.contains('@') => {
                format!("https://{}@{rest}", self.token)
            }
            _ => self.url.clone(),
        }
    }

    fn redact(&self, text: &str) -> String {
        if self.token.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.token, "***")
        }
    }
}

/// Commits and pushes a target directory
#[derive(Debug, Clone)]
pub struct GitPublisher {
    config: GitConfig,
}

impl GitPublisher {
    /// Create a publisher
    pub fn new(config: GitConfig) -> Self {
        Self { config }
    }

    /// Stage everything, commit and push
    ///
    /// A clean working tree is not an error: the commit step is skipped and
    /// the push still runs.
    pub async fn publish(&self, now: DateTime<Utc>) -> Result<(), PublishError> {
        let dir = &self.config.dir;

        if !dir.join(".git").exists() {
            self.git(GitStep::Init, &["init"]).await?;
        }
        if ensure_ignored(dir, LOCK_FILE)? {
            debug!(entry = LOCK_FILE, "Added run lock to {GITIGNORE_FILE}");
        }
        self.configure_remote().await?;

        self.git(GitStep::Add, &["add", "-A"]).await?;

        let message = commit_message(now);
        let name = format!("user.name={}", self.config.name);
        let email = format!("user.email={}", self.config.email);
        let status = self.git(GitStep::Status, &["status", "--porcelain"]).await?;
        if status.trim().is_empty() {
            info!(dir = %dir.display(), "Nothing to commit");
        } else {
            self.git(
                GitStep::Commit,
                &["-c", &name, "-c", &email, "commit", "-m", &message],
            )
            .await?;
        }

        self.git(GitStep::Push, &["push", &self.config.remote_name, "HEAD"])
            .await?;

        info!(url = %self.config.url, remote = %self.config.remote_name, "Pushed to remote repository");
        Ok(())
    }

    /// Point the configured remote at the authenticated URL
    async fn configure_remote(&self) -> Result<(), PublishError> {
        let remote = self.config.remote_name.as_str();
        let url = self.config.authenticated_url();
        let existing = self.git(GitStep::Remote, &["remote"]).await?;

        if existing.lines().any(|line| line.trim() == remote) {
            self.git(GitStep::Remote, &["remote", "set-url", remote, &url])
                .await?;
        } else {
            self.git(GitStep::Remote, &["remote", "add", remote, &url])
                .await?;
        }
        Ok(())
    }

    /// Run one git command in the target directory, returning its stdout
    async fn git(&self, step: GitStep, args: &[&str]) -> Result<String, PublishError> {
        debug!(step = %step, dir = %self.config.dir.display(), "Running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.config.dir)
            .output()
            .await
            .map_err(|source| PublishError::Spawn { step, source })?;

        if !output.status.success() {
            return Err(PublishError::CommandFailed {
                step,
                exit_code: output.status.code(),
                stderr: self
                    .config
                    .redact(String::from_utf8_lossy(&output.stderr).trim()),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Working tree being published
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }
}

/// Make sure `entry` is listed in the working tree's `.gitignore`
///
/// Returns `true` when the file was created or extended.
pub fn ensure_ignored(dir: &Path, entry: &str) -> Result<bool, PublishError> {
    let path = dir.join(GITIGNORE_FILE);
    let mut contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => return Err(PublishError::IgnoreFile { path, source }),
    };

    if contents.lines().any(|line| line.trim() == entry) {
        return Ok(false);
    }
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(entry);
    contents.push('\n');

    std::fs::write(&path, contents).map_err(|source| PublishError::IgnoreFile {
        path: path.clone(),
        source,
    })?;
    Ok(true)
}

/// Commit message for a harvest finished at `now`
pub fn commit_message(now: DateTime<Utc>) -> String {
    format!("update CNNVD vulnerabilities {}", now.format("%Y-%m-%d %H:%M:%S"))
}
