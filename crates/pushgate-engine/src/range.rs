//! Commit range resolution through git.
//!
//! Every call goes through a [`ProcessRunner`] with the configured timeout, so
//! a wedged repository turns into [`RangeError::Timeout`] instead of a hung
//! push.

use pushgate_runner::{CommandSpec, ProcessRunner, RunnerError};
use pushgate_utils::error::RangeError;
use pushgate_utils::types::{ChangeSet, is_null_sha};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Which commits a ref update (or a manual run) covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitRange {
    /// Branch deletion; nothing to validate.
    Deletion,
    /// New branch: the full ancestry of `local`.
    Ancestry { local: String },
    /// `remote..local`, excluding what the remote already has.
    Between { remote: String, local: String },
    /// A user-supplied `A..B` expression or a single revision.
    Expression(String),
}

impl CommitRange {
    /// Range for one pre-push record.
    #[must_use]
    pub fn for_update(local_sha: &str, remote_sha: &str) -> Self {
        if is_null_sha(local_sha) {
            Self::Deletion
        } else if is_null_sha(remote_sha) {
            Self::Ancestry {
                local: local_sha.to_string(),
            }
        } else {
            Self::Between {
                remote: remote_sha.to_string(),
                local: local_sha.to_string(),
            }
        }
    }

    /// Revision argument handed to `git log`; `None` for deletions.
    ///
    /// A bare revision selects that single commit (`rev^!`).
    #[must_use]
    pub fn rev_arg(&self) -> Option<String> {
        match self {
            Self::Deletion => None,
            Self::Ancestry { local } => Some(local.clone()),
            Self::Between { remote, local } => Some(format!("{remote}..{local}")),
            Self::Expression(expr) if expr.contains("..") => Some(expr.clone()),
            Self::Expression(rev) => Some(format!("{rev}^!")),
        }
    }
}

impl fmt::Display for CommitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deletion => f.write_str("(branch deletion)"),
            Self::Ancestry { local } => write!(f, "{local} (new branch, full ancestry)"),
            Self::Between { remote, local } => write!(f, "{remote}..{local}"),
            Self::Expression(expr) => f.write_str(expr),
        }
    }
}

/// Thin git client for the queries the gate needs.
pub struct GitClient<R: ProcessRunner> {
    runner: R,
    repo_root: PathBuf,
    timeout: Duration,
}

impl<R: ProcessRunner> GitClient<R> {
    pub fn new(runner: R, repo_root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            runner,
            repo_root: repo_root.into(),
            timeout,
        }
    }

    /// Changed files for one ref update.
    ///
    /// A deletion yields an empty set without running git.
    pub fn resolve(&self, local_sha: &str, remote_sha: &str) -> Result<ChangeSet, RangeError> {
        self.changed_files(&CommitRange::for_update(local_sha, remote_sha))
    }

    /// Every path touched by any commit in `range`, in first-seen order.
    ///
    /// Merge commits list what they change relative to their first parent,
    /// so files added or edited while resolving a merge are included.
    pub fn changed_files(&self, range: &CommitRange) -> Result<ChangeSet, RangeError> {
        let Some(rev) = range.rev_arg() else {
            return Ok(ChangeSet::new());
        };

        if rev.starts_with('-') {
            return Err(RangeError::InvalidRange {
                range: range.to_string(),
                reason: "revisions must not start with '-'".to_string(),
            });
        }

        let stdout = self.git(
            &[
                "log",
                "--name-only",
                "--format=",
                "--no-renames",
                "--diff-merges=first-parent",
                "--reverse",
                &rev,
                "--",
            ],
            &range.to_string(),
        )?;

        let changes: ChangeSet = stdout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();

        tracing::debug!(range = %range, files = changes.len(), "commit range resolved");
        Ok(changes)
    }

    /// Added, copied or modified paths staged in the index.
    pub fn staged_files(&self) -> Result<ChangeSet, RangeError> {
        let stdout = self.git(
            &["diff", "--cached", "--name-only", "--diff-filter=ACM"],
            "--cached",
        )?;
        Ok(stdout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// `user.name <user.email>` from git config, falling back to the login name.
    #[must_use]
    pub fn author(&self) -> String {
        let name = self.config_value("user.name");
        let email = self.config_value("user.email");

        match (name, email) {
            (Some(name), Some(email)) => format!("{name} <{email}>"),
            (Some(name), None) => name,
            (None, Some(email)) => email,
            (None, None) => std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }

    fn config_value(&self, key: &str) -> Option<String> {
        let stdout = self.git(&["config", "--get", key], key).ok()?;
        let value = stdout.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn git(&self, args: &[&str], range: &str) -> Result<String, RangeError> {
        let cmd = CommandSpec::new("git")
            .args(["-c", "core.quotepath=off"])
            .args(args.iter().copied())
            .cwd(&self.repo_root)
            .env("GIT_TERMINAL_PROMPT", "0");

        let output = self.runner.run(&cmd, self.timeout).map_err(|e| match e {
            RunnerError::Timeout { timeout_seconds } => RangeError::Timeout {
                range: range.to_string(),
                timeout_seconds,
            },
            RunnerError::NativeExecutionFailed { reason, .. } => {
                RangeError::GitUnavailable { reason }
            }
        })?;

        if !output.success() {
            let stderr = output.stderr_string();
            let reason = stderr
                .lines()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("git exited with an error")
                .trim()
                .to_string();
            return Err(RangeError::InvalidRange {
                range: range.to_string(),
                reason,
            });
        }

        Ok(output.stdout_string())
    }
}
