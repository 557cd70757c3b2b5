//! Thin async wrapper around the system `git` binary.
//!
//! Shells out rather than linking libgit2, for the same reason as the
//! codebase this one is descended from: maximum compatibility with
//! credential helpers, SSH agents, and corporate proxy configuration that a
//! vendored Git implementation would not pick up.

use crate::core::error::GitPmError;
use crate::core::{Ref, RepoId};
use crate::url::FetchTarget;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Captured stdout/stderr of a successful git invocation.
pub struct GitCommandOutput {
    /// Trimmed stdout.
    pub stdout: String,
    /// Trimmed stderr (git is chatty on stderr even on success).
    pub stderr: String,
}

/// A single git invocation, built up fluently and executed once.
struct GitCommand {
    args: Vec<String>,
    current_dir: Option<std::path::PathBuf>,
    timeout: Duration,
    repo_for_errors: String,
}

impl GitCommand {
    fn new(repo_for_errors: impl Into<String>) -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            timeout: DEFAULT_TIMEOUT,
            repo_for_errors: repo_for_errors.into(),
        }
    }

    fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn extra_header(mut self, header: Option<&str>) -> Self {
        if let Some(h) = header {
            self.args.splice(0..0, ["-c".to_string(), format!("http.extraheader={h}")]);
        }
        self
    }

    async fn execute(self) -> Result<GitCommandOutput> {
        let mut cmd = Command::new("git");
        if let Some(dir) = &self.current_dir {
            cmd.arg("-C").arg(dir);
        }
        cmd.args(&self.args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(target: "git", "running: git {}", self.args.join(" "));

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.with_context(|| format!("failed to spawn git {}", self.args.join(" ")))?,
            Err(_) => {
                return Err(GitPmError::NetworkError {
                    repo: self.repo_for_errors,
                    operation: self.operation_name(),
                    reason: format!("timed out after {}s", self.timeout.as_secs()),
                }
                .into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(self.classify_failure(&stderr).into());
        }

        Ok(GitCommandOutput { stdout, stderr })
    }

    fn operation_name(&self) -> String {
        self.args.iter().find(|a| !a.starts_with('-')).cloned().unwrap_or_else(|| "git".to_string())
    }

    fn classify_failure(&self, stderr: &str) -> GitPmError {
        let lower = stderr.to_lowercase();
        if lower.contains("authentication failed")
            || lower.contains("permission denied")
            || lower.contains("could not read username")
            || lower.contains("403")
        {
            return GitPmError::AuthFailed {
                repo: self.repo_for_errors.clone(),
            };
        }
        if lower.contains("couldn't find remote ref")
            || lower.contains("did not match any")
            || lower.contains("unknown revision")
            || lower.contains("not found")
        {
            return GitPmError::RefNotFound {
                repo: self.repo_for_errors.clone(),
                reference: self.args.last().cloned().unwrap_or_default(),
            };
        }
        GitPmError::NetworkError {
            repo: self.repo_for_errors.clone(),
            operation: self.operation_name(),
            reason: stderr.to_string(),
        }
    }
}

/// Resolve a [`Ref`] against a remote to an exact commit SHA.
///
/// `Commit` refs are returned verbatim without contacting the network —
/// the caller is responsible for validating the cache entry still exists.
/// `Tag` and `Branch` refs are resolved via `git ls-remote`.
pub async fn resolve_ref(repo: &RepoId, target: &FetchTarget, reference: &Ref) -> Result<String> {
    if let Ref::Commit(sha) = reference {
        return Ok(sha.clone());
    }

    let refspec = match reference {
        Ref::Tag(name) => format!("refs/tags/{name}"),
        Ref::Branch(name) => format!("refs/heads/{name}"),
        Ref::Commit(_) => unreachable!("handled above"),
    };

    let output = GitCommand::new(repo.as_str())
        .extra_header(target.extra_header.as_deref())
        .args(["ls-remote", &target.url, &refspec])
        .execute()
        .await?;

    let sha = output
        .stdout
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .ok_or_else(|| GitPmError::RefNotFound {
            repo: repo.as_str().to_string(),
            reference: reference.value().to_string(),
        })?;

    Ok(sha.to_string())
}

/// Clone `target` into `dest`, sparse-checking out only `sparse_path` (or
/// the whole tree if `None`), then hard-reset the working copy to
/// `resolved_commit`.
///
/// `dest` must not already exist; it is created by `git clone`.
pub async fn sparse_checkout(
    repo: &RepoId,
    target: &FetchTarget,
    resolved_commit: &str,
    sparse_path: Option<&str>,
    dest: &Path,
) -> Result<()> {
    GitCommand::new(repo.as_str())
        .extra_header(target.extra_header.as_deref())
        .args([
            "clone",
            "--no-checkout",
            "--filter=blob:none",
            &target.url,
            &dest.display().to_string(),
        ])
        .execute()
        .await?;

    if let Some(path) = sparse_path {
        GitCommand::new(repo.as_str())
            .current_dir(dest)
            .args(["sparse-checkout", "set", "--cone", path])
            .execute()
            .await?;
    }

    GitCommand::new(repo.as_str())
        .current_dir(dest)
        .args(["checkout", resolved_commit])
        .execute()
        .await?;

    if let Some(path) = sparse_path
        && !dest.join(path).exists()
    {
        return Err(GitPmError::SparsePathEmpty {
            repo: repo.as_str().to_string(),
            path: path.to_string(),
            reference: resolved_commit.to_string(),
        }
        .into());
    }

    Ok(())
}
