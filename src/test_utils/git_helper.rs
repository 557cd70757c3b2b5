//! A thin wrapper around the `git` binary for building fake remotes in
//! tests. Every git-pm integration test points at a `file://` repository
//! built with this rather than the network.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Drives `git` against a single repository directory.
pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    /// Wrap an existing (or not-yet-created) directory.
    #[must_use]
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    fn run(&self, args: &[&str], action: &str) -> Result<()> {
        std::fs::create_dir_all(&self.repo_path)?;
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .with_context(|| action.to_string())?;
        if !output.status.success() {
            bail!("{action} failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(())
    }

    /// `git init` plus test-stable committer identity. Also enables
    /// `uploadpack.allowFilter`, which partial (`--filter=blob:none`)
    /// clones need even over the local `file://` transport this harness
    /// uses for its fake remotes.
    pub fn init(&self) -> Result<()> {
        self.run(&["init", "--initial-branch=main"], "git init")?;
        self.run(&["config", "user.email", "test@git-pm.example"], "git config user.email")?;
        self.run(&["config", "user.name", "git-pm tests"], "git config user.name")?;
        self.run(&["config", "uploadpack.allowFilter", "true"], "git config uploadpack.allowFilter")?;
        Ok(())
    }

    /// Write `relative_path` under the repo root, creating parent dirs.
    pub fn write_file(&self, relative_path: &str, contents: &str) -> Result<()> {
        let full = self.repo_path.join(relative_path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, contents)?;
        Ok(())
    }

    /// Stage everything and commit, returning the new commit's SHA.
    pub fn commit_all(&self, message: &str) -> Result<String> {
        self.run(&["add", "."], "git add")?;
        self.run(&["commit", "-m", message], "git commit")?;
        let output = Command::new("git").args(["rev-parse", "HEAD"]).current_dir(&self.repo_path).output()?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Create a lightweight tag against the current `HEAD`.
    pub fn tag(&self, name: &str) -> Result<()> {
        self.run(&["tag", name], "git tag")
    }

    /// Create and check out a new branch from the current `HEAD`.
    pub fn branch(&self, name: &str) -> Result<()> {
        self.run(&["checkout", "-b", name], "git checkout -b")
    }

    /// The `file://` URL this repository can be cloned from.
    #[must_use]
    pub fn file_url(&self) -> String {
        format!("file://{}", self.repo_path.display())
    }

    /// The repository's filesystem path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.repo_path
    }
}
