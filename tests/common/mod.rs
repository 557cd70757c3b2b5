//! Shared scaffolding for git-pm's end-to-end tests: a scratch project
//! directory, an isolated cache, and helpers for building local fake
//! remotes so no test touches the network.
#![allow(dead_code)]

use assert_cmd::Command;
use git_pm::test_utils::TestGit;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch project directory paired with an isolated cache dir, so
/// successive tests never share cached checkouts.
pub struct TestProject {
    _temp_dir: TempDir,
    project_dir: PathBuf,
    cache_dir: PathBuf,
    remotes_dir: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let project_dir = temp_dir.path().join("project");
        let cache_dir = temp_dir.path().join("cache");
        let remotes_dir = temp_dir.path().join("remotes");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::create_dir_all(&cache_dir).unwrap();
        std::fs::create_dir_all(&remotes_dir).unwrap();
        Self {
            _temp_dir: temp_dir,
            project_dir,
            cache_dir,
            remotes_dir,
        }
    }

    pub fn path(&self) -> &Path {
        &self.project_dir
    }

    pub fn write_manifest(&self, toml: &str) {
        std::fs::write(self.project_dir.join("git-pm.toml"), toml).unwrap();
    }

    pub fn write_local_manifest(&self, toml: &str) {
        std::fs::write(self.project_dir.join("git-pm.local.toml"), toml).unwrap();
    }

    /// Build a bare-ish (working-tree) git repo under the project's fake
    /// remotes directory, ready to be committed to and cloned via its
    /// `file://` URL.
    pub fn create_remote(&self, name: &str) -> TestGit {
        let git = TestGit::new(self.remotes_dir.join(name));
        git.init().unwrap();
        git
    }

    /// Run the compiled `git-pm` binary against this project, with the
    /// cache redirected into this test's isolated directory.
    pub fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("git-pm").unwrap();
        cmd.args(args).current_dir(&self.project_dir).env("GIT_PM_CACHE_DIR", &self.cache_dir).env("NO_COLOR", "1");
        cmd
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.project_dir.join(".git-packages")
    }

    pub fn cache_dir_for_test(&self) -> &Path {
        &self.cache_dir
    }
}
