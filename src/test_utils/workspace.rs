//! A fluent builder for a scratch workspace (manifest, config, cache dir)
//! backed by a `TempDir`, reducing boilerplate in integration tests.

use crate::config::Config;
use anyhow::Result;
use std::path::PathBuf;
use tempfile::TempDir;

/// A builder for a temporary workspace with a manifest and an isolated
/// cache directory.
pub struct TestWorkspaceBuilder {
    temp_dir: TempDir,
    manifest_toml: Option<String>,
    files: Vec<(String, String)>,
}

impl TestWorkspaceBuilder {
    /// Start a new builder backed by a fresh temporary directory.
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            manifest_toml: None,
            files: Vec::new(),
        })
    }

    /// Set the root manifest's raw TOML contents.
    #[must_use]
    pub fn with_manifest(mut self, toml: impl Into<String>) -> Self {
        self.manifest_toml = Some(toml.into());
        self
    }

    /// Queue an additional file to be written relative to the workspace
    /// root before [`Self::build`] returns.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// Materialize the workspace on disk.
    pub fn build(self) -> Result<TestWorkspace> {
        let root = self.temp_dir.path().to_path_buf();
        let cache_dir = root.join("cache");
        std::fs::create_dir_all(&cache_dir)?;

        if let Some(toml) = &self.manifest_toml {
            std::fs::write(root.join(crate::manifest::MANIFEST_FILE_NAME), toml)?;
        }
        for (path, content) in &self.files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }

        let cfg = Config {
            cache_dir: cache_dir.clone(),
            ..Config::default()
        };

        Ok(TestWorkspace {
            _temp_dir: self.temp_dir,
            root,
            cache_dir,
            config: cfg,
        })
    }
}

/// A materialized scratch workspace. Dropping this removes the backing
/// temporary directory.
pub struct TestWorkspace {
    _temp_dir: TempDir,
    root: PathBuf,
    cache_dir: PathBuf,
    config: Config,
}

impl TestWorkspace {
    /// The workspace root.
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// The isolated cache directory for this workspace.
    #[must_use]
    pub fn cache_dir(&self) -> &std::path::Path {
        &self.cache_dir
    }

    /// A [`Config`] with `cache_dir` pointed at this workspace's isolated
    /// cache and everything else left at its default.
    #[must_use]
    pub fn config(&self) -> Config {
        self.config.clone()
    }
}
