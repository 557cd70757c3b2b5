//! `git-pm install`: runs C1 → C3 → C5 → C6 → C7 in sequence.

use crate::cache::Cache;
use crate::config::{AuthHints, Config};
use crate::installer::{self, InstallEvent};
use crate::manifest::Manifest;
use crate::resolver;
use crate::utils::progress::InstallProgress;
use crate::workspace;
use anyhow::Result;
use clap::Args;
use std::path::Path;

/// Arguments for `git-pm install`.
#[derive(Args)]
pub struct InstallArgs {
    /// Skip updating the workspace `.gitignore`.
    #[arg(long)]
    no_gitignore: bool,
    /// Only install the root manifest's direct entries; skip recursive
    /// dependency discovery.
    #[arg(long)]
    no_resolve_deps: bool,
}

impl InstallArgs {
    /// Run the full install pipeline against the workspace rooted at
    /// `project_root`.
    pub async fn execute(self, project_root: &Path, config_override: Option<&Path>, no_progress: bool) -> Result<()> {
        let cfg = Config::load(project_root, config_override)?;
        let auth = AuthHints::from_env();
        let manifest = Manifest::load(project_root)?;
        let cache = Cache::open(&cfg)?;

        tracing::info!(target: "resolver", packages = manifest.packages.len(), "resolving dependency graph");
        let packages = resolver::resolve(project_root, &manifest, &cfg, &auth, &cache, !self.no_resolve_deps).await?;

        let progress = InstallProgress::new(packages.len(), no_progress);
        let packages_dir = project_root.join(&cfg.packages_dir);
        installer::install(&packages, &packages_dir, |event| match event {
            InstallEvent::Installing { name } => progress.installing(&name),
            InstallEvent::Copied { name } => progress.finished(&name, None),
            InstallEvent::Linked { name, dep, strategy } => {
                tracing::debug!(target: "installer", %name, %dep, %strategy, "linked dependency");
            }
            InstallEvent::FallbackUsed { strategy } => {
                tracing::warn!(target: "installer", %strategy, "symlinks unavailable, using fallback strategy");
            }
            InstallEvent::Summary { installed, total } => progress.summary(installed, total),
        })?;

        workspace::update_gitignore(project_root, &cfg, !self.no_gitignore)?;
        workspace::write_env_file(project_root, &cfg, &packages)?;

        Ok(())
    }
}
