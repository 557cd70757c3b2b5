//! `git-pm remove`: cascading removal per spec §4.7.

use crate::cache::Cache;
use crate::config::{AuthHints, Config};
use crate::workspace;
use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::Path;

/// Arguments for `git-pm remove`.
#[derive(Args)]
pub struct RemoveArgs {
    /// The package to remove.
    name: String,
    /// Skip the interactive confirmation prompt.
    #[arg(short = 'y', long)]
    yes: bool,
}

impl RemoveArgs {
    /// Remove `name` and cascade through anything it left unreachable.
    pub async fn execute(self, project_root: &Path, config_override: Option<&Path>) -> Result<()> {
        if !self.yes && !confirm(&self.name)? {
            println!("aborted");
            return Ok(());
        }

        let cfg = Config::load(project_root, config_override)?;
        let auth = AuthHints::from_env();
        let cache = Cache::open(&cfg)?;

        let removed = workspace::remove_cascade(project_root, &cfg, &auth, &cache, &self.name).await?;
        if removed.is_empty() {
            println!("removed '{}' (no longer-unreachable dependents)", self.name);
        } else {
            println!("removed: {}", removed.join(", "));
        }
        Ok(())
    }
}

fn confirm(name: &str) -> Result<bool> {
    print!("Remove package '{name}' and anything left unreachable by it? [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
