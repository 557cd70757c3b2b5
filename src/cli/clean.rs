//! `git-pm clean`: deletes `packages_dir/` and the generated environment
//! file; leaves manifests and the cache intact.

use crate::config::Config;
use crate::utils::fs as fsutil;
use crate::workspace::ENV_FILE_NAME;
use anyhow::Result;
use std::path::Path;

/// Remove the installed workspace without touching manifests or the cache.
pub fn execute(project_root: &Path) -> Result<()> {
    let cfg = Config::load(project_root, None)?;
    fsutil::remove_dir_all(&project_root.join(&cfg.packages_dir))?;
    fsutil::remove_dir_all(&project_root.join(ENV_FILE_NAME))?;
    println!("cleaned {}", cfg.packages_dir.display());
    Ok(())
}
