//! `git-pm list`: prints the currently installed packages.
//!
//! Reads `packages_dir/` directly rather than re-running discovery, so it
//! reflects what is actually on disk even if the manifest has since
//! changed.

use crate::config::Config;
use anyhow::Result;
use std::path::Path;

/// Print one line per installed package, sorted by name.
pub fn execute(project_root: &Path, config_override: Option<&Path>) -> Result<()> {
    let cfg = Config::load(project_root, config_override)?;
    let packages_dir = project_root.join(&cfg.packages_dir);
    if !packages_dir.exists() {
        println!("no packages installed (run 'git-pm install')");
        return Ok(());
    }

    let mut names: Vec<String> = std::fs::read_dir(&packages_dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir() || t.is_symlink()))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    if names.is_empty() {
        println!("no packages installed");
    } else {
        for name in names {
            let deps_dir = packages_dir.join(&name).join(".git-packages");
            if deps_dir.is_dir() {
                let mut deps: Vec<String> = std::fs::read_dir(&deps_dir)?
                    .filter_map(std::result::Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                deps.sort();
                if deps.is_empty() {
                    println!("{name}");
                } else {
                    println!("{name} -> {}", deps.join(", "));
                }
            } else {
                println!("{name}");
            }
        }
    }
    Ok(())
}
