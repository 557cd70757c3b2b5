//! `git-pm config`: read or write a single configuration key, or list the
//! effective merged configuration with its source layer.

use crate::config::{self, Config};
use anyhow::Result;
use clap::Args;
use std::path::Path;

/// Arguments for `git-pm config`.
#[derive(Args)]
pub struct ConfigArgs {
    /// The key to read, set, or unset. Omit together with `value` to use
    /// `--list` instead.
    key: Option<String>,
    /// The value to set `key` to. Omit to read `key`'s current value.
    value: Option<String>,
    /// Remove `key` from the target config file instead of reading/writing.
    #[arg(long)]
    unset: bool,
    /// Print every recognized key's effective value and which layer set it.
    #[arg(long)]
    list: bool,
    /// Target the user-scope config file instead of the project-scope one.
    #[arg(long)]
    global: bool,
}

impl ConfigArgs {
    /// Dispatch to get/set/unset/list behavior based on which arguments were
    /// given.
    pub fn execute(self, project_root: &Path) -> Result<()> {
        if self.list {
            return list(project_root);
        }

        let target = if self.global {
            config::default_user_config_path()?
        } else {
            config::project_config_path(project_root)
        };

        let Some(key) = self.key else {
            anyhow::bail!("usage: git-pm config <key> [value] | --unset <key> | --list");
        };

        if self.unset {
            config::unset_key(&target, &key)?;
            println!("unset '{key}' in {}", target.display());
            return Ok(());
        }

        match self.value {
            Some(value) => {
                config::set_key(&target, &key, &value)?;
                println!("set '{key}' = '{value}' in {}", target.display());
            }
            None => {
                let cfg = Config::load(project_root, None)?;
                println!("{}", cfg.get(&key)?);
            }
        }
        Ok(())
    }
}

fn list(project_root: &Path) -> Result<()> {
    for entry in config::list_effective(project_root, None)? {
        println!("{} = {} ({})", entry.key, entry.value, entry.source);
    }
    Ok(())
}
