//! Command-line interface for git-pm.
//!
//! Each subcommand lives in its own module with an `execute()` entry point,
//! following this lineage's per-command module layout. Global flags
//! (`--verbose`, `--quiet`, `--config`, `--no-progress`) are parsed here
//! and threaded down to whichever subcommand needs them.

mod add;
mod clean;
mod config;
mod install;
mod list;
mod remove;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// git-pm: a git-backed package manager that materializes declared
/// subdirectories of remote repositories into a local workspace.
#[derive(Parser)]
#[command(name = "git-pm", about = "Git-backed package manager", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging, equivalent to `RUST_LOG=debug`.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress informational output; only errors are printed.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Override the user-scope config file location.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable progress bars and spinners.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the declared package set into the workspace.
    Install(install::InstallArgs),
    /// Insert or replace one entry in the root manifest.
    Add(add::AddArgs),
    /// Cascade-remove a package and anything left unreachable by it.
    Remove(remove::RemoveArgs),
    /// Delete `packages_dir/` and the generated environment file.
    Clean,
    /// Read or write a single configuration key.
    Config(config::ConfigArgs),
    /// List the currently installed packages.
    List,
}

impl Cli {
    /// Build the `tracing` `EnvFilter` string this invocation should log
    /// at, honoring `RUST_LOG` over `--verbose`/`--quiet` per
    /// `SPEC_FULL.md` §A.1.
    #[must_use]
    pub fn log_filter(&self) -> String {
        if std::env::var("RUST_LOG").is_ok() {
            return std::env::var("RUST_LOG").unwrap_or_else(|_| "off".to_string());
        }
        if self.verbose {
            "debug".to_string()
        } else {
            "off".to_string()
        }
    }

    /// Dispatch to the selected subcommand.
    pub async fn execute(self) -> Result<()> {
        let project_root = std::env::current_dir()?;
        let no_progress = self.no_progress || self.quiet;
        match self.command {
            Commands::Install(cmd) => cmd.execute(&project_root, self.config.as_deref(), no_progress).await,
            Commands::Add(cmd) => cmd.execute(&project_root),
            Commands::Remove(cmd) => cmd.execute(&project_root, self.config.as_deref()).await,
            Commands::Clean => clean::execute(&project_root),
            Commands::Config(cmd) => cmd.execute(&project_root),
            Commands::List => list::execute(&project_root, self.config.as_deref()),
        }
    }
}
