//! git-pm CLI entry point.
//!
//! Parses arguments, sets up `tracing`, and dispatches to the selected
//! subcommand. Errors are converted to [`ErrorContext`](git_pm::core::error::ErrorContext)
//! before being printed so the user sees a suggestion, not a raw chain.

use anyhow::Result;
use clap::Parser;
use git_pm::cli::Cli;
use git_pm::core::error::user_friendly_error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_new(cli.log_filter()).unwrap_or_else(|_| EnvFilter::new("off"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_thread_ids(false).init();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let ctx = user_friendly_error(e);
            let code = ctx.error.exit_code();
            ctx.display();
            std::process::exit(code);
        }
    }
}
