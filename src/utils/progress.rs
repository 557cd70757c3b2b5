//! Installation progress display.
//!
//! Grounded on `agpm-cli::utils::progress::MultiPhaseProgress`, reduced to
//! the single phase this engine's install pass needs: one line per package
//! as it materializes, plus a final summary. Disabled automatically when
//! stdout isn't a terminal, or explicitly via `--no-progress`.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

/// A single-phase progress reporter for the install pipeline. Emits a
/// spinner line per package when attached to a terminal, and falls back to
/// plain status lines otherwise so piped/CI output stays readable.
pub struct InstallProgress {
    bar: Option<ProgressBar>,
    enabled: bool,
}

impl InstallProgress {
    /// Build a reporter. `no_progress` is the CLI's `--no-progress` flag;
    /// progress is also disabled automatically when stdout is not a TTY.
    #[must_use]
    pub fn new(total: usize, no_progress: bool) -> Self {
        let enabled = !no_progress && std::io::stdout().is_terminal() && total > 0;
        let bar = enabled.then(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
                    .expect("static template is valid")
                    .progress_chars("=>-"),
            );
            bar
        });
        Self { bar, enabled }
    }

    /// Report that a package has started materializing.
    pub fn installing(&self, name: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("installing {name}"));
        } else if !self.enabled {
            // Quiet/non-TTY mode still gets one line per package so logs
            // redirected to a file show progress without ANSI control codes.
            println!("installing {name}");
        }
    }

    /// Report that a package finished materializing and advance the bar.
    pub fn finished(&self, name: &str, strategy: Option<&str>) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
            if let Some(s) = strategy {
                bar.println(format!("✓ {name} ({s})"));
            }
        } else if !self.enabled {
            match strategy {
                Some(s) => println!("installed {name} ({s})"),
                None => println!("installed {name}"),
            }
        }
    }

    /// Print the final `(installed, total)` summary and clear the bar.
    pub fn summary(&self, installed: usize, total: usize) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
        println!("installed {installed}/{total} packages");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_progress_does_not_panic() {
        let progress = InstallProgress::new(0, true);
        progress.installing("a");
        progress.finished("a", Some("symlink"));
        progress.summary(1, 1);
    }
}
