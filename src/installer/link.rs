//! Child-package linking strategy.
//!
//! Each installed package gets its own `.git-packages/<dep>` directory
//! inside it pointing at the dependency's materialized content, so that a
//! package's own build tooling can find its dependencies without knowing
//! about the workspace root. A real symlink is preferred; Windows machines
//! without Developer Mode or `SeCreateSymbolicLinkPrivilege` can't create
//! one, so we fall back to an NTFS junction, and finally to a plain
//! recursive copy if even that is unavailable.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// How child package directories are wired into their parent's
/// `.git-packages/` directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStrategy {
    /// A real symlink (the common case on Unix, and on Windows with
    /// Developer Mode enabled).
    Symlink,
    /// An NTFS directory junction, via the `junction` crate.
    Junction,
    /// A full recursive copy, used when neither of the above is possible.
    Copy,
}

impl LinkStrategy {
    /// Human-readable name, used in progress output and error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Symlink => "symlink",
            Self::Junction => "junction",
            Self::Copy => "copy",
        }
    }
}

static PROBED_STRATEGY: OnceLock<LinkStrategy> = OnceLock::new();

/// Determine which [`LinkStrategy`] this process should use, probing once
/// by attempting a real symlink in a scratch location and caching the
/// result for the remainder of the invocation.
pub fn probe_link_strategy(scratch_dir: &Path) -> LinkStrategy {
    *PROBED_STRATEGY.get_or_init(|| probe_uncached(scratch_dir))
}

fn probe_uncached(scratch_dir: &Path) -> LinkStrategy {
    let probe_target = scratch_dir.join(".git-pm-link-probe-target");
    let probe_link = scratch_dir.join(".git-pm-link-probe-link");
    let _ = std::fs::create_dir_all(&probe_target);
    let result = create_symlink(&probe_target, &probe_link);
    let _ = std::fs::remove_file(&probe_link);
    let _ = std::fs::remove_dir_all(&probe_target);

    if result.is_ok() {
        return LinkStrategy::Symlink;
    }

    #[cfg(windows)]
    {
        let _ = std::fs::create_dir_all(&probe_target);
        let junction_ok = junction::create(&probe_target, &probe_link).is_ok();
        let _ = std::fs::remove_dir_all(&probe_link);
        let _ = std::fs::remove_dir_all(&probe_target);
        if junction_ok {
            return LinkStrategy::Junction;
        }
    }

    LinkStrategy::Copy
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::other("symlinks unsupported on this platform"))
}

/// Create (or replace) `link` pointing at `target` using `strategy`. Any
/// pre-existing file or directory at `link` is removed first.
pub fn link_with_strategy(strategy: LinkStrategy, target: &Path, link: PathBuf) -> Result<()> {
    remove_existing(&link)?;
    match strategy {
        LinkStrategy::Symlink => {
            create_symlink(target, &link).with_context(|| format!("failed to symlink {}", link.display()))?;
        }
        LinkStrategy::Junction => {
            #[cfg(windows)]
            {
                junction::create(target, &link)
                    .with_context(|| format!("failed to create junction {}", link.display()))?;
            }
            #[cfg(not(windows))]
            {
                anyhow::bail!("junction strategy is only available on Windows");
            }
        }
        LinkStrategy::Copy => {
            crate::utils::fs::copy_dir_recursive(target, &link, &[])
                .with_context(|| format!("failed to copy {} to {}", target.display(), link.display()))?;
        }
    }
    Ok(())
}

fn remove_existing(path: &Path) -> Result<()> {
    if path.is_symlink() || path.is_file() {
        std::fs::remove_file(path)?;
    } else if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    }
    Ok(())
}
