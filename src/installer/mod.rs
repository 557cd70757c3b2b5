//! Installer (C6).
//!
//! Materializes the topologically ordered package set into
//! `packages_dir/`, then wires each package's direct dependencies into its
//! own `.git-packages/<dep>` subdirectory so it sees them at a stable
//! relative path regardless of where in the graph it was discovered.
//!
//! Runs in two passes, exactly as spec §4.6 requires: Pass 1 fully
//! materializes every package before Pass 2 begins, so every link target
//! Pass 2 creates is guaranteed to already exist on disk.

pub mod link;

use crate::manifest::PackageSource;
use crate::resolver::ResolvedPackage;
use crate::utils::fs as fsutil;
use anyhow::{Context, Result};
use link::LinkStrategy;
use std::path::{Path, PathBuf};

/// One observable event emitted during install, for progress reporting and
/// tests. Purely informational — nothing downstream depends on these being
/// observed.
#[derive(Debug, Clone)]
pub enum InstallEvent {
    /// A package has started materializing.
    Installing {
        /// The package's workspace name.
        name: String,
    },
    /// A Git-sourced package finished being copied into the workspace.
    Copied {
        /// The package's workspace name.
        name: String,
    },
    /// A per-package child link was created.
    Linked {
        /// The parent package's workspace name.
        name: String,
        /// The dependency name the link points at.
        dep: String,
        /// Which strategy was used (`"symlink"`, `"junction"`, or `"copy"`).
        strategy: &'static str,
    },
    /// The probe determined symlinks are unavailable; this strategy will
    /// be used for the remainder of the invocation.
    FallbackUsed {
        /// The substituted strategy (`"junction"` or `"copy"`).
        strategy: &'static str,
    },
    /// Install finished; `installed` equals `total` on success.
    Summary {
        /// Number of packages successfully installed.
        installed: usize,
        /// Total number of packages in the resolved set.
        total: usize,
    },
}

/// Materialize `packages` (already in topological order) into
/// `packages_dir`, then wire their per-package dependency links.
///
/// `on_event` is called for every [`InstallEvent`]; pass a no-op closure if
/// the caller doesn't need progress reporting.
pub fn install(
    packages: &[ResolvedPackage],
    packages_dir: &Path,
    mut on_event: impl FnMut(InstallEvent),
) -> Result<()> {
    fsutil::ensure_dir(packages_dir)?;

    let strategy = link::probe_link_strategy(packages_dir);
    if strategy != LinkStrategy::Symlink {
        on_event(InstallEvent::FallbackUsed {
            strategy: strategy.as_str(),
        });
    }

    materialize_packages(packages, packages_dir, strategy, &mut on_event)?;
    wire_child_links(packages, packages_dir, strategy, &mut on_event)?;

    on_event(InstallEvent::Summary {
        installed: packages.len(),
        total: packages.len(),
    });
    Ok(())
}

/// Pass 1: place each package's content at `packages_dir/<name>`.
fn materialize_packages(
    packages: &[ResolvedPackage],
    packages_dir: &Path,
    strategy: LinkStrategy,
    on_event: &mut impl FnMut(InstallEvent),
) -> Result<()> {
    for pkg in packages {
        on_event(InstallEvent::Installing {
            name: pkg.name.clone(),
        });
        let dest = packages_dir.join(&pkg.name);
        fsutil::remove_dir_all(&dest)
            .with_context(|| format!("failed to clear existing install of '{}'", pkg.name))?;

        match &pkg.source {
            PackageSource::Git { .. } => {
                // The cache checkout may be a full git working tree (when
                // `path` is empty, `content_dir` is the checkout root); strip
                // `.git` so the installed package is a plain directory.
                fsutil::copy_dir_recursive(&pkg.content_dir, &dest, &[".git"])
                    .with_context(|| format!("failed to materialize package '{}'", pkg.name))?;
            }
            PackageSource::Local { path } => {
                let target = path.canonicalize().unwrap_or_else(|_| path.clone());
                link::link_with_strategy(strategy, &target, dest)
                    .with_context(|| format!("failed to link local package '{}'", pkg.name))?;
            }
        }
        on_event(InstallEvent::Copied {
            name: pkg.name.clone(),
        });
    }
    Ok(())
}

/// Pass 2: for each package with direct dependencies, create
/// `<pkg>/.git-packages/<dep>` pointing at `packages_dir/<dep>`.
fn wire_child_links(
    packages: &[ResolvedPackage],
    packages_dir: &Path,
    strategy: LinkStrategy,
    on_event: &mut impl FnMut(InstallEvent),
) -> Result<()> {
    for pkg in packages {
        if pkg.depends_on.is_empty() {
            continue;
        }
        let child_links_dir = packages_dir.join(&pkg.name).join(".git-packages");
        fsutil::ensure_dir(&child_links_dir)?;

        for dep in &pkg.depends_on {
            let link_path = child_links_dir.join(dep);
            let target = match strategy {
                // Keep the package subtree portable: a relative target
                // survives the whole workspace being moved or copied.
                LinkStrategy::Symlink => PathBuf::from("../..").join(dep),
                LinkStrategy::Junction | LinkStrategy::Copy => packages_dir.join(dep),
            };
            link::link_with_strategy(strategy, &target, link_path).with_context(|| {
                format!("failed to link dependency '{dep}' for package '{}'", pkg.name)
            })?;
            on_event(InstallEvent::Linked {
                name: pkg.name.clone(),
                dep: dep.clone(),
                strategy: strategy.as_str(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Ref, RepoId};
    use tempfile::TempDir;

    fn git_pkg(name: &str, content_dir: PathBuf, depends_on: Vec<String>) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_string(),
            source: PackageSource::Git {
                repo: RepoId::new("github.com/owner/repo"),
                path: None,
                reference: Ref::Tag("v1.0.0".into()),
            },
            content_dir,
            depends_on,
        }
    }

    #[test]
    fn diamond_install_wires_all_child_links() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        for name in ["a", "b", "c", "d"] {
            std::fs::create_dir_all(cache.join(name)).unwrap();
            std::fs::write(cache.join(name).join("marker.txt"), name).unwrap();
        }

        let packages = vec![
            git_pkg("d", cache.join("d"), vec![]),
            git_pkg("b", cache.join("b"), vec!["d".to_string()]),
            git_pkg("c", cache.join("c"), vec!["d".to_string()]),
            git_pkg("a", cache.join("a"), vec!["b".to_string(), "c".to_string()]),
        ];

        let packages_dir = tmp.path().join("packages");
        let mut events = Vec::new();
        install(&packages, &packages_dir, |e| events.push(e)).unwrap();

        assert!(packages_dir.join("a/.git-packages/b").exists());
        assert!(packages_dir.join("a/.git-packages/c").exists());
        assert!(packages_dir.join("b/.git-packages/d").exists());
        assert!(packages_dir.join("c/.git-packages/d").exists());
        assert!(!packages_dir.join("d/.git-packages").exists());

        // The shared dependency resolves to the same content through
        // either parent.
        let via_b = std::fs::read_to_string(packages_dir.join("b/.git-packages/d/marker.txt")).unwrap();
        let via_c = std::fs::read_to_string(packages_dir.join("c/.git-packages/d/marker.txt")).unwrap();
        assert_eq!(via_b, via_c);
    }

    #[test]
    fn git_copy_strips_git_metadata() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("checkout");
        std::fs::create_dir_all(content.join(".git")).unwrap();
        std::fs::write(content.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::write(content.join("README.md"), "hi").unwrap();

        let packages = vec![git_pkg("pkg", content, vec![])];
        let packages_dir = tmp.path().join("packages");
        install(&packages, &packages_dir, |_| {}).unwrap();

        assert!(!packages_dir.join("pkg/.git").exists());
        assert_eq!(std::fs::read_to_string(packages_dir.join("pkg/README.md")).unwrap(), "hi");
    }

    #[test]
    fn reinstall_overwrites_stale_content() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("checkout");
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("file.txt"), "v1").unwrap();

        let packages_dir = tmp.path().join("packages");
        let packages = vec![git_pkg("pkg", content.clone(), vec![])];
        install(&packages, &packages_dir, |_| {}).unwrap();

        std::fs::write(content.join("file.txt"), "v2").unwrap();
        std::fs::write(packages_dir.join("pkg").join("stale.txt"), "leftover").unwrap();
        install(&packages, &packages_dir, |_| {}).unwrap();

        assert_eq!(std::fs::read_to_string(packages_dir.join("pkg/file.txt")).unwrap(), "v2");
        assert!(!packages_dir.join("pkg/stale.txt").exists());
    }
}
