//! Dependency resolver (C5).
//!
//! Recursively discovers the full package set reachable from the root
//! manifest: every package that itself carries a nested `git-pm.toml`
//! contributes further packages, discovered the same way. This applies to
//! `Local`-sourced packages too — a local override pointing at an
//! in-progress checkout still has its own dependencies discovered from disk,
//! it just never touches the cache or the network to get there.

pub mod graph;

use crate::config::{AuthHints, Config};
use crate::cache::Cache;
use crate::core::error::GitPmError;
use crate::manifest::{Manifest, PackageSource, ResolvedEntry};
use anyhow::Result;
use graph::DependencyGraph;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// A package with its content located on disk and its direct dependency
/// names recorded, ready for the installer.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    /// Workspace-unique package name.
    pub name: String,
    /// Where the package's content came from.
    pub source: PackageSource,
    /// The directory on disk containing the package's materialized content
    /// (a cache checkout subpath for `Git` sources, the path itself for
    /// `Local` sources).
    pub content_dir: PathBuf,
    /// Names of packages this one directly depends on, in declaration
    /// order within its own manifest.
    pub depends_on: Vec<String>,
}

struct Resolver<'a> {
    cfg: &'a Config,
    auth: &'a AuthHints,
    cache: &'a Cache,
    resolve_deps: bool,
    graph: DependencyGraph,
    resolved: HashMap<String, ResolvedPackage>,
    in_progress: Vec<String>,
}

/// Discover the full, topologically ordered package set for a workspace.
///
/// `resolve_deps` corresponds to `install --no-resolve-deps`: when false,
/// only the root manifest's direct packages are installed and nested
/// manifests are never consulted.
pub async fn resolve(
    root: &Path,
    manifest: &Manifest,
    cfg: &Config,
    auth: &AuthHints,
    cache: &Cache,
    resolve_deps: bool,
) -> Result<Vec<ResolvedPackage>> {
    let mut resolver = Resolver {
        cfg,
        auth,
        cache,
        resolve_deps,
        graph: DependencyGraph::new(),
        resolved: HashMap::new(),
        in_progress: Vec::new(),
    };

    for entry in manifest.resolve_entries(root)? {
        resolver.discover(entry).await?;
    }

    let order = resolver.graph.install_order()?;
    Ok(order.into_iter().filter_map(|name| resolver.resolved.remove(&name)).collect())
}

impl Resolver<'_> {
    fn discover<'a>(&'a mut self, entry: ResolvedEntry) -> Pin<Box<dyn Future<Output = Result<()>> + 'a>> {
        Box::pin(async move {
            self.graph.ensure_node(&entry.name);

            if let Some(existing) = self.resolved.get(&entry.name) {
                if existing.source != entry.source {
                    return Err(GitPmError::PackageNameCollision {
                        name: entry.name.clone(),
                    }
                    .into());
                }
                return Ok(());
            }

            if let Some(start) = self.in_progress.iter().position(|n| *n == entry.name) {
                let mut chain = self.in_progress[start..].to_vec();
                chain.push(entry.name.clone());
                return Err(GitPmError::CircularDependency { chain }.into());
            }

            self.in_progress.push(entry.name.clone());

            let content_dir = match &entry.source {
                PackageSource::Git {
                    repo,
                    path,
                    reference,
                } => {
                    let handle = self
                        .cache
                        .ensure_checkout(repo, path.as_deref(), reference, self.cfg, self.auth)
                        .await?;
                    handle.local_dir
                }
                PackageSource::Local { path } => path.clone(),
            };

            let mut depends_on = Vec::new();
            if self.resolve_deps {
                let nested = Manifest::load(&content_dir)?;
                for child in nested.resolve_entries(&content_dir)? {
                    self.graph.add_dependency(&entry.name, &child.name);
                    depends_on.push(child.name.clone());
                    self.discover(child).await?;
                }
            }

            self.in_progress.pop();
            self.resolved.insert(
                entry.name.clone(),
                ResolvedPackage {
                    name: entry.name,
                    source: entry.source,
                    content_dir,
                    depends_on,
                },
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::PackageSpec;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    async fn resolve_local_fixture(root: &Path, manifest: &Manifest) -> Result<Vec<ResolvedPackage>> {
        let cfg = Config::default();
        let auth = AuthHints::default();
        let cache_root = TempDir::new().unwrap();
        let mut cache_cfg = cfg.clone();
        cache_cfg.cache_dir = cache_root.path().to_path_buf();
        let cache = Cache::open(&cache_cfg).unwrap();
        resolve(root, manifest, &cache_cfg, &auth, &cache, true).await
    }

    #[tokio::test]
    async fn resolves_local_chain_in_dependency_order() {
        let workspace = TempDir::new().unwrap();
        let dep_a = workspace.path().join("dep-a");
        let dep_b = workspace.path().join("dep-b");
        std::fs::create_dir_all(&dep_a).unwrap();
        std::fs::create_dir_all(&dep_b).unwrap();
        std::fs::write(
            dep_a.join("git-pm.toml"),
            "[packages.b]\npath = \"../dep-b\"\n",
        )
        .unwrap();

        let mut packages = BTreeMap::new();
        packages.insert(
            "a".to_string(),
            PackageSpec::Local {
                path: PathBuf::from("dep-a"),
            },
        );
        let manifest = Manifest {
            packages,
            declaration_order: vec!["a".to_string()],
        };

        let resolved = resolve_local_fixture(workspace.path(), &manifest).await.unwrap();
        let names: Vec<_> = resolved.iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn no_resolve_deps_skips_nested_manifest() {
        let workspace = TempDir::new().unwrap();
        let dep_a = workspace.path().join("dep-a");
        let dep_b = workspace.path().join("dep-b");
        std::fs::create_dir_all(&dep_a).unwrap();
        std::fs::create_dir_all(&dep_b).unwrap();
        std::fs::write(
            dep_a.join("git-pm.toml"),
            "[packages.b]\npath = \"../dep-b\"\n",
        )
        .unwrap();

        let mut packages = BTreeMap::new();
        packages.insert(
            "a".to_string(),
            PackageSpec::Local {
                path: PathBuf::from("dep-a"),
            },
        );
        let manifest = Manifest {
            packages,
            declaration_order: vec!["a".to_string()],
        };

        let cfg = Config::default();
        let auth = AuthHints::default();
        let cache_root = TempDir::new().unwrap();
        let mut cache_cfg = cfg.clone();
        cache_cfg.cache_dir = cache_root.path().to_path_buf();
        let cache = Cache::open(&cache_cfg).unwrap();
        let resolved = resolve(workspace.path(), &manifest, &cache_cfg, &auth, &cache, false).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "a");
    }

    #[tokio::test]
    async fn cycle_between_local_packages_is_rejected() {
        let workspace = TempDir::new().unwrap();
        let dep_a = workspace.path().join("dep-a");
        let dep_b = workspace.path().join("dep-b");
        std::fs::create_dir_all(&dep_a).unwrap();
        std::fs::create_dir_all(&dep_b).unwrap();
        std::fs::write(dep_a.join("git-pm.toml"), "[packages.b]\npath = \"../dep-b\"\n").unwrap();
        std::fs::write(dep_b.join("git-pm.toml"), "[packages.a]\npath = \"../dep-a\"\n").unwrap();

        let mut packages = BTreeMap::new();
        packages.insert(
            "a".to_string(),
            PackageSpec::Local {
                path: PathBuf::from("dep-a"),
            },
        );
        let manifest = Manifest {
            packages,
            declaration_order: vec!["a".to_string()],
        };

        let err = resolve_local_fixture(workspace.path(), &manifest).await.unwrap_err();
        assert!(err.downcast_ref::<GitPmError>().is_some());
    }
}
