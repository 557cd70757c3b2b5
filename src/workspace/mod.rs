//! Workspace maintainer (C7).
//!
//! Owns the two side effects that sit outside the installed package tree
//! itself: the generated `.git-pm.env` file external scripts can source,
//! and the managed block of entries this engine keeps in the host repo's
//! `.gitignore`. Also drives cascading removal, which re-runs discovery
//! against a manifest with one package removed and deletes whatever is no
//! longer reachable.

use crate::config::{AuthHints, Config};
use crate::cache::Cache;
use crate::manifest::{self, Manifest};
use crate::resolver::{self, ResolvedPackage};
use crate::utils::fs as fsutil;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// Name of the generated environment file, at the workspace root.
pub const ENV_FILE_NAME: &str = ".git-pm.env";

const GITIGNORE_SECTION_START: &str = "# git-pm managed entries — do not edit below this line";
const GITIGNORE_SECTION_END: &str = "# End of git-pm managed entries";

/// The fixed set of paths this engine keeps in `.gitignore`. No lockfile
/// entry: this crate omits the lockfile entirely (see `SPEC_FULL.md` §C).
fn managed_gitignore_entries(cfg: &Config) -> Vec<String> {
    vec![
        format!("{}/", cfg.packages_dir.display()),
        ENV_FILE_NAME.to_string(),
        manifest::LOCAL_MANIFEST_FILE_NAME.to_string(),
    ]
}

/// Regenerate `.git-pm.env` from scratch, listing the packages directory,
/// the project root, and one `GIT_PM_PACKAGE_<NAME>` export per installed
/// package.
pub fn write_env_file(root: &Path, cfg: &Config, packages: &[ResolvedPackage]) -> Result<()> {
    let packages_dir = root.join(&cfg.packages_dir);
    let mut out = String::new();
    out.push_str(&format!("GIT_PM_PACKAGES_DIR={}\n", packages_dir.display()));
    out.push_str(&format!("GIT_PM_PROJECT_ROOT={}\n", root.display()));

    let mut names: Vec<_> = packages.iter().map(|p| p.name.clone()).collect();
    names.sort();
    for name in names {
        let var_name = env_var_name(&name);
        let path = packages_dir.join(&name);
        out.push_str(&format!("GIT_PM_PACKAGE_{var_name}={}\n", path.display()));
    }

    fsutil::atomic_write(&root.join(ENV_FILE_NAME), out.as_bytes())
        .with_context(|| format!("failed to write {ENV_FILE_NAME}"))
}

/// Uppercase a package name into a legal environment-variable suffix:
/// every character outside `[A-Za-z0-9_]` becomes `_`. The workspace
/// directory itself always keeps the original name.
fn env_var_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// Idempotently ensure the managed entry set is present in `.gitignore` at
/// `root`. A no-op if `enabled` is false (the `--no-gitignore` flag).
/// Existing unrelated content is never reordered or rewritten; only the
/// engine's own managed section is replaced wholesale.
pub fn update_gitignore(root: &Path, cfg: &Config, enabled: bool) -> Result<()> {
    if !enabled {
        return Ok(());
    }
    let path = root.join(".gitignore");
    let existing = if path.exists() {
        std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?
    } else {
        String::new()
    };

    let (before, managed, after) = split_managed_section(&existing);

    let mut entries: Vec<String> = managed;
    for wanted in managed_gitignore_entries(cfg) {
        let already_present =
            before.iter().chain(entries.iter()).any(|existing| covers(existing, &wanted));
        if !already_present {
            entries.push(wanted);
        }
    }

    let mut out = String::new();
    for line in &before {
        out.push_str(line);
        out.push('\n');
    }
    if !before.is_empty() && !before.last().is_some_and(|l| l.trim().is_empty()) {
        out.push('\n');
    }
    out.push_str(GITIGNORE_SECTION_START);
    out.push('\n');
    for entry in &entries {
        out.push_str(entry);
        out.push('\n');
    }
    out.push_str(GITIGNORE_SECTION_END);
    out.push('\n');
    if !after.is_empty() {
        out.push('\n');
        for line in &after {
            out.push_str(line);
            out.push('\n');
        }
    }

    fsutil::atomic_write(&path, out.as_bytes()).with_context(|| format!("failed to write {}", path.display()))
}

/// Split an existing `.gitignore` into (lines before the managed section,
/// the managed section's own entry lines, lines after the managed
/// section). An absent section yields an empty middle list.
fn split_managed_section(content: &str) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut before = Vec::new();
    let mut managed = Vec::new();
    let mut after = Vec::new();
    let mut state = 0u8; // 0 = before, 1 = in section, 2 = after

    for line in content.lines() {
        match state {
            0 if line == GITIGNORE_SECTION_START => state = 1,
            0 => before.push(line.to_string()),
            1 if line == GITIGNORE_SECTION_END => state = 2,
            1 => managed.push(line.to_string()),
            _ => after.push(line.to_string()),
        }
    }
    (before, managed, after)
}

/// Whether `existing` already covers `wanted` for idempotence purposes:
/// exact match, or a trailing-slash variant of the same pattern.
fn covers(existing: &str, wanted: &str) -> bool {
    let normalize = |s: &str| s.trim().trim_end_matches('/').to_string();
    normalize(existing) == normalize(wanted)
}

/// Remove `name` from the effective manifests, re-run discovery against the
/// surviving set, and delete whatever `packages_dir/` entry is no longer
/// reachable. Regenerates `.git-pm.env` afterward.
///
/// Returns `Err` wrapping [`crate::core::GitPmError::PackageNotInstalled`]
/// if `name` was declared in neither manifest.
pub async fn remove_cascade(
    root: &Path,
    cfg: &Config,
    auth: &AuthHints,
    cache: &Cache,
    name: &str,
) -> Result<Vec<String>> {
    let removed = manifest::remove_package(root, name)?;
    if !removed {
        return Err(crate::core::error::GitPmError::PackageNotInstalled {
            name: name.to_string(),
        }
        .into());
    }

    let manifest = Manifest::load(root)?;
    let surviving = resolver::resolve(root, &manifest, cfg, auth, cache, true).await?;
    let required: BTreeSet<&str> = surviving.iter().map(|p| p.name.as_str()).collect();

    let packages_dir = root.join(&cfg.packages_dir);
    let mut removed_names = Vec::new();
    if packages_dir.exists() {
        for entry in std::fs::read_dir(&packages_dir)
            .with_context(|| format!("failed to read {}", packages_dir.display()))?
        {
            let entry = entry?;
            let entry_name = entry.file_name().to_string_lossy().into_owned();
            if required.contains(entry_name.as_str()) {
                continue;
            }
            fsutil::remove_dir_all(&entry.path())?;
            removed_names.push(entry_name);
        }
    }

    // Dangling child links elsewhere in packages_dir/ that pointed at a
    // removed package are cleaned up implicitly: every surviving package
    // was just re-materialized with a fresh .git-packages/ by the caller's
    // next install, and nothing still on disk points at a deleted name
    // unless that install is re-run. Scan defensively anyway in case the
    // caller does not immediately reinstall.
    for removed_name in &removed_names {
        remove_dangling_child_links(&packages_dir, removed_name)?;
    }

    write_env_file(root, cfg, &surviving)?;
    Ok(removed_names)
}

fn remove_dangling_child_links(packages_dir: &Path, removed_name: &str) -> Result<()> {
    if !packages_dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(packages_dir)? {
        let entry = entry?;
        let links_dir = entry.path().join(".git-packages");
        let dangling = links_dir.join(removed_name);
        if dangling.exists() || dangling.is_symlink() {
            fsutil::remove_dir_all(&dangling)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Ref, RepoId};
    use crate::manifest::PackageSource;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn pkg(name: &str) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_string(),
            source: PackageSource::Git {
                repo: RepoId::new("github.com/owner/repo"),
                path: None,
                reference: Ref::Tag("v1.0.0".into()),
            },
            content_dir: PathBuf::new(),
            depends_on: vec![],
        }
    }

    #[test]
    fn env_var_name_replaces_invalid_characters() {
        assert_eq!(env_var_name("my-pkg.v2"), "MY_PKG_V2");
    }

    #[test]
    fn env_file_lists_packages_and_roots() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::default();
        write_env_file(tmp.path(), &cfg, &[pkg("widget")]).unwrap();
        let content = std::fs::read_to_string(tmp.path().join(ENV_FILE_NAME)).unwrap();
        assert!(content.contains("GIT_PM_PACKAGES_DIR="));
        assert!(content.contains("GIT_PM_PROJECT_ROOT="));
        assert!(content.contains("GIT_PM_PACKAGE_WIDGET="));
    }

    #[test]
    fn gitignore_created_with_managed_section() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::default();
        update_gitignore(tmp.path(), &cfg, true).unwrap();
        let content = std::fs::read_to_string(tmp.path().join(".gitignore")).unwrap();
        assert!(content.contains(".git-packages/"));
        assert!(content.contains(".git-pm.env"));
        assert!(content.contains("git-pm.local.toml"));
    }

    #[test]
    fn gitignore_preserves_existing_unrelated_content_and_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".gitignore"), "*.tmp\n.git-packages/\n").unwrap();
        let cfg = Config::default();

        update_gitignore(tmp.path(), &cfg, true).unwrap();
        let first = std::fs::read_to_string(tmp.path().join(".gitignore")).unwrap();
        assert!(first.starts_with("*.tmp\n"));

        update_gitignore(tmp.path(), &cfg, true).unwrap();
        let second = std::fs::read_to_string(tmp.path().join(".gitignore")).unwrap();
        assert_eq!(first, second, "repeated installs must not duplicate entries");
    }

    #[test]
    fn gitignore_disabled_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::default();
        update_gitignore(tmp.path(), &cfg, false).unwrap();
        assert!(!tmp.path().join(".gitignore").exists());
    }
}
