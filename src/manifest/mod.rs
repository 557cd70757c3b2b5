//! Manifest loading (C3).
//!
//! A workspace declares its direct package dependencies in `git-pm.toml` at
//! the workspace root. An optional sibling `git-pm.local.toml`, intended to
//! be gitignored, overrides individual packages for local development
//! without modifying the shared manifest. Both files are TOML; an absent
//! manifest is treated as a manifest with no packages rather than an error.

use crate::core::error::GitPmError;
use crate::core::{Ref, RepoId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The name of the root manifest file, at the workspace root.
pub const MANIFEST_FILE_NAME: &str = "git-pm.toml";
/// The name of the optional local-override manifest, meant to be gitignored.
pub const LOCAL_MANIFEST_FILE_NAME: &str = "git-pm.local.toml";

/// A fully loaded manifest: the declared packages, keyed by workspace name,
/// in deterministic (sorted) order, plus the original declaration order for
/// tie-breaking during topological sort.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// Packages keyed by their workspace name.
    pub packages: BTreeMap<String, PackageSpec>,
    /// Names in the order they first appeared across the root manifest and
    /// then the local override, used to break topological-sort ties.
    pub declaration_order: Vec<String>,
}

/// A single dependency declaration: either a nested Git repository or a
/// local filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageSpec {
    /// A package whose content is fetched from a Git repository.
    Git {
        /// Repository location, in any of the accepted input forms.
        repo: String,
        /// Sparse subdirectory within the repository to materialize.
        #[serde(default)]
        path: Option<String>,
        /// The tag, branch, or commit to pin to.
        #[serde(flatten)]
        reference: RawRef,
    },
    /// A package that points at an existing local directory instead of a
    /// Git repository; useful for local development and overrides.
    Local {
        /// Filesystem path, relative to the manifest's directory.
        path: PathBuf,
    },
}

/// The on-disk representation of a ref: exactly one of `tag`, `branch`, or
/// `commit` must be present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
}

impl RawRef {
    fn into_ref(self, package_name: &str) -> Result<Ref> {
        match (self.tag, self.branch, self.commit) {
            (Some(v), None, None) => Ok(Ref::Tag(v)),
            (None, Some(v), None) => Ok(Ref::Branch(v)),
            (None, None, Some(v)) => Ok(Ref::Commit(v)),
            (None, None, None) => Ok(Ref::Branch("main".to_string())),
            _ => Err(GitPmError::ManifestMalformed {
                file: MANIFEST_FILE_NAME.to_string(),
                reason: format!(
                    "package '{package_name}' must specify exactly one of tag, branch, or commit"
                ),
            }
            .into()),
        }
    }
}

/// A package's source resolved out of raw TOML into the engine's own types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// Fetched from a Git repository at a sparse path and pinned ref.
    Git {
        /// Canonical repository identifier.
        repo: RepoId,
        /// Sparse subdirectory, or `None` for the repository root.
        path: Option<String>,
        /// The pinned reference.
        reference: Ref,
    },
    /// A local directory, copied or linked as-is.
    Local {
        /// Absolute, resolved filesystem path.
        path: PathBuf,
    },
}

/// A package entry with its source resolved, ready for the dependency
/// resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    /// Workspace-unique package name.
    pub name: String,
    /// Where this package's content comes from.
    pub source: PackageSource,
}

impl Manifest {
    /// Load the manifest at `root`, merging `git-pm.local.toml` over
    /// `git-pm.toml` if present. An entirely absent root manifest yields an
    /// empty manifest rather than an error — spec §4.3 permits a workspace
    /// with zero declared packages.
    pub fn load(root: &Path) -> Result<Self> {
        let root_path = root.join(MANIFEST_FILE_NAME);
        let mut manifest = if root_path.exists() {
            Self::parse_file(&root_path)?
        } else {
            Self::default()
        };

        let local_path = root.join(LOCAL_MANIFEST_FILE_NAME);
        if local_path.exists() {
            let local = Self::parse_file(&local_path)?;
            for name in local.declaration_order {
                if !manifest.packages.contains_key(&name) {
                    manifest.declaration_order.push(name.clone());
                }
                let spec = local.packages.get(&name).expect("name came from this map").clone();
                manifest.packages.insert(name, spec);
            }
        }

        Ok(manifest)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let raw: RawManifest = toml_edit::de::from_str(&text).map_err(|e| GitPmError::ManifestMalformed {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let declaration_order: Vec<String> = raw.packages.keys().cloned().collect();
        Ok(Self {
            packages: raw.packages,
            declaration_order,
        })
    }

    /// Resolve every declared package's raw TOML shape into a
    /// [`PackageSource`], relative to `root` for local paths.
    pub fn resolve_entries(&self, root: &Path) -> Result<Vec<ResolvedEntry>> {
        let mut entries = Vec::with_capacity(self.packages.len());
        for name in &self.declaration_order {
            let spec = self
                .packages
                .get(name)
                .expect("declaration_order only contains keys present in packages");
            let source = match spec {
                PackageSpec::Git {
                    repo,
                    path,
                    reference,
                } => {
                    let repo_id = crate::url::normalize_repo_id(repo);
                    let reference = reference.clone().into_ref(name)?;
                    PackageSource::Git {
                        repo: repo_id,
                        path: path.clone(),
                        reference,
                    }
                }
                PackageSpec::Local { path } => PackageSource::Local {
                    path: root.join(path),
                },
            };
            entries.push(ResolvedEntry {
                name: name.clone(),
                source,
            });
        }
        Ok(entries)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawManifest {
    #[serde(default)]
    packages: BTreeMap<String, PackageSpec>,
}

/// The kind of ref an `add`-edited entry pins to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// An exact tag name.
    Tag,
    /// A branch name, resolved fresh on every install.
    Branch,
    /// An exact commit SHA.
    Commit,
}

impl RefKind {
    const fn key(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Branch => "branch",
            Self::Commit => "commit",
        }
    }
}

/// The fields of a single manifest entry as edited by the `add` command,
/// independent of the TOML document's own formatting.
#[derive(Debug, Clone)]
pub enum EntryInput {
    /// A Git-sourced package.
    Git {
        /// Repository location, in any accepted input form.
        repo: String,
        /// Sparse subdirectory, or `None` for the repository root.
        path: Option<String>,
        /// Which of tag/branch/commit `ref_value` pins.
        ref_kind: RefKind,
        /// The pinned value itself.
        ref_value: String,
    },
    /// A local-filesystem package.
    Local {
        /// Path, relative to the manifest's directory.
        path: PathBuf,
    },
}

/// Insert or replace the `[packages.<name>]` entry in the root manifest at
/// `root`, preserving the rest of the document's formatting. Creates the
/// manifest file if it does not yet exist.
pub fn upsert_package(root: &Path, name: &str, input: &EntryInput) -> Result<()> {
    let path = root.join(MANIFEST_FILE_NAME);
    let text = if path.exists() {
        std::fs::read_to_string(&path).with_context(|| format!("failed to read manifest {}", path.display()))?
    } else {
        String::new()
    };
    let mut doc: toml_edit::DocumentMut = text.parse().map_err(|e: toml_edit::TomlError| GitPmError::ManifestMalformed {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;

    if doc.get("packages").is_none() {
        doc["packages"] = toml_edit::table();
    }
    let packages = doc["packages"]
        .as_table_mut()
        .ok_or_else(|| GitPmError::ManifestMalformed {
            file: path.display().to_string(),
            reason: "'packages' is not a table".to_string(),
        })?;

    let mut entry = toml_edit::table();
    match input {
        EntryInput::Git {
            repo,
            path: sub_path,
            ref_kind,
            ref_value,
        } => {
            entry["repo"] = toml_edit::value(repo.as_str());
            if let Some(p) = sub_path {
                entry["path"] = toml_edit::value(p.as_str());
            }
            entry[ref_kind.key()] = toml_edit::value(ref_value.as_str());
        }
        EntryInput::Local { path: local_path } => {
            entry["path"] = toml_edit::value(local_path.display().to_string());
        }
    }
    packages[name] = entry;

    std::fs::write(&path, doc.to_string()).with_context(|| format!("failed to write manifest {}", path.display()))?;
    Ok(())
}

/// Remove `name` from whichever of the root manifest and local-override
/// manifest declare it. Returns `true` if it was found in either.
pub fn remove_package(root: &Path, name: &str) -> Result<bool> {
    let mut removed = false;
    for file_name in [MANIFEST_FILE_NAME, LOCAL_MANIFEST_FILE_NAME] {
        let path = root.join(file_name);
        if !path.exists() {
            continue;
        }
        let text = std::fs::read_to_string(&path).with_context(|| format!("failed to read manifest {}", path.display()))?;
        let mut doc: toml_edit::DocumentMut =
            text.parse().map_err(|e: toml_edit::TomlError| GitPmError::ManifestMalformed {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let found = doc
            .get_mut("packages")
            .and_then(toml_edit::Item::as_table_mut)
            .is_some_and(|table| table.remove(name).is_some());
        if found {
            removed = true;
            std::fs::write(&path, doc.to_string())
                .with_context(|| format!("failed to write manifest {}", path.display()))?;
        }
    }
    Ok(removed)
}
