//! Configuration resolution (C1).
//!
//! Merges built-in defaults, user-scope configuration, and project-scope
//! configuration into one frozen [`Config`], and captures the authentication
//! hints available from the process environment. Never touches the network
//! and never fails on a missing file — absence is treated as empty, exactly
//! as spec §4.1 requires.

use crate::core::error::GitPmError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The closed set of recognized configuration keys and their defaults.
///
/// Nested maps (`git_protocol`, `url_patterns`) are merged key-wise across
/// layers; everything else is replaced wholesale by the higher-priority
/// layer, per spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace install root, relative to the workspace root.
    pub packages_dir: PathBuf,
    /// Cache root. Defaults to a platform cache directory under `git-pm`.
    pub cache_dir: PathBuf,
    /// Per-host protocol preference (`"ssh"` or `"https"`).
    pub git_protocol: HashMap<String, String>,
    /// Per-host URL construction override; `{path}` is substituted with the
    /// `RepoId`'s path segment.
    pub url_patterns: HashMap<String, String>,
    /// Azure DevOps personal access token, if configured here rather than
    /// via `AZURE_DEVOPS_PAT`.
    pub azure_devops_pat: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            packages_dir: PathBuf::from(".git-packages"),
            cache_dir: default_cache_dir().unwrap_or_else(|| PathBuf::from(".git-pm-cache")),
            git_protocol: HashMap::new(),
            url_patterns: HashMap::new(),
            azure_devops_pat: String::new(),
        }
    }
}

/// Recognized configuration key names, used by `config --list`/`--unset`
/// to reject unknown keys.
pub const RECOGNIZED_KEYS: &[&str] =
    &["packages_dir", "cache_dir", "git_protocol", "url_patterns", "azure_devops_pat"];

impl Config {
    /// Deep-merge another layer on top of `self`. Nested maps are merged
    /// key-wise; scalars are replaced. `other` wins on conflicts.
    fn merge(mut self, other: PartialConfig) -> Self {
        if let Some(v) = other.packages_dir {
            self.packages_dir = v;
        }
        if let Some(v) = other.cache_dir {
            self.cache_dir = v;
        }
        for (k, v) in other.git_protocol {
            self.git_protocol.insert(k, v);
        }
        for (k, v) in other.url_patterns {
            self.url_patterns.insert(k, v);
        }
        if let Some(v) = other.azure_devops_pat {
            self.azure_devops_pat = v;
        }
        self
    }

    /// Load the effective configuration for a workspace rooted at
    /// `project_root`, optionally overriding the user-config file location
    /// (the CLI's `--config` flag).
    ///
    /// Merge order, lowest priority first: built-in defaults → user config
    /// → project config. Missing files at any layer are silently treated as
    /// empty; this never fails on absence.
    pub fn load(project_root: &Path, user_config_override: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::default();

        let user_path = match user_config_override {
            Some(p) => p.to_path_buf(),
            None => default_user_config_path()?,
        };
        if let Some(layer) = read_partial(&user_path)? {
            cfg = cfg.merge(layer);
        }

        let project_path = project_config_path(project_root);
        if let Some(layer) = read_partial(&project_path)? {
            cfg = cfg.merge(layer);
        }

        if let Ok(dir) = std::env::var("GIT_PM_CACHE_DIR") {
            cfg.cache_dir = PathBuf::from(dir);
        }

        Ok(cfg)
    }

    /// Read a single recognized key as a displayable string, for `config
    /// <key>` / `config --list`.
    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "packages_dir" => Ok(self.packages_dir.display().to_string()),
            "cache_dir" => Ok(self.cache_dir.display().to_string()),
            "azure_devops_pat" => Ok(self.azure_devops_pat.clone()),
            "git_protocol" => Ok(format_map(&self.git_protocol)),
            "url_patterns" => Ok(format_map(&self.url_patterns)),
            other => Err(GitPmError::UnknownConfigKey {
                key: other.to_string(),
            }
            .into()),
        }
    }
}

fn format_map(m: &HashMap<String, String>) -> String {
    let mut entries: Vec<_> = m.iter().collect();
    entries.sort();
    entries.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(", ")
}

/// The project-scope config file path for a workspace rooted at `root`.
#[must_use]
pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(".git-pm").join("config.toml")
}

/// Write a single recognized scalar key into the config file at `path`,
/// preserving the rest of the document's formatting. Rejects unknown keys
/// and the two map-valued keys, which this single-key form can't express.
pub fn set_key(path: &Path, key: &str, value: &str) -> Result<()> {
    if !RECOGNIZED_KEYS.contains(&key) {
        return Err(GitPmError::UnknownConfigKey {
            key: key.to_string(),
        }
        .into());
    }
    if key == "git_protocol" || key == "url_patterns" {
        anyhow::bail!("'{key}' is a per-host map; edit the config file directly to add entries");
    }

    let text = if path.exists() {
        std::fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path.display()))?
    } else {
        String::new()
    };
    let mut doc: toml_edit::DocumentMut =
        text.parse().with_context(|| format!("failed to parse config file {}", path.display()))?;
    doc[key] = toml_edit::value(value);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, doc.to_string()).with_context(|| format!("failed to write config file {}", path.display()))
}

/// Remove a single key from the config file at `path`, if present. A no-op
/// if the file or key doesn't exist.
pub fn unset_key(path: &Path, key: &str) -> Result<()> {
    if !RECOGNIZED_KEYS.contains(&key) {
        return Err(GitPmError::UnknownConfigKey {
            key: key.to_string(),
        }
        .into());
    }
    if !path.exists() {
        return Ok(());
    }
    let text = std::fs::read_to_string(path)?;
    let mut doc: toml_edit::DocumentMut =
        text.parse().with_context(|| format!("failed to parse config file {}", path.display()))?;
    doc.as_table_mut().remove(key);
    std::fs::write(path, doc.to_string()).with_context(|| format!("failed to write config file {}", path.display()))
}

/// One recognized key's effective value and which layer last set it, for
/// `config --list`.
pub struct EffectiveEntry {
    /// The config key name.
    pub key: String,
    /// Its effective (merged) value, formatted for display.
    pub value: String,
    /// Which layer won: `"default"`, `"user"`, or `"project"`.
    pub source: String,
}

/// Compute the effective value and winning layer for every recognized key.
pub fn list_effective(root: &Path, user_config_override: Option<&Path>) -> Result<Vec<EffectiveEntry>> {
    let cfg = Config::load(root, user_config_override)?;
    let user_path = match user_config_override {
        Some(p) => p.to_path_buf(),
        None => default_user_config_path()?,
    };
    let user_layer = read_partial(&user_path)?;
    let project_layer = read_partial(&project_config_path(root))?;

    let source_for = |has_user: bool, has_project: bool| -> &'static str {
        if has_project {
            "project"
        } else if has_user {
            "user"
        } else {
            "default"
        }
    };

    let entries = RECOGNIZED_KEYS
        .iter()
        .map(|&key| {
            let (has_user, has_project) = match key {
                "packages_dir" => (
                    user_layer.as_ref().is_some_and(|l| l.packages_dir.is_some()),
                    project_layer.as_ref().is_some_and(|l| l.packages_dir.is_some()),
                ),
                "cache_dir" => (
                    user_layer.as_ref().is_some_and(|l| l.cache_dir.is_some()),
                    project_layer.as_ref().is_some_and(|l| l.cache_dir.is_some()),
                ),
                "azure_devops_pat" => (
                    user_layer.as_ref().is_some_and(|l| l.azure_devops_pat.is_some()),
                    project_layer.as_ref().is_some_and(|l| l.azure_devops_pat.is_some()),
                ),
                "git_protocol" => (
                    user_layer.as_ref().is_some_and(|l| !l.git_protocol.is_empty()),
                    project_layer.as_ref().is_some_and(|l| !l.git_protocol.is_empty()),
                ),
                "url_patterns" => (
                    user_layer.as_ref().is_some_and(|l| !l.url_patterns.is_empty()),
                    project_layer.as_ref().is_some_and(|l| !l.url_patterns.is_empty()),
                ),
                _ => (false, false),
            };
            EffectiveEntry {
                key: (*key).to_string(),
                value: cfg.get(key).unwrap_or_default(),
                source: source_for(has_user, has_project).to_string(),
            }
        })
        .collect();
    Ok(entries)
}

/// A partially-specified configuration layer as read from a config file:
/// every field is optional so that merging only overrides what's present.
#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    packages_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    #[serde(default)]
    git_protocol: HashMap<String, String>,
    #[serde(default)]
    url_patterns: HashMap<String, String>,
    azure_devops_pat: Option<String>,
}

fn read_partial(path: &Path) -> Result<Option<PartialConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let parsed: PartialConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(Some(parsed))
}

/// Per-host and generic authentication material pulled from the process
/// environment once, up front, so later stages (the URL resolver, the
/// fetcher) are pure functions of their explicit inputs rather than reaching
/// into the environment themselves (spec §9 design note).
#[derive(Debug, Clone, Default)]
pub struct AuthHints {
    /// `AZURE_DEVOPS_PAT`, if set.
    pub azure_devops_pat: Option<String>,
    /// `SYSTEM_ACCESSTOKEN`, the Azure Pipelines bearer token, if set.
    pub system_access_token: Option<String>,
    /// Generic `GIT_PM_TOKEN_<host_underscored>` variables, keyed by the
    /// original dotted host.
    pub host_tokens: HashMap<String, String>,
}

impl AuthHints {
    /// Snapshot the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut host_tokens = HashMap::new();
        for (key, value) in std::env::vars() {
            if let Some(host_part) = key.strip_prefix("GIT_PM_TOKEN_") {
                let host = host_part.replace('_', ".");
                host_tokens.insert(host, value);
            }
        }
        Self {
            azure_devops_pat: std::env::var("AZURE_DEVOPS_PAT").ok(),
            system_access_token: std::env::var("SYSTEM_ACCESSTOKEN").ok(),
            host_tokens,
        }
    }

    /// Look up a generic per-host token, trying the host as given and then
    /// with dots replaced by underscores already resolved (the map key is
    /// always dotted).
    #[must_use]
    pub fn token_for_host(&self, host: &str) -> Option<&str> {
        self.host_tokens.get(host).map(String::as_str)
    }
}

/// The default user-scope config file path:
/// `~/.git-pm/config.toml` on Unix/macOS, `%LOCALAPPDATA%\git-pm\config.toml`
/// on Windows. Honors `GIT_PM_CONFIG_PATH` if set.
pub fn default_user_config_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var("GIT_PM_CONFIG_PATH") {
        return Ok(PathBuf::from(p));
    }
    let dir = if cfg!(target_os = "windows") {
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("cannot determine local data directory"))?.join("git-pm")
    } else {
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?.join(".git-pm")
    };
    Ok(dir.join("config.toml"))
}

fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("git-pm"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn missing_files_produce_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::load(tmp.path(), Some(&tmp.path().join("nope.toml"))).unwrap();
        assert_eq!(cfg.packages_dir, PathBuf::from(".git-packages"));
    }

    #[test]
    fn project_overrides_user() {
        let tmp = TempDir::new().unwrap();
        let user = tmp.path().join("user.toml");
        write_file(&user, "packages_dir = \"from-user\"\n");
        write_file(
            &tmp.path().join(".git-pm/config.toml"),
            "packages_dir = \"from-project\"\n",
        );
        let cfg = Config::load(tmp.path(), Some(&user)).unwrap();
        assert_eq!(cfg.packages_dir, PathBuf::from("from-project"));
    }

    #[test]
    fn git_protocol_maps_merge_key_wise() {
        let tmp = TempDir::new().unwrap();
        let user = tmp.path().join("user.toml");
        write_file(&user, "[git_protocol]\nexample.com = \"ssh\"\n");
        write_file(
            &tmp.path().join(".git-pm/config.toml"),
            "[git_protocol]\nother.com = \"https\"\n",
        );
        let cfg = Config::load(tmp.path(), Some(&user)).unwrap();
        assert_eq!(cfg.git_protocol.get("example.com").unwrap(), "ssh");
        assert_eq!(cfg.git_protocol.get("other.com").unwrap(), "https");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let cfg = Config::default();
        assert!(cfg.get("nonexistent").is_err());
    }

    #[test]
    fn set_key_then_get_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".git-pm/config.toml");
        set_key(&path, "packages_dir", "vendor").unwrap();
        let cfg = Config::load(tmp.path(), Some(&tmp.path().join("nope.toml"))).unwrap();
        assert_eq!(cfg.packages_dir, PathBuf::from("vendor"));
    }

    #[test]
    fn set_key_rejects_unknown_key() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        assert!(set_key(&path, "bogus", "x").is_err());
    }

    #[test]
    fn set_key_rejects_map_valued_key() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        assert!(set_key(&path, "git_protocol", "ssh").is_err());
    }

    #[test]
    fn unset_key_removes_previously_set_value() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        write_file(&path, "packages_dir = \"vendor\"\ncache_dir = \"c\"\n");
        unset_key(&path, "packages_dir").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("packages_dir"));
        assert!(text.contains("cache_dir"));
    }

    #[test]
    fn unset_key_on_missing_file_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        assert!(unset_key(&path, "packages_dir").is_ok());
        assert!(!path.exists());
    }

    #[test]
    fn list_effective_reports_winning_layer() {
        let tmp = TempDir::new().unwrap();
        let user = tmp.path().join("user.toml");
        write_file(&user, "packages_dir = \"from-user\"\ncache_dir = \"from-user-cache\"\n");
        write_file(&project_config_path(tmp.path()), "packages_dir = \"from-project\"\n");

        let entries = list_effective(tmp.path(), Some(&user)).unwrap();
        let by_key: HashMap<_, _> = entries.iter().map(|e| (e.key.clone(), e)).collect();
        assert_eq!(by_key["packages_dir"].source, "project");
        assert_eq!(by_key["packages_dir"].value, "from-project");
        assert_eq!(by_key["cache_dir"].source, "user");
        assert_eq!(by_key["azure_devops_pat"].source, "default");
    }

    #[test]
    fn auth_hints_reads_host_tokens() {
        // SAFETY: test-only env mutation, no concurrent access in this test.
        unsafe {
            std::env::set_var("GIT_PM_TOKEN_example_com", "tok123");
        }
        let hints = AuthHints::from_env();
        assert_eq!(hints.token_for_host("example.com"), Some("tok123"));
        unsafe {
            std::env::remove_var("GIT_PM_TOKEN_example_com");
        }
    }
}
