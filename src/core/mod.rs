//! Core types shared across the engine: errors and the reference/package
//! data model described in the manifest and resolver modules.

pub mod error;

pub use error::{ErrorContext, GitPmError, user_friendly_error};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Git reference: an exact tag, an exact commit, or a branch name that
/// must be resolved to a commit before it can be cached.
///
/// `Tag` and `Commit` are immutable-like: once fetched, the cache entry for
/// them is permanent. `Branch` is mutable and is re-resolved on every
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Ref {
    /// An exact, annotated or lightweight tag name.
    Tag(String),
    /// A branch name, resolved once per invocation to a commit.
    Branch(String),
    /// An exact commit SHA.
    Commit(String),
}

impl Ref {
    /// True for `Tag` and `Commit`; false for `Branch`.
    #[must_use]
    pub const fn is_immutable(&self) -> bool {
        !matches!(self, Self::Branch(_))
    }

    /// The raw string value regardless of variant, used for display and for
    /// cache-key hashing of non-branch refs.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Tag(v) | Self::Branch(v) | Self::Commit(v) => v,
        }
    }

    /// A short tag identifying the variant, used in the cache key tuple.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Tag(_) => "tag",
            Self::Branch(_) => "branch",
            Self::Commit(_) => "commit",
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// An opaque, provider-agnostic repository identifier such as
/// `github.com/owner/repo` or `dev.azure.com/org/project/repo`.
///
/// Equality is string equality after normalization (trimmed whitespace,
/// URL-decoded project segment). A `RepoId` is never itself a fetch URL;
/// see [`crate::url`] for that translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId(String);

impl RepoId {
    /// Build a `RepoId` from an already-canonical string (host/path form).
    #[must_use]
    pub fn new(canonical: impl Into<String>) -> Self {
        Self(normalize_repo_str(&canonical.into()))
    }

    /// The canonical string form, e.g. `github.com/owner/repo`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The host component, e.g. `github.com` or `dev.azure.com`.
    #[must_use]
    pub fn host(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// The path segments after the host, e.g. `["owner", "repo"]`.
    #[must_use]
    pub fn path_segments(&self) -> Vec<&str> {
        self.0.splitn(2, '/').nth(1).map(|p| p.split('/').collect()).unwrap_or_default()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trims whitespace and URL-decodes `%20`/`+` style encodings that can show
/// up in project segments (Azure DevOps project names may contain spaces).
fn normalize_repo_str(raw: &str) -> String {
    let trimmed = raw.trim();
    percent_decode(trimmed)
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3])
                && let Ok(byte) = u8::from_str_radix(hex, 16)
            {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
