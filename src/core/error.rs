//! Error handling for git-pm.
//!
//! The error system mirrors the two-layer design used throughout this
//! codebase: a strongly-typed [`GitPmError`] enum for precise matching in
//! code, and an [`ErrorContext`] wrapper that adds a human-facing suggestion
//! and extra details before the error reaches the terminal.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// All failure modes the engine can report, per the error taxonomy.
///
/// Every fatal error raised by C1–C7 has a distinct variant here so callers
/// (and tests) can match on it rather than parsing message text.
#[derive(Error, Debug)]
pub enum GitPmError {
    /// The root or local-override manifest could not be parsed.
    #[error("manifest is malformed: {reason}")]
    ManifestMalformed {
        /// Path to the manifest that failed to parse.
        file: String,
        /// Underlying parse error text.
        reason: String,
    },

    /// `config` was asked to read/write a key outside the recognized set.
    #[error("unknown configuration key: {key}")]
    UnknownConfigKey {
        /// The key that was rejected.
        key: String,
    },

    /// Git authentication was rejected by the remote.
    #[error("authentication failed for repository: {repo}")]
    AuthFailed {
        /// Canonical repo id that rejected the credentials.
        repo: String,
    },

    /// The requested tag, branch, or commit does not exist on the remote.
    #[error("reference '{reference}' not found in {repo}")]
    RefNotFound {
        /// Canonical repo id.
        repo: String,
        /// The ref that could not be resolved.
        reference: String,
    },

    /// A network operation (ls-remote, clone, fetch) failed for reasons
    /// other than authentication.
    #[error("network error during {operation} for {repo}: {reason}")]
    NetworkError {
        /// Canonical repo id.
        repo: String,
        /// The git operation that failed.
        operation: String,
        /// Underlying reason, usually git's stderr.
        reason: String,
    },

    /// The configured sparse path resolved to nothing in the repo tree.
    #[error("path '{path}' is empty in {repo} at {reference}")]
    SparsePathEmpty {
        /// Canonical repo id.
        repo: String,
        /// The sparse path that matched nothing.
        path: String,
        /// The ref that was checked out.
        reference: String,
    },

    /// Dependency discovery found a cycle.
    #[error("circular dependency detected: {}", chain.join(" -> "))]
    CircularDependency {
        /// The package names forming the cycle, in traversal order.
        chain: Vec<String>,
    },

    /// Two distinct package specs claimed the same workspace name.
    #[error("package name collision: '{name}' is declared with two different sources")]
    PackageNameCollision {
        /// The conflicting name.
        name: String,
    },

    /// Symbolic link creation was unavailable; a fallback strategy was used.
    #[error("symlinks unsupported, fell back to {fallback}")]
    SymlinkUnsupported {
        /// The strategy that was substituted (`"junction"` or `"copy"`).
        fallback: String,
    },

    /// A filesystem write failed during install or workspace maintenance.
    #[error("failed to write {path}: {reason}")]
    WriteFailure {
        /// Path that could not be written.
        path: String,
        /// Underlying OS error text.
        reason: String,
    },

    /// A filesystem operation was denied by OS permissions.
    #[error("permission denied: {operation} on {path}")]
    PermissionDenied {
        /// The operation that was denied.
        operation: String,
        /// Path where permission was denied.
        path: String,
    },

    /// `remove` was asked to remove a package that isn't in the manifest.
    #[error("package '{name}' is not installed")]
    PackageNotInstalled {
        /// The name that was requested.
        name: String,
    },

    /// Two packages would install to the same workspace directory.
    #[error("path collision: '{name}' already occupies {path}")]
    PathCollision {
        /// The colliding package name.
        name: String,
        /// The workspace path both packages want.
        path: String,
    },

    /// IO error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error passthrough.
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error passthrough.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Catch-all for errors that don't need a dedicated variant.
    #[error("{message}")]
    Other {
        /// Generic error message.
        message: String,
    },
}

impl GitPmError {
    /// The process exit code this error kind should produce, per spec §6/§7
    /// (each taxonomy entry maps to a distinct non-zero code; passthrough
    /// and catch-all variants share a generic code).
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ManifestMalformed { .. } => 2,
            Self::UnknownConfigKey { .. } => 3,
            Self::AuthFailed { .. } => 4,
            Self::RefNotFound { .. } => 5,
            Self::NetworkError { .. } => 6,
            Self::SparsePathEmpty { .. } => 7,
            Self::CircularDependency { .. } => 8,
            Self::PackageNameCollision { .. } => 9,
            Self::SymlinkUnsupported { .. } => 10,
            Self::WriteFailure { .. } => 11,
            Self::PermissionDenied { .. } => 12,
            Self::PackageNotInstalled { .. } => 13,
            Self::PathCollision { .. } => 14,
            Self::Io(_) | Self::TomlDe(_) | Self::TomlSer(_) | Self::Other { .. } => 1,
        }
    }
}

/// Wraps a [`GitPmError`] with an optional suggestion and extra details for
/// display to a terminal user.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error.
    pub error: GitPmError,
    /// Actionable remedy, shown in green.
    pub suggestion: Option<String>,
    /// Extra context, shown in yellow.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error with no suggestion or details yet.
    #[must_use]
    pub const fn new(error: GitPmError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach additional context.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with the standard error/details/suggestion
    /// coloring.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);
        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, "\ndetails: {details}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nsuggestion: {suggestion}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Attach a tailored suggestion to an arbitrary top-level error before it is
/// shown to the user. Recognizes [`GitPmError`] variants and falls back to a
/// bare message for anything else. The original [`GitPmError`] variant (and
/// therefore its [`GitPmError::exit_code`]) is preserved rather than erased.
#[must_use]
pub fn user_friendly_error(err: anyhow::Error) -> ErrorContext {
    let details = {
        let chain: Vec<String> = err.chain().skip(1).map(std::string::ToString::to_string).collect();
        (!chain.is_empty()).then(|| chain.join("\n"))
    };

    let suggestion = err.downcast_ref::<GitPmError>().and_then(|gpe| {
        let text = match gpe {
            GitPmError::AuthFailed { .. } => {
                "Set AZURE_DEVOPS_PAT, SYSTEM_ACCESSTOKEN, or GIT_PM_TOKEN_<host> and retry"
            }
            GitPmError::RefNotFound { .. } => "Check that the tag, branch, or commit exists on the remote",
            GitPmError::NetworkError { .. } => "Check your network connection and the repository URL",
            GitPmError::ManifestMalformed { .. } => "Check the manifest for syntax errors",
            GitPmError::CircularDependency { .. } => {
                "Break the cycle by removing one of the dependency edges in the chain"
            }
            GitPmError::PackageNotInstalled { .. } => "Run 'git-pm install' first, or check the package name",
            _ => return None,
        };
        Some(text.to_string())
    });

    let error = match err.downcast::<GitPmError>() {
        Ok(gpe) => gpe,
        Err(err) => GitPmError::Other {
            message: err.to_string(),
        },
    };

    ErrorContext {
        error,
        suggestion,
        details,
    }
}
