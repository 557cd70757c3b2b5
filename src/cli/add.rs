//! `git-pm add`: inserts or replaces one entry in the root manifest.
//! Does not install.

use crate::manifest::{self, EntryInput, RefKind};
use anyhow::Result;
use clap::{Args, ValueEnum};
use std::path::Path;

/// Which kind of ref `--ref-value` pins to.
#[derive(Clone, Copy, ValueEnum)]
pub enum RefTypeArg {
    /// An exact tag.
    Tag,
    /// A branch, resolved fresh on every install.
    Branch,
    /// An exact commit SHA.
    Commit,
}

impl From<RefTypeArg> for RefKind {
    fn from(value: RefTypeArg) -> Self {
        match value {
            RefTypeArg::Tag => Self::Tag,
            RefTypeArg::Branch => Self::Branch,
            RefTypeArg::Commit => Self::Commit,
        }
    }
}

/// Arguments for `git-pm add`.
#[derive(Args)]
pub struct AddArgs {
    /// Workspace-unique name for the new entry.
    name: String,
    /// Repository location, in any accepted input form.
    repo: String,
    /// Sparse subdirectory to materialize; omit for the repository root.
    #[arg(long)]
    path: Option<String>,
    /// Which of tag/branch/commit `--ref-value` pins. Defaults to `branch`.
    #[arg(long = "ref-type", value_enum)]
    ref_type: Option<RefTypeArg>,
    /// The tag, branch, or commit value. Defaults to `main` when
    /// `--ref-type`/`--ref-value` are both omitted.
    #[arg(long = "ref-value")]
    ref_value: Option<String>,
}

impl AddArgs {
    /// Insert or replace the manifest entry. This command never touches the
    /// network or the workspace's installed packages.
    pub fn execute(self, project_root: &Path) -> Result<()> {
        let ref_kind = self.ref_type.map_or(RefKind::Branch, Into::into);
        let ref_value = self.ref_value.unwrap_or_else(|| "main".to_string());

        let input = EntryInput::Git {
            repo: self.repo,
            path: self.path,
            ref_kind,
            ref_value,
        };
        manifest::upsert_package(project_root, &self.name, &input)?;
        println!("added '{}' to {}", self.name, manifest::MANIFEST_FILE_NAME);
        Ok(())
    }
}
