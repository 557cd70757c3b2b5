//! git-pm: a git-backed package manager that materializes declared
//! subdirectories of remote repositories into a local workspace.
//!
//! See each module for the component it implements: [`config`] (C1),
//! [`url`] (C2), [`git`] and [`cache`] (C3/C4), [`resolver`] (C5),
//! [`installer`] (C6), and [`workspace`] (C7).

pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod git;
pub mod installer;
pub mod manifest;
pub mod resolver;
pub mod url;
pub mod utils;
pub mod workspace;

#[cfg(feature = "test-utils")]
pub mod test_utils;
