//! Version-control plumbing for auto-commit
//!
//! The [`Vcs`] trait is the seam between the commit workflow and the external
//! version-control tool. [`GitCli`] implements it by running the `git` binary
//! as a subprocess, and [`inspect`] reads working-copy state through git2
//! without modifying anything.

pub mod git;
pub mod inspect;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use git::{is_available, GitCli};
pub use inspect::{count_commits, read_working_copy, InspectError, WorkingCopyState};

/// Errors raised while driving the version-control tool
#[derive(Error, Debug)]
pub enum VcsError {
    /// The tool could not be started at all
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but reported failure
    #[error("Command `{command}` failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

pub type VcsResult<T> = Result<T, VcsError>;

/// Captured text output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// The most informative part of the output.
    ///
    /// git reports progress for network operations on stderr, so stderr wins
    /// whenever it has content.
    pub fn summary(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Author identity used for commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub const DEFAULT_NAME: &'static str = "Auto Commit";
    pub const DEFAULT_EMAIL: &'static str = "auto-commit@localhost";

    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME, Self::DEFAULT_EMAIL)
    }
}

/// Where an identity is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityScope {
    /// Tool-level configuration shared by every repository of the user
    #[default]
    Global,
    /// Configuration of the working copy only
    Local,
}

impl fmt::Display for IdentityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityScope::Global => write!(f, "global"),
            IdentityScope::Local => write!(f, "local"),
        }
    }
}

impl FromStr for IdentityScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(IdentityScope::Global),
            "local" => Ok(IdentityScope::Local),
            other => Err(format!(
                "unknown identity scope '{}', expected 'global' or 'local'",
                other
            )),
        }
    }
}

/// Operations the commit workflow needs from a version-control tool.
///
/// Every call is a single, blocking-until-done invocation; implementations
/// must report a non-zero exit as [`VcsError::CommandFailed`].
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `url` into `dest`.
    async fn clone_repo(&self, url: &str, dest: &Path) -> VcsResult<CommandOutput>;

    /// Write the author name and email. `workdir` is only consulted for
    /// [`IdentityScope::Local`].
    async fn set_identity(
        &self,
        identity: &Identity,
        scope: IdentityScope,
        workdir: &Path,
    ) -> VcsResult<()>;

    /// Stage `pathspec` inside `workdir`.
    async fn add(&self, workdir: &Path, pathspec: &str) -> VcsResult<CommandOutput>;

    /// Commit the staged changes with `message`.
    async fn commit(&self, workdir: &Path, message: &str) -> VcsResult<CommandOutput>;

    /// Push `branch` to `remote`.
    async fn push(&self, workdir: &Path, remote: &str, branch: &str)
        -> VcsResult<CommandOutput>;

    fn tool_name(&self) -> &'static str;
}
