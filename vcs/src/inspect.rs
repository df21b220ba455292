//! Read-only view of a working copy
//!
//! Uses git2 so reporting never spawns subprocesses and never modifies the
//! repository.

use git2::{BranchType, Repository};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading repository state
#[derive(Error, Debug)]
pub enum InspectError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Invalid UTF-8 in git data: {0}")]
    InvalidUtf8(String),

    #[error("No HEAD commit found")]
    NoHeadCommit,

    #[error("HEAD is detached")]
    DetachedHead,
}

pub type InspectResult<T> = Result<T, InspectError>;

/// Snapshot of the checked-out branch of a working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopyState {
    pub branch: String,
    pub head_sha: String,
    pub head_title: String,
    pub upstream: Option<String>,
    /// Local commits not yet on the upstream branch
    pub ahead: usize,
    pub behind: usize,
    /// Commits reachable from HEAD
    pub total_commits: usize,
}

impl WorkingCopyState {
    pub fn has_unpushed_commits(&self) -> bool {
        self.ahead > 0
    }
}

/// Read the state of the branch checked out at `path`
pub fn read_working_copy(path: impl AsRef<Path>) -> InspectResult<WorkingCopyState> {
    let repo = Repository::open(path.as_ref())?;
    let head = repo.head()?;

    if !head.is_branch() {
        return Err(InspectError::DetachedHead);
    }

    let branch = head
        .shorthand()
        .ok_or_else(|| InspectError::InvalidUtf8("branch name".to_string()))?
        .to_string();
    let head_oid = head.target().ok_or(InspectError::NoHeadCommit)?;
    let commit = repo.find_commit(head_oid)?;
    let head_title = commit.summary().unwrap_or("").to_string();

    let mut upstream = None;
    let mut ahead = 0;
    let mut behind = 0;

    let local = repo.find_branch(&branch, BranchType::Local)?;
    if let Ok(tracking) = local.upstream() {
        if let Some(name) = tracking.name()? {
            let upstream_oid = tracking
                .get()
                .target()
                .ok_or(InspectError::NoHeadCommit)?;
            (ahead, behind) = repo.graph_ahead_behind(head_oid, upstream_oid)?;
            upstream = Some(name.to_string());
        }
    }

    Ok(WorkingCopyState {
        branch,
        head_sha: head_oid.to_string(),
        head_title,
        upstream,
        ahead,
        behind,
        total_commits: walk_from_head(&repo)?,
    })
}

/// Count the commits reachable from HEAD. Works on bare repositories too.
pub fn count_commits(path: impl AsRef<Path>) -> InspectResult<usize> {
    let repo = Repository::open(path.as_ref())?;
    walk_from_head(&repo)
}

fn walk_from_head(repo: &Repository) -> InspectResult<usize> {
    let mut walk = repo.revwalk()?;
    walk.push_head()?;
    let mut count = 0;
    for oid in walk {
        oid?;
        count += 1;
    }
    Ok(count)
}
