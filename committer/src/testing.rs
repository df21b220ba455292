//! In-memory [`Vcs`] that records every call instead of running git.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use vcs::{CommandOutput, Identity, IdentityScope, Vcs, VcsError, VcsResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Clone { url: String, dest: PathBuf },
    SetIdentity { identity: Identity, scope: IdentityScope },
    Add(String),
    Commit(String),
    Push { remote: String, branch: String },
}

/// Which call should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Clone,
    /// 1-based index among commit calls
    Commit(usize),
    Push,
}

#[derive(Default)]
pub struct FakeVcs {
    calls: Mutex<Vec<Call>>,
    fail_on: Mutex<Option<FailOn>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(fail_on: FailOn) -> Self {
        let fake = Self::new();
        fake.fail_on(Some(fail_on));
        fake
    }

    pub fn fail_on(&self, fail_on: Option<FailOn>) {
        *self.fail_on.lock().unwrap() = fail_on;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commit_messages(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Commit(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn push_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Push { .. }))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) -> VcsResult<()> {
        let mut calls = self.calls.lock().unwrap();
        let commits_so_far = calls
            .iter()
            .filter(|c| matches!(c, Call::Commit(_)))
            .count();
        let should_fail = match (*self.fail_on.lock().unwrap(), &call) {
            (Some(FailOn::Clone), Call::Clone { .. }) => true,
            (Some(FailOn::Push), Call::Push { .. }) => true,
            (Some(FailOn::Commit(n)), Call::Commit(_)) => commits_so_far + 1 == n,
            _ => false,
        };
        if should_fail {
            return Err(VcsError::CommandFailed {
                command: format!("{:?}", call),
                status: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn clone_repo(&self, url: &str, dest: &Path) -> VcsResult<CommandOutput> {
        self.record(Call::Clone {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        })?;
        tokio::fs::create_dir_all(dest.join(".git"))
            .await
            .map_err(|source| VcsError::Spawn {
                command: "fake clone".to_string(),
                source,
            })?;
        Ok(CommandOutput::default())
    }

    async fn set_identity(
        &self,
        identity: &Identity,
        scope: IdentityScope,
        _workdir: &Path,
    ) -> VcsResult<()> {
        self.record(Call::SetIdentity {
            identity: identity.clone(),
            scope,
        })
    }

    async fn add(&self, _workdir: &Path, pathspec: &str) -> VcsResult<CommandOutput> {
        self.record(Call::Add(pathspec.to_string()))?;
        Ok(CommandOutput::default())
    }

    async fn commit(&self, _workdir: &Path, message: &str) -> VcsResult<CommandOutput> {
        self.record(Call::Commit(message.to_string()))?;
        Ok(CommandOutput::default())
    }

    async fn push(
        &self,
        _workdir: &Path,
        remote: &str,
        branch: &str,
    ) -> VcsResult<CommandOutput> {
        self.record(Call::Push {
            remote: remote.to_string(),
            branch: branch.to_string(),
        })?;
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: format!("To fake\n   main -> {}", branch),
        })
    }

    fn tool_name(&self) -> &'static str {
        "fake"
    }
}
