//! `git` command-line implementation of [`Vcs`]
//!
//! All operations shell out to the `git` binary using
//! `tokio::process::Command`. Nothing here retries or times out: a hung
//! subprocess blocks its caller until it exits.

use crate::{CommandOutput, Identity, IdentityScope, Vcs, VcsError, VcsResult};
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs git as a subprocess
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    envs: Vec<(String, String)>,
}

impl GitCli {
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Use a specific executable instead of `git` from `PATH`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            envs: Vec::new(),
        }
    }

    /// Add an environment variable to every invocation
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn exec<I, S>(&self, workdir: Option<&Path>, args: I) -> VcsResult<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let command_line = self.render(&args);

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        debug!(command = %command_line, "Running git");
        let output = cmd.output().await.map_err(|source| VcsError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command: command_line,
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }

    fn render(&self, args: &[OsString]) -> String {
        let mut line = self.program.clone();
        for arg in args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> VcsResult<CommandOutput> {
        self.exec(
            None,
            [
                OsStr::new("clone"),
                OsStr::new("--"),
                OsStr::new(url),
                dest.as_os_str(),
            ],
        )
        .await
    }

    async fn set_identity(
        &self,
        identity: &Identity,
        scope: IdentityScope,
        workdir: &Path,
    ) -> VcsResult<()> {
        let settings = [("user.name", &identity.name), ("user.email", &identity.email)];
        for (key, value) in settings {
            match scope {
                IdentityScope::Global => {
                    self.exec(None, ["config", "--global", key, value.as_str()])
                        .await?;
                }
                IdentityScope::Local => {
                    self.exec(Some(workdir), ["config", key, value.as_str()])
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn add(&self, workdir: &Path, pathspec: &str) -> VcsResult<CommandOutput> {
        self.exec(Some(workdir), ["add", "--", pathspec]).await
    }

    async fn commit(&self, workdir: &Path, message: &str) -> VcsResult<CommandOutput> {
        self.exec(Some(workdir), ["commit", "-m", message]).await
    }

    async fn push(
        &self,
        workdir: &Path,
        remote: &str,
        branch: &str,
    ) -> VcsResult<CommandOutput> {
        self.exec(Some(workdir), ["push", remote, branch]).await
    }

    fn tool_name(&self) -> &'static str {
        "git"
    }
}

/// Check whether `program` can be run as git
pub async fn is_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok_and(|status| status.success())
}
