use crate::scheduler::CronSchedule;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use vcs::{Identity, IdentityScope};

pub const DEFAULT_REPO_PATH: &str = "./auto-commit-repo";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_FILE_NAME: &str = "auto-file.txt";
pub const DEFAULT_COMMIT_COUNT: usize = 10;
pub const DEFAULT_SCHEDULE: &str = "* * * * *";

/// Character written by the seed commit and appended by every batch commit
pub const FILL_CHAR: char = 'A';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Repository URL cannot be empty (set REPO_URL or --repo-url)")]
    MissingRepoUrl,

    #[error("Invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything the commit workflow needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitterConfig {
    pub repo_url: String,
    pub repo_path: PathBuf,
    pub branch: String,
    pub remote: String,
    /// Tracked file, relative to `repo_path`
    pub file_name: String,
    /// Identity to configure before the seed commit, if any
    pub identity: Option<Identity>,
    pub identity_scope: IdentityScope,
    /// Commits per batch
    pub commit_count: usize,
    /// Cron expression for scheduled mode
    pub schedule: String,
}

impl Default for CommitterConfig {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            repo_path: PathBuf::from(DEFAULT_REPO_PATH),
            branch: DEFAULT_BRANCH.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            identity: None,
            identity_scope: IdentityScope::default(),
            commit_count: DEFAULT_COMMIT_COUNT,
            schedule: DEFAULT_SCHEDULE.to_string(),
        }
    }
}

impl CommitterConfig {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            ..Self::default()
        }
    }

    pub fn with_repo_path(mut self, repo_path: impl Into<PathBuf>) -> Self {
        self.repo_path = repo_path.into();
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_identity_scope(mut self, scope: IdentityScope) -> Self {
        self.identity_scope = scope;
        self
    }

    pub fn with_commit_count(mut self, commit_count: usize) -> Self {
        self.commit_count = commit_count;
        self
    }

    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = schedule.into();
        self
    }

    pub fn tracked_file_path(&self) -> PathBuf {
        self.repo_path.join(&self.file_name)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.repo_url.trim().is_empty() {
            return Err(ConfigError::MissingRepoUrl);
        }

        if self.repo_path.as_os_str().is_empty() {
            return Err(invalid("repository path", "cannot be empty"));
        }

        if self.branch.is_empty() || self.branch.chars().any(char::is_whitespace) {
            return Err(invalid(
                "branch name",
                format!("'{}' must be non-empty without whitespace", self.branch),
            ));
        }

        if self.remote.is_empty() || self.remote.chars().any(char::is_whitespace) {
            return Err(invalid(
                "remote name",
                format!("'{}' must be non-empty without whitespace", self.remote),
            ));
        }

        let file = Path::new(&self.file_name);
        if self.file_name.is_empty()
            || !file
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(invalid(
                "file name",
                format!(
                    "'{}' must be a relative path inside the working copy",
                    self.file_name
                ),
            ));
        }

        if let Some(identity) = &self.identity {
            if identity.name.trim().is_empty() {
                return Err(invalid("author name", "cannot be empty"));
            }
            if !identity.email.contains('@') {
                return Err(invalid(
                    "author email",
                    format!("'{}' is not an email address", identity.email),
                ));
            }
        }

        if self.commit_count == 0 {
            return Err(invalid("commit count", "must be greater than 0"));
        }

        CronSchedule::parse(&self.schedule).map_err(|e| invalid("schedule", e.to_string()))?;

        Ok(())
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}
