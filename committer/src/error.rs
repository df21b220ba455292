use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;
use vcs::VcsError;

/// Errors that can occur while preparing the working copy or running a batch
#[derive(Error, Debug)]
pub enum CommitterError {
    #[error("Version control operation failed: {0}")]
    Vcs(#[from] VcsError),

    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl CommitterError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| CommitterError::Io {
            action,
            path,
            source,
        }
    }
}

pub type CommitterResult<T> = Result<T, CommitterError>;
