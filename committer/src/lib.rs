//! Commit batch runner for auto-commit
//!
//! ```no_run
//! use committer::{prepare, BatchTask, CommitterConfig};
//! use vcs::GitCli;
//!
//! # async fn run() -> Result<(), committer::CommitterError> {
//! let config = CommitterConfig::new("https://example.com/r.git").with_file_name("f.txt");
//! let git = GitCli::new();
//!
//! prepare(&git, &config).await?;
//! let report = BatchTask::new().run(&git, &config).await?;
//! println!("{} commits pushed", report.commits());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use batch::{commit_message, BatchReport, BatchTask, CommitCounter};
pub use config::{CommitterConfig, ConfigError, ConfigResult, FILL_CHAR};
pub use error::{CommitterError, CommitterResult};
pub use scheduler::{CronSchedule, ScheduleError, ScheduleResult, Scheduler, TriggerOutcome};
pub use workflow::{
    configure_identity, initialize_repo, prepare, seed_commit, seed_message, InitOutcome,
    SeedOutcome, StartupReport,
};
