//! Recurring batches on a cron schedule
//!
//! Each fire time spawns one trigger. A trigger first takes the batch task's
//! mutex with `try_lock`; if a previous batch still holds it the trigger is
//! skipped, so two batches never mutate the working copy at once. A failing
//! batch is logged and the schedule keeps firing.

use crate::batch::{BatchReport, BatchTask};
use crate::config::CommitterConfig;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use vcs::Vcs;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid schedule expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("Schedule '{0}' has no upcoming fire time")]
    Exhausted(String),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// A parsed cron expression.
///
/// Accepts the classic five-field form (`min hour dom month dow`) as well as
/// the six/seven-field form with a leading seconds field and optional year.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> ScheduleResult<Self> {
        let trimmed = expression.trim();
        let normalized = match trimmed.split_whitespace().count() {
            5 => format!("0 {}", trimmed),
            6 | 7 => trimmed.to_string(),
            n => {
                return Err(ScheduleError::InvalidExpression {
                    expression: expression.to_string(),
                    reason: format!("expected 5, 6 or 7 fields, found {}", n),
                })
            }
        };

        let schedule =
            Schedule::from_str(&normalized).map_err(|e| ScheduleError::InvalidExpression {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(after).next()
    }
}

#[derive(Debug)]
pub enum TriggerOutcome {
    Completed(BatchReport),
    Failed(String),
    /// A previous batch was still running
    Skipped,
}

/// Drives a [`BatchTask`] from a [`CronSchedule`]
#[derive(Clone)]
pub struct Scheduler {
    schedule: CronSchedule,
    vcs: Arc<dyn Vcs>,
    config: Arc<CommitterConfig>,
    task: Arc<Mutex<BatchTask>>,
}

impl Scheduler {
    pub fn new(schedule: CronSchedule, vcs: Arc<dyn Vcs>, config: Arc<CommitterConfig>) -> Self {
        Self {
            schedule,
            vcs,
            config,
            task: Arc::new(Mutex::new(BatchTask::new())),
        }
    }

    pub fn schedule(&self) -> &CronSchedule {
        &self.schedule
    }

    /// Run one batch now unless another one is in flight
    pub async fn trigger(&self) -> TriggerOutcome {
        let Ok(mut task) = self.task.try_lock() else {
            warn!("Previous batch still running, skipping this trigger");
            return TriggerOutcome::Skipped;
        };

        match task.run(self.vcs.as_ref(), &self.config).await {
            Ok(report) => {
                info!(commits = report.commits(), "Scheduled batch complete");
                TriggerOutcome::Completed(report)
            }
            Err(e) => {
                error!(error = %e, "Scheduled batch failed");
                TriggerOutcome::Failed(e.to_string())
            }
        }
    }

    /// Fire triggers on schedule until `shutdown` resolves, then wait for the
    /// batches still running. Returns the number of fire times reached.
    pub async fn run_until<F>(&self, shutdown: F) -> ScheduleResult<usize>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut fired = 0;
        let mut in_flight: Vec<JoinHandle<TriggerOutcome>> = Vec::new();
        let mut after = Utc::now();

        loop {
            after = after.max(Utc::now());
            let next = self
                .schedule
                .next_after(&after)
                .ok_or_else(|| ScheduleError::Exhausted(self.schedule.expression.clone()))?;
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            debug!(next = %next, "Waiting for next trigger");

            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(wait) => {
                    after = next;
                    fired += 1;
                    in_flight.retain(|handle| !handle.is_finished());
                    let scheduler = self.clone();
                    in_flight.push(tokio::spawn(async move { scheduler.trigger().await }));
                }
            }
        }

        info!(fired, pending = in_flight.len(), "Stopping scheduler");
        for handle in in_flight {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduled batch panicked");
            }
        }
        Ok(fired)
    }
}
