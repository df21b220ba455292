//! The batch commit task
//!
//! A batch appends one character to the tracked file, stages it and commits
//! it, `commit_count` times, then pushes everything in a single push.

use crate::config::{CommitterConfig, FILL_CHAR};
use crate::error::{CommitterError, CommitterResult};
use chrono::{NaiveDate, Utc};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::info;
use vcs::Vcs;

/// Commits made by the current batch invocation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitCounter(usize);

impl CommitCounter {
    pub fn value(&self) -> usize {
        self.0
    }

    /// Sequence number of the next commit (1-based)
    pub fn next_sequence(&self) -> usize {
        self.0 + 1
    }

    fn increment(&mut self) {
        self.0 += 1;
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub messages: Vec<String>,
    pub push_summary: String,
}

impl BatchReport {
    pub fn commits(&self) -> usize {
        self.messages.len()
    }
}

pub fn commit_message(date: NaiveDate, sequence: usize) -> String {
    format!("Daily push {} #{}", date.format("%Y/%m/%d"), sequence)
}

#[derive(Debug, Default)]
pub struct BatchTask {
    counter: CommitCounter,
}

impl BatchTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> CommitCounter {
        self.counter
    }

    /// Run one batch, dating commit messages with the current UTC day
    pub async fn run(
        &mut self,
        vcs: &dyn Vcs,
        config: &CommitterConfig,
    ) -> CommitterResult<BatchReport> {
        self.run_with_clock(vcs, config, || Utc::now().date_naive())
            .await
    }

    /// Run one batch with an explicit date source.
    ///
    /// The counter restarts at zero on entry, so numbering starts at #1 even
    /// when the previous invocation failed part-way. A failure aborts the
    /// remaining iterations without pushing; commits already made stay in
    /// the working copy and go out with the next successful push.
    pub async fn run_with_clock<F>(
        &mut self,
        vcs: &dyn Vcs,
        config: &CommitterConfig,
        today: F,
    ) -> CommitterResult<BatchReport>
    where
        F: Fn() -> NaiveDate + Send + Sync,
    {
        self.counter.reset();
        let path = config.tracked_file_path();
        let mut messages = Vec::new();

        for _ in 0..config.commit_count {
            append_char(&path, FILL_CHAR).await?;

            let sequence = self.counter.next_sequence();
            info!(sequence, "Staging and committing changes");
            vcs.add(&config.repo_path, &config.file_name).await?;

            let message = commit_message(today(), sequence);
            vcs.commit(&config.repo_path, &message).await?;
            self.counter.increment();
            messages.push(message);
        }

        info!(commits = messages.len(), "Commits done, pushing changes");
        let output = vcs
            .push(&config.repo_path, &config.remote, &config.branch)
            .await?;
        let push_summary = output.summary().to_string();
        if !push_summary.is_empty() {
            info!("{}", push_summary);
        }

        self.counter.reset();
        Ok(BatchReport {
            messages,
            push_summary,
        })
    }
}

async fn append_char(path: &Path, c: char) -> CommitterResult<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .await
        .map_err(CommitterError::io("open", path))?;
    let mut buf = [0u8; 4];
    file.write_all(c.encode_utf8(&mut buf).as_bytes())
        .await
        .map_err(CommitterError::io("append to", path))?;
    file.flush()
        .await
        .map_err(CommitterError::io("flush", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FailOn, FakeVcs};
    use regex::Regex;
    use tempfile::TempDir;

    fn seeded_config(root: &TempDir) -> CommitterConfig {
        let config = CommitterConfig::new("https://example.com/r.git")
            .with_repo_path(root.path())
            .with_file_name("f.txt");
        std::fs::write(config.tracked_file_path(), "A").unwrap();
        config
    }

    fn fixed_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn file_len(config: &CommitterConfig) -> usize {
        std::fs::read_to_string(config.tracked_file_path())
            .unwrap()
            .len()
    }

    #[test]
    fn test_commit_message_format() {
        assert_eq!(commit_message(fixed_day(), 1), "Daily push 2024/03/05 #1");
        assert_eq!(
            commit_message(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(), 15),
            "Daily push 2025/12/31 #15"
        );
    }

    #[tokio::test]
    async fn test_batch_appends_commits_and_pushes_once() {
        let root = TempDir::new().unwrap();
        let config = seeded_config(&root);
        let vcs = FakeVcs::new();
        let mut task = BatchTask::new();

        let report = task
            .run_with_clock(&vcs, &config, fixed_day)
            .await
            .unwrap();

        assert_eq!(report.commits(), 10);
        assert_eq!(
            std::fs::read_to_string(config.tracked_file_path()).unwrap(),
            "A".repeat(11)
        );
        assert_eq!(vcs.push_count(), 1);
        assert_eq!(task.counter().value(), 0);
        assert_eq!(
            vcs.calls().last(),
            Some(&Call::Push {
                remote: "origin".to_string(),
                branch: "main".to_string(),
            })
        );
        assert_eq!(report.push_summary, "To fake\n   main -> main");

        let expected: Vec<String> = (1..=10)
            .map(|n| format!("Daily push 2024/03/05 #{}", n))
            .collect();
        assert_eq!(vcs.commit_messages(), expected);
        assert_eq!(report.messages, expected);
    }

    #[tokio::test]
    async fn test_every_commit_is_staged_first() {
        let root = TempDir::new().unwrap();
        let config = seeded_config(&root).with_commit_count(3);
        let vcs = FakeVcs::new();

        BatchTask::new()
            .run_with_clock(&vcs, &config, fixed_day)
            .await
            .unwrap();

        let calls = vcs.calls();
        assert_eq!(calls.len(), 7);
        for pair in calls[..6].chunks(2) {
            assert_eq!(pair[0], Call::Add("f.txt".to_string()));
            assert!(matches!(pair[1], Call::Commit(_)));
        }
    }

    #[tokio::test]
    async fn test_fifteen_commit_variant() {
        let root = TempDir::new().unwrap();
        let config = seeded_config(&root).with_commit_count(15);
        let vcs = FakeVcs::new();

        let before = file_len(&config);
        BatchTask::new().run(&vcs, &config).await.unwrap();

        assert_eq!(file_len(&config) - before, 15);
        assert_eq!(vcs.commit_messages().len(), 15);
        assert_eq!(vcs.push_count(), 1);
    }

    #[tokio::test]
    async fn test_messages_carry_todays_date() {
        let root = TempDir::new().unwrap();
        let config = seeded_config(&root).with_commit_count(2);
        let vcs = FakeVcs::new();

        BatchTask::new().run(&vcs, &config).await.unwrap();

        let pattern = Regex::new(r"^Daily push \d{4}/\d{2}/\d{2} #(\d+)$").unwrap();
        let sequences: Vec<usize> = vcs
            .commit_messages()
            .iter()
            .map(|m| pattern.captures(m).unwrap()[1].parse::<usize>().unwrap())
            .collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_numbering_restarts_each_invocation() {
        let root = TempDir::new().unwrap();
        let config = seeded_config(&root).with_commit_count(3);
        let vcs = FakeVcs::new();
        let mut task = BatchTask::new();

        task.run_with_clock(&vcs, &config, fixed_day).await.unwrap();
        vcs.clear();
        task.run_with_clock(&vcs, &config, fixed_day).await.unwrap();

        assert_eq!(
            vcs.commit_messages(),
            vec![
                "Daily push 2024/03/05 #1",
                "Daily push 2024/03/05 #2",
                "Daily push 2024/03/05 #3",
            ]
        );
        assert_eq!(file_len(&config), 7);
    }

    #[tokio::test]
    async fn test_commit_failure_aborts_without_push() {
        let root = TempDir::new().unwrap();
        let config = seeded_config(&root);
        let vcs = FakeVcs::failing_on(FailOn::Commit(7));
        let mut task = BatchTask::new();

        let result = task.run_with_clock(&vcs, &config, fixed_day).await;

        assert!(matches!(result, Err(CommitterError::Vcs(_))));
        assert_eq!(vcs.commit_messages().len(), 6);
        assert_eq!(vcs.push_count(), 0);
        assert_eq!(task.counter().value(), 6);
        // the seventh character was appended before its commit failed
        assert_eq!(file_len(&config), 8);
    }

    #[tokio::test]
    async fn test_push_failure_keeps_local_commits() {
        let root = TempDir::new().unwrap();
        let config = seeded_config(&root);
        let vcs = FakeVcs::failing_on(FailOn::Push);
        let mut task = BatchTask::new();

        let result = task.run_with_clock(&vcs, &config, fixed_day).await;
        assert!(result.is_err());
        assert_eq!(vcs.commit_messages().len(), 10);
        assert_eq!(task.counter().value(), 10);

        vcs.fail_on(None);
        vcs.clear();
        task.run_with_clock(&vcs, &config, fixed_day).await.unwrap();

        assert_eq!(vcs.commit_messages()[0], "Daily push 2024/03/05 #1");
        assert_eq!(vcs.push_count(), 1);
        assert_eq!(task.counter().value(), 0);
        assert_eq!(file_len(&config), 21);
    }

    #[tokio::test]
    async fn test_huge_commit_count_runs_until_first_failure() {
        let root = TempDir::new().unwrap();
        let config = seeded_config(&root).with_commit_count(usize::MAX);
        assert!(config.validate().is_ok());
        let vcs = FakeVcs::failing_on(FailOn::Commit(2));
        let mut task = BatchTask::new();

        let result = task.run_with_clock(&vcs, &config, fixed_day).await;

        assert!(matches!(result, Err(CommitterError::Vcs(_))));
        assert_eq!(vcs.commit_messages(), vec!["Daily push 2024/03/05 #1"]);
        assert_eq!(task.counter().value(), 1);
        assert_eq!(vcs.push_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_tracked_file_is_not_created() {
        let root = TempDir::new().unwrap();
        let config = CommitterConfig::new("https://example.com/r.git")
            .with_repo_path(root.path())
            .with_file_name("missing.txt");
        let vcs = FakeVcs::new();

        let result = BatchTask::new().run(&vcs, &config).await;

        assert!(matches!(result, Err(CommitterError::Io { action: "open", .. })));
        assert!(!config.tracked_file_path().exists());
        assert!(vcs.calls().is_empty());
    }
}
