use clap::{Args, Parser, Subcommand};
use committer::config::{
    DEFAULT_BRANCH, DEFAULT_COMMIT_COUNT, DEFAULT_FILE_NAME, DEFAULT_REMOTE, DEFAULT_REPO_PATH,
    DEFAULT_SCHEDULE,
};
use committer::{prepare, BatchTask, CommitterConfig, CronSchedule, Scheduler};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vcs::{GitCli, Identity, IdentityScope, Vcs, WorkingCopyState};

#[derive(Parser)]
#[command(name = "autocommit")]
#[command(about = "Append to a tracked file, commit in batches and push")]
struct Cli {
    #[command(flatten)]
    settings: Settings,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the working copy and run a single batch
    Run,
    /// Prepare the working copy and run a batch on every schedule tick
    Schedule {
        /// Also run one batch right after startup
        #[arg(long)]
        run_now: bool,
    },
    /// Print the resolved configuration
    Config,
    /// Show the working copy's branch and push state
    Status,
}

/// Settings shared by every subcommand. Flags win over environment variables.
#[derive(Args, Debug)]
struct Settings {
    /// Remote repository to clone and push to
    #[arg(long, env = "REPO_URL", global = true)]
    repo_url: Option<String>,
    /// Location of the working copy
    #[arg(long, env = "REPO_PATH", default_value = DEFAULT_REPO_PATH, global = true)]
    repo_path: PathBuf,
    /// Branch to push
    #[arg(long, env = "BRANCH_NAME", default_value = DEFAULT_BRANCH, global = true)]
    branch: String,
    /// Remote to push to
    #[arg(long, env = "REMOTE_NAME", default_value = DEFAULT_REMOTE, global = true)]
    remote: String,
    /// File that receives one character per commit
    #[arg(long, env = "FILE_NAME", default_value = DEFAULT_FILE_NAME, global = true)]
    file_name: String,
    /// Commit author name
    #[arg(long, env = "GIT_USER_NAME", global = true)]
    user_name: Option<String>,
    /// Commit author email
    #[arg(long, env = "GIT_USER_EMAIL", global = true)]
    user_email: Option<String>,
    /// Configure the default identity even when no name or email is given
    #[arg(long, global = true)]
    configure_identity: bool,
    /// Where the identity is written: global or local
    #[arg(long, env = "GIT_CONFIG_SCOPE", default_value = "global", global = true)]
    config_scope: IdentityScope,
    /// Commits per batch
    #[arg(long = "count", env = "COMMIT_COUNT", default_value_t = DEFAULT_COMMIT_COUNT, global = true)]
    commit_count: usize,
    /// Cron expression for the schedule subcommand
    #[arg(long, env = "CRON_SCHEDULE", default_value = DEFAULT_SCHEDULE, global = true)]
    schedule: String,
    /// git executable
    #[arg(long, env = "GIT_BIN", default_value = "git", global = true)]
    git_bin: String,
}

impl Settings {
    fn to_config(&self) -> CommitterConfig {
        let mut config = CommitterConfig::new(self.repo_url.clone().unwrap_or_default())
            .with_repo_path(&self.repo_path)
            .with_branch(&self.branch)
            .with_remote(&self.remote)
            .with_file_name(&self.file_name)
            .with_identity_scope(self.config_scope)
            .with_commit_count(self.commit_count)
            .with_schedule(&self.schedule);

        if self.configure_identity || self.user_name.is_some() || self.user_email.is_some() {
            let defaults = Identity::default();
            config = config.with_identity(Identity::new(
                self.user_name.clone().unwrap_or(defaults.name),
                self.user_email.clone().unwrap_or(defaults.email),
            ));
        }

        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.settings.to_config();
    let git = GitCli::with_program(&cli.settings.git_bin);

    let result = match cli.command {
        Commands::Run => run_once(&git, &config).await,
        Commands::Schedule { run_now } => run_scheduled(git, config, run_now).await,
        Commands::Config => show_config(&config),
        Commands::Status => show_status(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_once(
    git: &GitCli,
    config: &CommitterConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    prepare(git, config).await?;

    let report = BatchTask::new().run(git, config).await?;
    info!(commits = report.commits(), "Batch pushed");
    Ok(())
}

async fn run_scheduled(
    git: GitCli,
    config: CommitterConfig,
    run_now: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schedule = CronSchedule::parse(&config.schedule)?;
    prepare(&git, &config).await?;

    let vcs: Arc<dyn Vcs> = Arc::new(git);
    let scheduler = Scheduler::new(schedule, vcs, Arc::new(config));

    if run_now {
        scheduler.trigger().await;
    }

    info!(
        schedule = %scheduler.schedule().expression(),
        "Batch scheduled, press Ctrl-C to stop"
    );
    let fired = scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl-C, stopping");
            }
        })
        .await?;
    info!(fired, "Scheduler stopped");
    Ok(())
}

fn show_config(config: &CommitterConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if let Err(e) = config.validate() {
        println!("\n✗ {}", e);
        return Err(e.into());
    }
    println!("\n✓ Configuration is valid");
    Ok(())
}

async fn show_status(config: &CommitterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = vcs::read_working_copy(&config.repo_path)?;
    let tracked_len = match tokio::fs::metadata(config.tracked_file_path()).await {
        Ok(meta) => Some(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    print!("{}", status_report(config, &state, tracked_len));
    Ok(())
}

fn status_report(
    config: &CommitterConfig,
    state: &WorkingCopyState,
    tracked_len: Option<u64>,
) -> String {
    let mut lines = vec![
        format!("Working copy: {}", config.repo_path.display()),
        format!("  Branch: {}", state.branch),
        format!(
            "  HEAD: {} {}",
            &state.head_sha[..7.min(state.head_sha.len())],
            state.head_title
        ),
    ];
    lines.push(match &state.upstream {
        Some(upstream) => format!(
            "  Upstream: {} (ahead {}, behind {})",
            upstream, state.ahead, state.behind
        ),
        None => "  Upstream: none".to_string(),
    });
    if state.has_unpushed_commits() {
        lines.push(format!(
            "  ✗ {} commit(s) not pushed to {}",
            state.ahead, config.remote
        ));
    } else if state.upstream.is_some() {
        lines.push("  ✓ Everything pushed".to_string());
    }
    lines.push(format!("  Commits: {}", state.total_commits));
    lines.push(match tracked_len {
        Some(len) => format!("  {}: {} characters", config.file_name, len),
        None => format!("  {}: not created yet", config.file_name),
    });

    let mut report = lines.join("\n");
    report.push('\n');
    report
}
