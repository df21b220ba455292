//! Startup steps that run before any batch
//!
//! ```text
//! START → INIT_REPO → [CONFIGURE_IDENTITY] → SEED_COMMIT → READY
//! ```
//!
//! Each step is idempotent across process restarts: an existing working copy
//! is never re-cloned and an existing tracked file is never re-seeded.

use crate::config::{CommitterConfig, FILL_CHAR};
use crate::error::{CommitterError, CommitterResult};
use std::path::Path;
use tracing::info;
use vcs::Vcs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Cloned,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyPresent,
}

/// What the startup sequence did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    pub init: InitOutcome,
    pub identity_configured: bool,
    pub seed: SeedOutcome,
}

/// Clone the remote into the working-copy path unless the path already exists
pub async fn initialize_repo(
    vcs: &dyn Vcs,
    config: &CommitterConfig,
) -> CommitterResult<InitOutcome> {
    if exists(&config.repo_path).await? {
        info!(path = %config.repo_path.display(), "Repository already cloned");
        return Ok(InitOutcome::AlreadyPresent);
    }

    info!(
        tool = vcs.tool_name(),
        url = %config.repo_url,
        path = %config.repo_path.display(),
        "Cloning repository"
    );
    vcs.clone_repo(&config.repo_url, &config.repo_path).await?;
    Ok(InitOutcome::Cloned)
}

/// Write the commit identity, if one is configured. Returns whether it ran.
pub async fn configure_identity(vcs: &dyn Vcs, config: &CommitterConfig) -> CommitterResult<bool> {
    let Some(identity) = &config.identity else {
        return Ok(false);
    };

    info!(
        tool = vcs.tool_name(),
        name = %identity.name,
        email = %identity.email,
        scope = %config.identity_scope,
        "Configuring commit identity"
    );
    vcs.set_identity(identity, config.identity_scope, &config.repo_path)
        .await?;
    Ok(true)
}

/// Create, commit and push the tracked file if it does not exist yet
pub async fn seed_commit(vcs: &dyn Vcs, config: &CommitterConfig) -> CommitterResult<SeedOutcome> {
    let path = config.tracked_file_path();
    if exists(&path).await? {
        info!(file = %config.file_name, "Initial commit already done");
        return Ok(SeedOutcome::AlreadyPresent);
    }

    info!(file = %config.file_name, "Creating initial file");
    if let Some(dir) = Path::new(&config.file_name)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        let dir = config.repo_path.join(dir);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(CommitterError::io("create", &dir))?;
    }
    tokio::fs::write(&path, FILL_CHAR.to_string())
        .await
        .map_err(CommitterError::io("write", &path))?;

    info!("Staging and committing initial file");
    vcs.add(&config.repo_path, &config.file_name).await?;
    vcs.commit(&config.repo_path, &seed_message(&config.file_name))
        .await?;
    vcs.push(&config.repo_path, &config.remote, &config.branch)
        .await?;
    Ok(SeedOutcome::Created)
}

pub fn seed_message(file_name: &str) -> String {
    format!("Initial commit with {}", file_name)
}

/// Validate the configuration, then run every startup step in order,
/// stopping at the first failure
pub async fn prepare(vcs: &dyn Vcs, config: &CommitterConfig) -> CommitterResult<StartupReport> {
    config.validate()?;
    let init = initialize_repo(vcs, config).await?;
    let identity_configured = configure_identity(vcs, config).await?;
    let seed = seed_commit(vcs, config).await?;
    Ok(StartupReport {
        init,
        identity_configured,
        seed,
    })
}

async fn exists(path: &Path) -> CommitterResult<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(CommitterError::io("inspect", path))
}
