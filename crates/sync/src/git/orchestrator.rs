// Commit-and-sync, init and clone: the three long-running operations the
// worker exposes. Each reports through a `ProgressEmitter`; the worker sends
// the terminal signal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, SecondsFormat};
use tidgit_common::protocol::step::SyncStep;
use tidgit_common::types::{CommitAndSyncConfig, UserInfo};
use tracing::info;

use super::repo;
use super::runner::{CommandExecutor, GitRunner, ProcessCommandExecutor};
use super::sync::{SyncMachine, SyncOptions};
use crate::connectivity::{self, Connectivity};
use crate::error::SyncError;
use crate::progress::ProgressEmitter;

const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";

/// Shared dependencies of every operation run by one worker.
pub struct SyncContext<E = ProcessCommandExecutor> {
    pub executor: Arc<E>,
    pub connectivity: Arc<dyn Connectivity>,
    pub options: SyncOptions,
}

impl<E> Clone for SyncContext<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            connectivity: Arc::clone(&self.connectivity),
            options: self.options.clone(),
        }
    }
}

impl<E: CommandExecutor> SyncContext<E> {
    pub fn new(executor: Arc<E>, connectivity: Arc<dyn Connectivity>, options: SyncOptions) -> Self {
        Self { executor, connectivity, options }
    }

    pub fn runner(&self, path: &Path) -> GitRunner<E> {
        GitRunner::with_executor(path, Arc::clone(&self.executor))
    }

    /// Sample connectivity once; operations pass the answer down instead of
    /// asking again mid-run.
    pub async fn check_online(&self) -> bool {
        connectivity::check(&self.connectivity).await
    }
}

/// `"Wiki updated at <RFC 3339 local time>"`.
pub fn default_commit_message() -> String {
    format!("Wiki updated at {}", Local::now().to_rfc3339_opts(SecondsFormat::Secs, false))
}

// ── Commit and sync ────────────────────────────────────────────────

/// Commit local edits and converge with the remote.
///
/// Returns whether any content moved (commit, upload, pull or rebase).
/// Offline is not an error: nothing runs and `false` is returned.
pub async fn commit_and_sync<E: CommandExecutor>(
    ctx: &SyncContext<E>,
    repo_path: &Path,
    config: &CommitAndSyncConfig,
    user: &UserInfo,
    emitter: &mut ProgressEmitter,
) -> Result<bool, SyncError> {
    if !ctx.check_online().await {
        info!(repo = %repo_path.display(), "offline, skipping commit and sync");
        return Ok(false);
    }
    sync_online(ctx, repo_path, config, user, emitter).await
}

/// Commit-and-sync body, run once the caller has seen the host online.
async fn sync_online<E: CommandExecutor>(
    ctx: &SyncContext<E>,
    repo_path: &Path,
    config: &CommitAndSyncConfig,
    user: &UserInfo,
    emitter: &mut ProgressEmitter,
) -> Result<bool, SyncError> {
    emitter.step(SyncStep::PrepareSync).await;
    let git = ctx.runner(repo_path);
    let mut machine = SyncMachine::new(&git, user, emitter, &ctx.options, true);
    machine.preflight().await?;
    let remote = machine.prepare_remote(config.remote_url.as_deref()).await?;

    let pending = pending_changes(machine.git(), &config.files_to_ignore).await?;
    if !pending.is_empty() {
        let git = machine.git().clone();
        commit_changes(&git, machine.emitter(), pending.len(), config).await?;
    }

    machine.converge(&remote).await?;
    Ok(emitter.has_changes())
}

/// Raw porcelain lines outside `files_to_ignore`. Any line counts, including
/// renames and quoted paths the inspector does not turn into records.
async fn pending_changes<E: CommandExecutor>(
    git: &GitRunner<E>,
    files_to_ignore: &[String],
) -> Result<Vec<String>, SyncError> {
    let mut args: Vec<String> = ["status", "--porcelain", "--", "."].map(String::from).to_vec();
    args.extend(exclude_pathspecs(files_to_ignore));
    let output = git.run(&args).await?;
    Ok(output.stdout.lines().filter(|line| !line.trim().is_empty()).map(str::to_string).collect())
}

async fn commit_changes<E: CommandExecutor>(
    git: &GitRunner<E>,
    emitter: &mut ProgressEmitter,
    pending: usize,
    config: &CommitAndSyncConfig,
) -> Result<(), SyncError> {
    emitter.step(SyncStep::HaveThingsToCommit).await;
    emitter.info(format!("{pending} changed file(s) to commit")).await;

    emitter.step(SyncStep::AddingFiles).await;
    git.run(&add_args(&config.files_to_ignore)).await?;
    emitter.step(SyncStep::AddComplete).await;

    // Everything left may be an empty directory.
    if git.probe(&["diff", "--cached", "--quiet"]).await?.success {
        info!(repo = %git.repo_path().display(), "nothing staged after add, skipping commit");
        return Ok(());
    }

    let message = config
        .commit_message
        .as_deref()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_commit_message);
    git.run(&["commit", "-m", message.as_str()]).await?;
    info!(repo = %git.repo_path().display(), files = pending, "committed local changes");
    emitter.step(SyncStep::CommitComplete).await;
    Ok(())
}

fn add_args(files_to_ignore: &[String]) -> Vec<String> {
    let mut args: Vec<String> = ["add", "-A", "--", "."].map(String::from).to_vec();
    args.extend(exclude_pathspecs(files_to_ignore));
    args
}

fn exclude_pathspecs(files_to_ignore: &[String]) -> impl Iterator<Item = String> + '_ {
    files_to_ignore
        .iter()
        .map(|path| path.trim().trim_end_matches('/'))
        .filter(|path| !path.is_empty())
        .map(|path| format!(":(exclude){path}"))
}

// ── Init ───────────────────────────────────────────────────────────

/// Make `repo_path` a repository (with an empty first commit), optionally
/// configure a remote, and optionally back it up right away.
pub async fn init_wiki_git<E: CommandExecutor>(
    ctx: &SyncContext<E>,
    repo_path: &Path,
    remote_url: Option<&str>,
    user: &UserInfo,
    sync_immediately: bool,
    emitter: &mut ProgressEmitter,
) -> Result<(), SyncError> {
    let back_up = sync_immediately && ctx.check_online().await;
    emitter.step(SyncStep::StartInitialization).await;
    tokio::fs::create_dir_all(repo_path).await.map_err(|error| SyncError::io(repo_path, error))?;
    let git = ctx.runner(repo_path).with_identity(user);

    if repo::is_repository(&git).await? {
        info!(repo = %repo_path.display(), "already a repository, keeping history");
    } else {
        git.run(&["init", "-b", ctx.options.default_branch.as_str()]).await?;
        git.run(&["commit", "--allow-empty", "-m", INITIAL_COMMIT_MESSAGE]).await?;
        let branch = ctx.options.default_branch.as_str();
        info!(repo = %repo_path.display(), branch, "initialized repository");
    }
    emitter.step(SyncStep::RepoConfigured).await;

    let remote_url = remote_url.map(str::trim).filter(|url| !url.is_empty());
    if let Some(url) = remote_url {
        emitter.step(SyncStep::ConfiguringRemote).await;
        let name = ctx.options.default_remote.as_str();
        let verb = if repo::remote_url(&git, name).await?.is_some() { "set-url" } else { "add" };
        git.run(&["remote", verb, name, url]).await?;
        info!(repo = %repo_path.display(), remote = name, "configured remote");
    }

    if back_up {
        emitter.step(SyncStep::StartBackupToGitRemote).await;
        let config = CommitAndSyncConfig {
            remote_url: remote_url.map(str::to_string),
            ..CommitAndSyncConfig::default()
        };
        sync_online(ctx, repo_path, &config, user, emitter).await?;
    }
    Ok(())
}

// ── Clone ──────────────────────────────────────────────────────────

/// Clone `remote_url` into `destination`. Offline is a no-op.
pub async fn clone<E: CommandExecutor>(
    ctx: &SyncContext<E>,
    remote_url: &str,
    destination: &Path,
    user: &UserInfo,
    emitter: &mut ProgressEmitter,
) -> Result<(), SyncError> {
    if !ctx.check_online().await {
        info!(destination = %destination.display(), "offline, skipping clone");
        return Ok(());
    }
    emitter.step(SyncStep::PrepareCloneOnlineWiki).await;

    if !is_empty_or_missing(destination).await? {
        return Err(SyncError::DestinationNotEmpty { path: destination.to_path_buf() });
    }
    let parent = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tokio::fs::create_dir_all(&parent).await.map_err(|error| SyncError::io(&parent, error))?;

    emitter.step(SyncStep::StartFetchingFromRemote).await;
    let target = destination.to_string_lossy().into_owned();
    let remote_name = ctx.options.default_remote.as_str();
    ctx.runner(&parent)
        .with_identity(user)
        .run(&["clone", "--origin", remote_name, remote_url, target.as_str()])
        .await
        .map_err(|error| SyncError::classify(error, SyncError::Clone))?;
    info!(destination = %destination.display(), "cloned wiki");
    Ok(())
}

async fn is_empty_or_missing(path: &Path) -> Result<bool, SyncError> {
    match tokio::fs::read_dir(path).await {
        Ok(mut entries) => Ok(entries
            .next_entry()
            .await
            .map_err(|error| SyncError::io(path, error))?
            .is_none()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(error) => Err(SyncError::io(path, error)),
    }
}
