// Read-only repository queries used by the sync state machine.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tidgit_common::types::{RemoteDescriptor, DEFAULT_REMOTE};

use super::runner::{CommandExecutor, GitError, GitRunner};
use crate::error::SyncError;

/// An interrupted operation (or detached HEAD) that blocks a normal sync.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpecialState {
    Rebasing,
    Merging,
    CherryPicking,
    Reverting,
    Detached,
}

impl fmt::Display for SpecialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpecialState::Rebasing => "mid-rebase",
            SpecialState::Merging => "mid-merge",
            SpecialState::CherryPicking => "mid-cherry-pick",
            SpecialState::Reverting => "mid-revert",
            SpecialState::Detached => "on a detached HEAD",
        };
        f.write_str(label)
    }
}

/// Local branch position relative to its fetched tracking ref.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Clean,
    LocalAhead,
    LocalBehind,
    Diverged,
    /// The remote has no such branch yet (e.g. an empty bare repository).
    NoUpstream,
}

/// Whether `repo_path` is the top level of a git working tree.
///
/// A folder nested inside some other repository does not count.
pub async fn is_repository<E: CommandExecutor>(git: &GitRunner<E>) -> Result<bool, GitError> {
    if !tokio::fs::try_exists(git.repo_path()).await.unwrap_or(false) {
        return Ok(false);
    }
    let result = git.probe(&["rev-parse", "--show-toplevel"]).await?;
    if !result.success {
        return Ok(false);
    }
    let toplevel = PathBuf::from(result.stdout.trim());
    Ok(same_path(&toplevel, git.repo_path()).await)
}

async fn same_path(left: &Path, right: &Path) -> bool {
    match (tokio::fs::canonicalize(left).await, tokio::fs::canonicalize(right).await) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}

pub async fn special_state<E: CommandExecutor>(
    git: &GitRunner<E>,
) -> Result<Option<SpecialState>, GitError> {
    for dir in ["rebase-merge", "rebase-apply"] {
        if git_path_exists(git, dir).await? {
            return Ok(Some(SpecialState::Rebasing));
        }
    }
    for (head, state) in [
        ("MERGE_HEAD", SpecialState::Merging),
        ("CHERRY_PICK_HEAD", SpecialState::CherryPicking),
        ("REVERT_HEAD", SpecialState::Reverting),
    ] {
        if git.probe(&["rev-parse", "-q", "--verify", head]).await?.success {
            return Ok(Some(state));
        }
    }
    if !git.probe(&["symbolic-ref", "-q", "HEAD"]).await?.success {
        return Ok(Some(SpecialState::Detached));
    }
    Ok(None)
}

async fn git_path_exists<E: CommandExecutor>(
    git: &GitRunner<E>,
    name: &str,
) -> Result<bool, GitError> {
    let output = git.run(&["rev-parse", "--git-path", name]).await?;
    let path = PathBuf::from(output.stdout.trim());
    let path = if path.is_absolute() { path } else { git.repo_path().join(path) };
    Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
}

/// Checked-out branch name; `None` when HEAD is detached.
pub async fn current_branch<E: CommandExecutor>(
    git: &GitRunner<E>,
) -> Result<Option<String>, GitError> {
    let result = git.probe(&["symbolic-ref", "--short", "-q", "HEAD"]).await?;
    let branch = result.stdout.trim();
    Ok((result.success && !branch.is_empty()).then(|| branch.to_string()))
}

/// Resolve a ref to a commit id; `None` when it does not exist (unborn HEAD,
/// remote branch never fetched).
pub async fn resolve_commit<E: CommandExecutor>(
    git: &GitRunner<E>,
    refname: &str,
) -> Result<Option<String>, GitError> {
    let spec = format!("{refname}^{{commit}}");
    let result = git.probe(&["rev-parse", "-q", "--verify", spec.as_str()]).await?;
    let commit = result.stdout.trim();
    Ok((result.success && !commit.is_empty()).then(|| commit.to_string()))
}

pub async fn remote_url<E: CommandExecutor>(
    git: &GitRunner<E>,
    remote_name: &str,
) -> Result<Option<String>, GitError> {
    let result = git.probe(&["remote", "get-url", remote_name]).await?;
    let url = result.stdout.trim();
    Ok((result.success && !url.is_empty()).then(|| url.to_string()))
}

/// Remote name configured for `branch`, falling back to `origin`.
pub async fn remote_name_for<E: CommandExecutor>(
    git: &GitRunner<E>,
    branch: &str,
) -> Result<String, GitError> {
    let key = format!("branch.{branch}.remote");
    let result = git.probe(&["config", "--get", key.as_str()]).await?;
    let name = result.stdout.trim();
    Ok(if result.success && !name.is_empty() { name.to_string() } else { DEFAULT_REMOTE.to_string() })
}

/// Branch and remote this working copy synchronizes with.
pub async fn resolve_remote<E: CommandExecutor>(
    git: &GitRunner<E>,
    default_branch: &str,
) -> Result<RemoteDescriptor, SyncError> {
    let branch = current_branch(git).await?.unwrap_or_else(|| default_branch.to_string());
    let remote_name = remote_name_for(git, &branch).await?;
    let remote_url = remote_url(git, &remote_name)
        .await?
        .ok_or_else(|| SyncError::NoRemote { remote: remote_name.clone() })?;
    Ok(RemoteDescriptor { remote_name, remote_url, branch })
}

/// Compare local HEAD with the fetched tracking ref.
pub async fn sync_state<E: CommandExecutor>(
    git: &GitRunner<E>,
    remote: &RemoteDescriptor,
) -> Result<SyncState, SyncError> {
    let tracking = remote.tracking_ref();
    let local = resolve_commit(git, "HEAD").await?;
    let upstream = resolve_commit(git, &tracking).await?;

    match (local, upstream) {
        (None, None) => Ok(SyncState::Clean),
        (Some(_), None) => Ok(SyncState::NoUpstream),
        (None, Some(_)) => Ok(SyncState::LocalBehind),
        (Some(local), Some(upstream)) if local == upstream => Ok(SyncState::Clean),
        (Some(_), Some(_)) => {
            let range = format!("HEAD...{tracking}");
            let output = git.run(&["rev-list", "--left-right", "--count", range.as_str()]).await?;
            let (ahead, behind) = parse_left_right(&output.stdout).ok_or_else(|| {
                SyncError::AlgorithmWrong(format!(
                    "unexpected rev-list output: {:?}",
                    output.stdout.trim()
                ))
            })?;
            Ok(classify_counts(ahead, behind))
        }
    }
}

pub fn classify_counts(ahead: u32, behind: u32) -> SyncState {
    match (ahead, behind) {
        (0, 0) => SyncState::Clean,
        (_, 0) => SyncState::LocalAhead,
        (0, _) => SyncState::LocalBehind,
        _ => SyncState::Diverged,
    }
}

/// Parse `rev-list --left-right --count` output (`"<ahead>\t<behind>"`).
pub fn parse_left_right(stdout: &str) -> Option<(u32, u32)> {
    let mut parts = stdout.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((ahead, behind))
}

/// Paths with unresolved conflicts in the index.
pub async fn conflicted_files<E: CommandExecutor>(
    git: &GitRunner<E>,
) -> Result<Vec<String>, GitError> {
    let output = git.run(&["diff", "--name-only", "--diff-filter=U"]).await?;
    Ok(output.stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
}
