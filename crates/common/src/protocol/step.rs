// Sync steps: the ordered stage tags emitted on a progress stream.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stage of an init, clone or commit-and-sync run.
///
/// Steps are emitted in the order a code path visits them. Only
/// `CheckingLocalSyncState` may repeat within one run, when the sync loop
/// re-evaluates after a rebase or a rejected push.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    // ── Init / clone ───────────────────────────────────────────────
    StartInitialization,
    RepoConfigured,
    ConfiguringRemote,
    StartBackupToGitRemote,
    PrepareCloneOnlineWiki,
    StartFetchingFromRemote,

    // ── Preflight ──────────────────────────────────────────────────
    PrepareSync,
    CheckingLocalGitRepoSanity,
    CantSyncInSpecialGitStateAutoFixSucceed,
    CantSyncInSpecialGitStateAutoFixFailed,
    PreparingUserInfo,

    // ── Local commit ───────────────────────────────────────────────
    HaveThingsToCommit,
    AddingFiles,
    AddComplete,
    CommitComplete,

    // ── Convergence ────────────────────────────────────────────────
    FetchingData,
    CheckingLocalSyncState,
    NoNeedToSync,
    LocalAheadStartUpload,
    GitPushFailed,
    LocalBehindPull,
    GitMergeFailed,
    LocalStateDivergeRebase,
    RebaseResultChecking,
    RebaseConflictNeedsResolve,
    RebaseSucceed,
    PerformLastCheckBeforeFinish,
    SynchronizationFinish,
    SyncFailedAlgorithmWrong,
}

impl SyncStep {
    pub const ALL: &'static [SyncStep] = &[
        SyncStep::StartInitialization,
        SyncStep::RepoConfigured,
        SyncStep::ConfiguringRemote,
        SyncStep::StartBackupToGitRemote,
        SyncStep::PrepareCloneOnlineWiki,
        SyncStep::StartFetchingFromRemote,
        SyncStep::PrepareSync,
        SyncStep::CheckingLocalGitRepoSanity,
        SyncStep::CantSyncInSpecialGitStateAutoFixSucceed,
        SyncStep::CantSyncInSpecialGitStateAutoFixFailed,
        SyncStep::PreparingUserInfo,
        SyncStep::HaveThingsToCommit,
        SyncStep::AddingFiles,
        SyncStep::AddComplete,
        SyncStep::CommitComplete,
        SyncStep::FetchingData,
        SyncStep::CheckingLocalSyncState,
        SyncStep::NoNeedToSync,
        SyncStep::LocalAheadStartUpload,
        SyncStep::GitPushFailed,
        SyncStep::LocalBehindPull,
        SyncStep::GitMergeFailed,
        SyncStep::LocalStateDivergeRebase,
        SyncStep::RebaseResultChecking,
        SyncStep::RebaseConflictNeedsResolve,
        SyncStep::RebaseSucceed,
        SyncStep::PerformLastCheckBeforeFinish,
        SyncStep::SynchronizationFinish,
        SyncStep::SyncFailedAlgorithmWrong,
    ];

    /// Stable wire name, identical to the serde representation.
    pub fn code(self) -> &'static str {
        match self {
            SyncStep::StartInitialization => "start_initialization",
            SyncStep::RepoConfigured => "repo_configured",
            SyncStep::ConfiguringRemote => "configuring_remote",
            SyncStep::StartBackupToGitRemote => "start_backup_to_git_remote",
            SyncStep::PrepareCloneOnlineWiki => "prepare_clone_online_wiki",
            SyncStep::StartFetchingFromRemote => "start_fetching_from_remote",
            SyncStep::PrepareSync => "prepare_sync",
            SyncStep::CheckingLocalGitRepoSanity => "checking_local_git_repo_sanity",
            SyncStep::CantSyncInSpecialGitStateAutoFixSucceed => {
                "cant_sync_in_special_git_state_auto_fix_succeed"
            }
            SyncStep::CantSyncInSpecialGitStateAutoFixFailed => {
                "cant_sync_in_special_git_state_auto_fix_failed"
            }
            SyncStep::PreparingUserInfo => "preparing_user_info",
            SyncStep::HaveThingsToCommit => "have_things_to_commit",
            SyncStep::AddingFiles => "adding_files",
            SyncStep::AddComplete => "add_complete",
            SyncStep::CommitComplete => "commit_complete",
            SyncStep::FetchingData => "fetching_data",
            SyncStep::CheckingLocalSyncState => "checking_local_sync_state",
            SyncStep::NoNeedToSync => "no_need_to_sync",
            SyncStep::LocalAheadStartUpload => "local_ahead_start_upload",
            SyncStep::GitPushFailed => "git_push_failed",
            SyncStep::LocalBehindPull => "local_behind_pull",
            SyncStep::GitMergeFailed => "git_merge_failed",
            SyncStep::LocalStateDivergeRebase => "local_state_diverge_rebase",
            SyncStep::RebaseResultChecking => "rebase_result_checking",
            SyncStep::RebaseConflictNeedsResolve => "rebase_conflict_needs_resolve",
            SyncStep::RebaseSucceed => "rebase_succeed",
            SyncStep::PerformLastCheckBeforeFinish => "perform_last_check_before_finish",
            SyncStep::SynchronizationFinish => "synchronization_finish",
            SyncStep::SyncFailedAlgorithmWrong => "sync_failed_algorithm_wrong",
        }
    }

    /// Steps whose presence means local content changed during the run:
    /// a commit, a push, a fast-forward or a completed rebase.
    pub fn moves_content(self) -> bool {
        matches!(
            self,
            SyncStep::CommitComplete
                | SyncStep::LocalAheadStartUpload
                | SyncStep::LocalBehindPull
                | SyncStep::RebaseSucceed
        )
    }

    /// Steps that only ever accompany a failed run.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            SyncStep::CantSyncInSpecialGitStateAutoFixFailed
                | SyncStep::GitPushFailed
                | SyncStep::GitMergeFailed
                | SyncStep::RebaseConflictNeedsResolve
                | SyncStep::SyncFailedAlgorithmWrong
        )
    }

    /// Steps that end a successful run.
    pub fn is_success_terminal(self) -> bool {
        matches!(self, SyncStep::NoNeedToSync | SyncStep::SynchronizationFinish)
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sync step: {0}")]
pub struct UnknownStep(pub String);

impl FromStr for SyncStep {
    type Err = UnknownStep;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SyncStep::ALL
            .iter()
            .copied()
            .find(|step| step.code() == value)
            .ok_or_else(|| UnknownStep(value.to_string()))
    }
}
