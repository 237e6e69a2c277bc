// English texts for sync steps and service notices.

use tidgit_common::protocol::step::SyncStep;
use tidgit_sync::service::{Notice, StepTranslator};

pub struct English;

impl StepTranslator for English {
    fn translate(&self, step: SyncStep) -> String {
        step_text(step).to_string()
    }

    fn notice(&self, notice: Notice) -> String {
        notice_text(notice).to_string()
    }
}

pub fn step_text(step: SyncStep) -> &'static str {
    match step {
        SyncStep::StartInitialization => "Initializing the local git repository",
        SyncStep::RepoConfigured => "Git repository configured",
        SyncStep::ConfiguringRemote => "Configuring the remote repository",
        SyncStep::StartBackupToGitRemote => "Backing up to the remote repository",
        SyncStep::PrepareCloneOnlineWiki => "Preparing to clone the online wiki",
        SyncStep::StartFetchingFromRemote => "Fetching the wiki from the remote repository",
        SyncStep::PrepareSync => "Preparing to synchronize",
        SyncStep::CheckingLocalGitRepoSanity => "Checking that the local repository is healthy",
        SyncStep::CantSyncInSpecialGitStateAutoFixSucceed => {
            "The repository was in an unfinished git operation; it has been repaired"
        }
        SyncStep::CantSyncInSpecialGitStateAutoFixFailed => {
            "The repository is in an unfinished git operation that could not be repaired"
        }
        SyncStep::PreparingUserInfo => "Preparing the author identity",
        SyncStep::HaveThingsToCommit => "There are local changes to commit",
        SyncStep::AddingFiles => "Staging changed files",
        SyncStep::AddComplete => "Changed files staged",
        SyncStep::CommitComplete => "Local changes committed",
        SyncStep::FetchingData => "Fetching from the remote repository",
        SyncStep::CheckingLocalSyncState => "Comparing local and remote history",
        SyncStep::NoNeedToSync => "Already up to date",
        SyncStep::LocalAheadStartUpload => "Local history is ahead, uploading",
        SyncStep::GitPushFailed => "Upload to the remote repository failed",
        SyncStep::LocalBehindPull => "Remote history is ahead, fast-forwarding",
        SyncStep::GitMergeFailed => "Fast-forward of the remote changes failed",
        SyncStep::LocalStateDivergeRebase => {
            "Local and remote histories diverged, rebasing local commits"
        }
        SyncStep::RebaseResultChecking => "Checking the rebase result",
        SyncStep::RebaseConflictNeedsResolve => {
            "The rebase hit conflicts; resolve them in a Git GUI and sync again"
        }
        SyncStep::RebaseSucceed => "Rebase finished",
        SyncStep::PerformLastCheckBeforeFinish => "Checking that local and remote match",
        SyncStep::SynchronizationFinish => "Synchronization finished",
        SyncStep::SyncFailedAlgorithmWrong => "Synchronization failed unexpectedly",
    }
}

pub fn notice_text(notice: Notice) -> &'static str {
    match notice {
        Notice::SyncFailedTitle => "Synchronization failed",
        Notice::TokenMissingTitle => "Access token problem",
        Notice::TokenExpiredOrWrong => {
            "The remote rejected the access token. It may have expired or be wrong"
        }
        Notice::OkButton => "OK",
        Notice::OpenGitGuiButton => "Open in Git GUI",
    }
}
