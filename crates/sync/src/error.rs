// Failure taxonomy of the git synchronization core.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tidgit_common::protocol::message::{ErrorKind, WireError};

use crate::git::repo::SpecialState;
use crate::git::runner::GitError;

#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("host is offline")]
    Offline,

    #[error("{} is not a git repository", path.display())]
    NotInitialized { path: PathBuf },

    #[error("required parameter `{0}` is missing")]
    MissingParameter(&'static str),

    #[error("no remote named `{remote}` is configured")]
    NoRemote { remote: String },

    #[error("clone destination {} already exists and is not empty", path.display())]
    DestinationNotEmpty { path: PathBuf },

    #[error("fetch failed: {0}")]
    Fetch(GitError),

    #[error("push failed: {0}")]
    Push(GitError),

    #[error("clone failed: {0}")]
    Clone(GitError),

    #[error("fast-forward merge failed: {0}")]
    Merge(GitError),

    #[error("rebase stopped on conflicts in {}: {detail}", files.join(", "))]
    RebaseConflict { files: Vec<String>, detail: String },

    #[error("repository is {state} and automatic recovery failed: {detail}")]
    SpecialStateAutoFixFailed { state: SpecialState, detail: String },

    #[error("another git process is using the repository, retry later: {0}")]
    LockContention(GitError),

    #[error("sync did not converge after {attempts} attempts")]
    RetryLimitExceeded { attempts: u32 },

    #[error("sync state machine reached an impossible state: {0}")]
    AlgorithmWrong(String),

    #[error("{}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error(transparent)]
    Git(GitError),
}

impl SyncError {
    /// Wrap a git failure with a context variant, unless it is lock contention.
    pub fn classify(error: GitError, wrap: fn(GitError) -> SyncError) -> Self {
        if error.is_lock_contention() {
            SyncError::LockContention(error)
        } else {
            wrap(error)
        }
    }

    pub(crate) fn io(path: &Path, error: std::io::Error) -> Self {
        SyncError::Io { path: path.to_path_buf(), message: error.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotInitialized { .. }
            | SyncError::MissingParameter(_)
            | SyncError::NoRemote { .. }
            | SyncError::DestinationNotEmpty { .. } => ErrorKind::Configuration,
            SyncError::Offline | SyncError::Fetch(_) | SyncError::Push(_) | SyncError::Clone(_) => {
                ErrorKind::Network
            }
            SyncError::Merge(_) => ErrorKind::Merge,
            SyncError::RebaseConflict { .. } => ErrorKind::Conflict,
            SyncError::SpecialStateAutoFixFailed { .. } => ErrorKind::SpecialState,
            SyncError::LockContention(_) => ErrorKind::Contention,
            SyncError::RetryLimitExceeded { .. } | SyncError::AlgorithmWrong(_) => {
                ErrorKind::AlgorithmWrong
            }
            SyncError::Io { .. } | SyncError::Git(_) => ErrorKind::Internal,
        }
    }

    /// Only lock contention is worth an immediate retry by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::LockContention(_))
    }

    pub fn to_wire(&self) -> WireError {
        WireError::new(self.kind(), self.to_string())
    }
}

impl From<GitError> for SyncError {
    fn from(error: GitError) -> Self {
        SyncError::classify(error, SyncError::Git)
    }
}
