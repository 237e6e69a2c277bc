// Consistent exit codes for the tidgit CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   10 = git worker could not start
//   11 = authentication error (missing or rejected token)
//   12 = rebase conflict needs manual resolution
//   13 = network error or offline
//   14 = another git process holds the repository lock
//   15 = interrupted rebase/merge that could not be repaired

use std::process;

use tidgit_common::protocol::message::{ErrorKind, WireError};
use tidgit_sync::worker::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    WorkerDown = 10,
    Auth = 11,
    Conflict = 12,
    Network = 13,
    Contention = 14,
    SpecialState = 15,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(wire) = cause.downcast_ref::<WireError>() {
                return Self::from_wire(wire);
            }
            if let Some(worker) = cause.downcast_ref::<WorkerError>() {
                return match worker {
                    WorkerError::Sync(_) => Self::from_wire(&worker.to_wire()),
                    _ => Self::WorkerDown,
                };
            }
        }
        Self::Error
    }

    /// Map a failure that crossed the worker boundary to an exit code.
    pub fn from_wire(error: &WireError) -> Self {
        if is_auth_failure(error) {
            return Self::Auth;
        }
        match error.kind {
            ErrorKind::Conflict => Self::Conflict,
            ErrorKind::Network => Self::Network,
            ErrorKind::Contention => Self::Contention,
            ErrorKind::SpecialState => Self::SpecialState,
            ErrorKind::Configuration => Self::Usage,
            ErrorKind::Merge | ErrorKind::AlgorithmWrong | ErrorKind::Internal => Self::Error,
        }
    }
}

fn is_auth_failure(error: &WireError) -> bool {
    let message = error.message.as_str();
    message.contains("`access_token`")
        || (error.kind == ErrorKind::Network
            && (message.contains(" 401") || message.contains(" 403")))
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
