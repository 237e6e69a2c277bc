// Progress/log messages and terminal signals carried by a progress stream.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::step::SyncStep;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Failure taxonomy shared by the worker and whoever renders its errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing token, repository not initialized, no remote, bad destination.
    Configuration,
    /// Offline, or fetch/push/clone failed for a non-conflict reason.
    Network,
    /// Rebase stopped on conflicting hunks; a human has to resolve them.
    Conflict,
    /// Fast-forward merge refused.
    Merge,
    /// Interrupted rebase/merge or detached HEAD that could not be repaired.
    SpecialState,
    /// Another git process holds the index lock; retrying may succeed.
    Contention,
    /// The sync state machine reached a state it should never reach.
    AlgorithmWrong,
    /// Subprocess spawn failures and worker plumbing errors.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Network => "network",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Merge => "merge",
            ErrorKind::SpecialState => "special_state",
            ErrorKind::Contention => "contention",
            ErrorKind::AlgorithmWrong => "algorithm_wrong",
            ErrorKind::Internal => "internal",
        }
    }
}

/// An error as it crosses the worker boundary: taxonomy tag plus the raw text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireError {
    pub kind: ErrorKind,
    pub message: String,
}

impl WireError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for WireError {}

/// One entry on a progress stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    /// Free text, or the step code when the message announces a step.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<SyncStep>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl LogMessage {
    pub fn text(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), step: None, meta: BTreeMap::new(), error: None }
    }

    pub fn for_step(level: LogLevel, step: SyncStep) -> Self {
        Self {
            level,
            message: step.code().to_string(),
            step: Some(step),
            meta: BTreeMap::new(),
            error: None,
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: WireError) -> Self {
        self.error = Some(error);
        self
    }
}

/// What a progress stream yields: any number of `Next`, then one terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "signal", content = "payload", rename_all = "snake_case")]
pub enum Signal {
    Next(LogMessage),
    Error(WireError),
    Complete,
}

impl Signal {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Signal::Next(_))
    }
}
