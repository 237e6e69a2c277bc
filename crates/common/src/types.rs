// Core domain types shared by the git worker, its supervisor and the CLI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default branch used when neither the repository nor the config names one.
pub const DEFAULT_BRANCH: &str = "main";
/// Default remote used when `branch.<name>.remote` is not configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// How a path differs from `HEAD`, as reported by `git status --porcelain`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Copied,
    Modified,
    Renamed,
    Deleted,
    Untracked,
}

impl ChangeType {
    /// Classify a porcelain status code (`??`, `M`, `AM`, `D`, ...).
    ///
    /// Only the first letter decides the class; the optional second letter is
    /// the worktree state and does not change it.
    pub fn from_status_code(code: &str) -> Option<Self> {
        if code == "??" {
            return Some(Self::Untracked);
        }
        match code.chars().next()? {
            'A' => Some(Self::Added),
            'C' => Some(Self::Copied),
            'M' => Some(Self::Modified),
            'R' => Some(Self::Renamed),
            'D' => Some(Self::Deleted),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Copied => "copied",
            Self::Modified => "modified",
            Self::Renamed => "renamed",
            Self::Deleted => "deleted",
            Self::Untracked => "untracked",
        }
    }

    /// Single-letter marker for compact listings.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Added => "A",
            Self::Copied => "C",
            Self::Modified => "M",
            Self::Renamed => "R",
            Self::Deleted => "D",
            Self::Untracked => "?",
        }
    }
}

/// One modified path in a working tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChangeRecord {
    pub change_type: ChangeType,
    /// Path relative to the repository root, exactly as git printed it.
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

/// Identity and credential used for a single git operation.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl UserInfo {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self { name: name.into(), email: email.into(), access_token: None }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|token| !token.trim().is_empty())
    }
}

// Tokens must never reach logs through `{:?}`.
impl std::fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserInfo")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The remote a workspace synchronizes with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteDescriptor {
    pub remote_name: String,
    pub remote_url: String,
    pub branch: String,
}

impl RemoteDescriptor {
    /// `refs/remotes/<remote>/<branch>`, the tracking ref updated by fetch.
    pub fn tracking_ref(&self) -> String {
        format!("refs/remotes/{}/{}", self.remote_name, self.branch)
    }

    /// Whether the remote talks HTTP(S) and therefore needs a token to push.
    pub fn is_http(&self) -> bool {
        let url = self.remote_url.to_ascii_lowercase();
        url.starts_with("https://") || url.starts_with("http://")
    }
}

/// A wiki the host application manages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Workspace {
    pub name: String,
    /// Root of the wiki, which is also the root of its git working tree.
    pub wiki_folder: PathBuf,
}

impl Workspace {
    pub fn new(name: impl Into<String>, wiki_folder: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), wiki_folder: wiki_folder.into() }
    }
}

/// Caller-supplied options for one commit-and-sync run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommitAndSyncConfig {
    /// Commit message; a timestamped one is generated when absent.
    pub commit_message: Option<String>,
    /// Paths (relative to the repository root) never staged by the run.
    pub files_to_ignore: Vec<String>,
    /// Remote to add when the repository has none under the resolved name.
    pub remote_url: Option<String>,
}
