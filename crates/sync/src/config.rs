// Local configuration file for tidgit.
//
// Global config: `~/.tidgit/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tidgit_common::types::{UserInfo, DEFAULT_BRANCH, DEFAULT_REMOTE};
use tracing::warn;

use crate::git::sync::{SyncOptions, DEFAULT_MAX_SYNC_ATTEMPTS};

/// Root directory for tidgit global state: `~/.tidgit/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".tidgit"))
}

/// Path to the global config file: `~/.tidgit/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

const STARTUP_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=600;
const MAX_SYNC_ATTEMPTS_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
const PROBE_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 100..=60_000;

// ── Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub git: GitConfig,
    pub user: UserConfig,
    pub worker: WorkerConfig,
    pub sync: SyncConfig,
}

impl Config {
    /// Load from `~/.tidgit/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.sanitize();
        Ok(config)
    }

    /// Save to `~/.tidgit/config.toml`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = global_config_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let mut config = self.clone();
        config.sanitize();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(&config)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Replace empty or out-of-range values with their defaults.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        if self.git.default_branch.trim().is_empty() {
            warn!("config git.default_branch is empty, using default");
            self.git.default_branch = defaults.git.default_branch;
        }
        if self.git.default_remote.trim().is_empty() {
            warn!("config git.default_remote is empty, using default");
            self.git.default_remote = defaults.git.default_remote;
        }
        if !STARTUP_TIMEOUT_RANGE.contains(&self.worker.startup_timeout_secs) {
            warn!(
                value = self.worker.startup_timeout_secs,
                "config worker.startup_timeout_secs out of range, using default"
            );
            self.worker.startup_timeout_secs = defaults.worker.startup_timeout_secs;
        }
        if !MAX_SYNC_ATTEMPTS_RANGE.contains(&self.sync.max_sync_attempts) {
            warn!(
                value = self.sync.max_sync_attempts,
                "config sync.max_sync_attempts out of range, using default"
            );
            self.sync.max_sync_attempts = defaults.sync.max_sync_attempts;
        }
        if self.sync.probe_address.trim().is_empty() {
            warn!("config sync.probe_address is empty, using default");
            self.sync.probe_address = defaults.sync.probe_address;
        }
        if !PROBE_TIMEOUT_RANGE.contains(&self.sync.probe_timeout_ms) {
            warn!(
                value = self.sync.probe_timeout_ms,
                "config sync.probe_timeout_ms out of range, using default"
            );
            self.sync.probe_timeout_ms = defaults.sync.probe_timeout_ms;
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            default_branch: self.git.default_branch.clone(),
            default_remote: self.git.default_remote.clone(),
            max_sync_attempts: self.sync.max_sync_attempts,
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.worker.startup_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.sync.probe_timeout_ms)
    }
}

/// Repository defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitConfig {
    /// Branch for new repositories and detached-HEAD recovery (defaults to `"main"`).
    pub default_branch: String,
    /// Remote name for init and clone (defaults to `"origin"`).
    pub default_remote: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self { default_branch: DEFAULT_BRANCH.into(), default_remote: DEFAULT_REMOTE.into() }
    }
}

/// Commit author used when the caller supplies no identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UserConfig {
    pub name: String,
    pub email: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self { name: "tidgit".into(), email: "tidgit@localhost".into() }
    }
}

impl UserConfig {
    /// Tokens are never read from the config file; the caller attaches one.
    pub fn to_user_info(&self) -> UserInfo {
        UserInfo::new(self.name.clone(), self.email.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// How long to wait for the git worker's ready handshake.
    pub startup_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { startup_timeout_secs: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub max_sync_attempts: u32,
    /// `host:port` dialed to decide whether the machine is online.
    pub probe_address: String,
    pub probe_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_sync_attempts: DEFAULT_MAX_SYNC_ATTEMPTS,
            probe_address: "github.com:443".into(),
            probe_timeout_ms: 3_000,
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
