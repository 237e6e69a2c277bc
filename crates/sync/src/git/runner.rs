// Git subprocess seam. Every git invocation in the crate goes through a
// `CommandExecutor`, so the state machine can be driven by a scripted mock.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;
use tidgit_common::types::UserInfo;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitError {
    #[error("failed to run `{command}`: {message}")]
    SpawnFailed { command: String, message: String },
    #[error("`{command}` failed with code {code:?}: {}", stderr.trim())]
    CommandFailed { command: String, code: Option<i32>, stderr: String },
}

impl GitError {
    /// The subprocess output that explains the failure, verbatim.
    pub fn stderr(&self) -> &str {
        match self {
            GitError::SpawnFailed { message, .. } => message,
            GitError::CommandFailed { stderr, .. } => stderr,
        }
    }

    /// Another git process holds `index.lock` (or a ref lock) in this repository.
    pub fn is_lock_contention(&self) -> bool {
        let stderr = self.stderr();
        stderr.contains("index.lock")
            || (stderr.contains("Unable to create") && stderr.contains(".lock"))
            || stderr.contains("cannot lock ref")
    }

    /// The remote refused a push because it has commits we do not.
    pub fn is_non_fast_forward(&self) -> bool {
        let stderr = self.stderr();
        stderr.contains("non-fast-forward")
            || stderr.contains("fetch first")
            || stderr.contains("Updates were rejected")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub type ExecuteFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CommandResult, std::io::Error>> + Send + 'a>>;

pub trait CommandExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
        cwd: &'a Path,
        envs: &'a [(String, String)],
    ) -> ExecuteFuture<'a>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
        cwd: &'a Path,
        envs: &'a [(String, String)],
    ) -> ExecuteFuture<'a> {
        Box::pin(async move {
            let output = tokio::process::Command::new(program)
                .args(args)
                .current_dir(cwd)
                .envs(envs.iter().map(|(key, value)| (key.as_str(), value.as_str())))
                .stdin(Stdio::null())
                .output()
                .await?;
            Ok(CommandResult {
                success: output.status.success(),
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

/// Runs git in one directory with a fixed per-invocation environment.
///
/// Identity and credentials are passed through `GIT_CONFIG_COUNT`-style
/// variables, so nothing is written to `.git/config`.
pub struct GitRunner<E = ProcessCommandExecutor> {
    repo_path: PathBuf,
    executor: Arc<E>,
    envs: Vec<(String, String)>,
}

impl<E> Clone for GitRunner<E> {
    fn clone(&self) -> Self {
        Self {
            repo_path: self.repo_path.clone(),
            executor: Arc::clone(&self.executor),
            envs: self.envs.clone(),
        }
    }
}

impl GitRunner<ProcessCommandExecutor> {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self::with_executor(repo_path, Arc::new(ProcessCommandExecutor))
    }
}

impl<E: CommandExecutor> GitRunner<E> {
    pub fn with_executor(repo_path: impl Into<PathBuf>, executor: Arc<E>) -> Self {
        Self { repo_path: repo_path.into(), executor, envs: base_env() }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Same executor and environment, different working directory.
    pub fn at(&self, path: impl Into<PathBuf>) -> Self {
        Self { repo_path: path.into(), ..self.clone() }
    }

    /// Commit author and, when a token is present, an HTTP basic auth header.
    pub fn with_identity(&self, user: &UserInfo) -> Self {
        let mut entries = vec![
            ("user.name".to_string(), user.name.clone()),
            ("user.email".to_string(), user.email.clone()),
        ];
        if let Some(token) = user.access_token.as_deref().filter(|token| !token.trim().is_empty()) {
            let credential = BASE64.encode(format!("{}:{}", user.name, token.trim()));
            entries
                .push(("http.extraHeader".to_string(), format!("Authorization: Basic {credential}")));
        }

        let mut envs = base_env();
        envs.push(("GIT_CONFIG_COUNT".to_string(), entries.len().to_string()));
        for (index, (key, value)) in entries.into_iter().enumerate() {
            envs.push((format!("GIT_CONFIG_KEY_{index}"), key));
            envs.push((format!("GIT_CONFIG_VALUE_{index}"), value));
        }
        Self { envs, ..self.clone() }
    }

    /// Run git and turn a non-zero exit into `GitError::CommandFailed`.
    pub async fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<GitCommandOutput, GitError> {
        let (command, result) = self.invoke(args).await?;
        if result.success {
            return Ok(GitCommandOutput { stdout: result.stdout, stderr: result.stderr });
        }

        let stderr = if result.stderr.trim().is_empty() { result.stdout } else { result.stderr };
        debug!(%command, code = ?result.code, "git command failed");
        Err(GitError::CommandFailed { command, code: result.code, stderr })
    }

    /// Run git and hand back the raw result; only a spawn failure is an error.
    ///
    /// Used for queries whose non-zero exit is an answer (`rev-parse --verify`,
    /// `symbolic-ref -q`) and for commands whose failure needs inspection.
    pub async fn probe<S: AsRef<str>>(&self, args: &[S]) -> Result<CommandResult, GitError> {
        let (_, result) = self.invoke(args).await?;
        Ok(result)
    }

    async fn invoke<S: AsRef<str>>(&self, args: &[S]) -> Result<(String, CommandResult), GitError> {
        let args: Vec<String> = args.iter().map(|arg| arg.as_ref().to_string()).collect();
        let command = format!("git {}", args.join(" "));
        trace!(%command, cwd = %self.repo_path.display(), "running git");
        let result = self
            .executor
            .execute("git", &args, &self.repo_path, &self.envs)
            .await
            .map_err(|error| GitError::SpawnFailed {
                command: command.clone(),
                message: error.to_string(),
            })?;
        Ok((command, result))
    }
}

fn base_env() -> Vec<(String, String)> {
    // English messages keep stderr classification stable; no prompt may block.
    vec![
        ("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()),
        ("LC_ALL".to_string(), "C".to_string()),
    ]
}
