// Isolation boundary: all git work runs on a dedicated OS thread with its own
// current-thread tokio runtime. Callers talk to it through a request queue
// and get results back as oneshot replies or progress streams.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use tidgit_common::protocol::message::{ErrorKind, WireError};
use tidgit_common::types::{CommitAndSyncConfig, FileChangeRecord, RemoteDescriptor, UserInfo};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::connectivity::Connectivity;
use crate::error::SyncError;
use crate::git::inspect::inspect;
use crate::git::orchestrator::{self, SyncContext};
use crate::git::repo;
use crate::git::runner::{CommandExecutor, GitRunner, ProcessCommandExecutor};
use crate::git::sync::SyncOptions;
use crate::progress::{progress_channel, ProgressEmitter, ProgressStream};

const WORKER_THREAD_NAME: &str = "tidgit-git-worker";
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOptions {
    pub sync: SyncOptions,
    /// Upper bound on the ready handshake.
    pub startup_timeout: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self { sync: SyncOptions::default(), startup_timeout: DEFAULT_STARTUP_TIMEOUT }
    }
}

impl WorkerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self { sync: config.sync_options(), startup_timeout: config.startup_timeout() }
    }
}

#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    #[error("git worker did not become ready within {0:?}")]
    StartupTimeout(Duration),
    #[error("git worker failed to start: {0}")]
    StartupFailed(String),
    #[error("git worker has stopped")]
    Stopped,
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl WorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Sync(error) => error.kind(),
            _ => ErrorKind::Internal,
        }
    }

    pub fn to_wire(&self) -> WireError {
        WireError::new(self.kind(), self.to_string())
    }
}

enum Request {
    Inspect {
        repo: PathBuf,
        reply: oneshot::Sender<Result<Vec<FileChangeRecord>, SyncError>>,
    },
    ResolveRemote {
        repo: PathBuf,
        reply: oneshot::Sender<Result<RemoteDescriptor, SyncError>>,
    },
    CommitAndSync {
        repo: PathBuf,
        config: CommitAndSyncConfig,
        user: UserInfo,
        emitter: ProgressEmitter,
    },
    InitWikiGit {
        repo: PathBuf,
        remote_url: Option<String>,
        user: UserInfo,
        sync_immediately: bool,
        emitter: ProgressEmitter,
    },
    Clone {
        remote_url: String,
        destination: PathBuf,
        user: UserInfo,
        emitter: ProgressEmitter,
    },
    Shutdown,
}

/// Handle to the git worker thread. Dropping it stops the worker once
/// in-flight operations finish.
pub struct GitWorker {
    requests: mpsc::UnboundedSender<Request>,
    thread: Option<JoinHandle<()>>,
}

impl GitWorker {
    pub async fn spawn(
        options: WorkerOptions,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self, WorkerError> {
        Self::spawn_with_executor(options, Arc::new(ProcessCommandExecutor), connectivity).await
    }

    pub async fn spawn_with_executor<E: CommandExecutor + 'static>(
        options: WorkerOptions,
        executor: Arc<E>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self, WorkerError> {
        let (requests, request_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let ctx = SyncContext::new(executor, connectivity, options.sync);

        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(ctx, request_rx, ready_tx))
            .map_err(|error| WorkerError::StartupFailed(error.to_string()))?;

        match tokio::time::timeout(options.startup_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(Self { requests, thread: Some(thread) }),
            Ok(Ok(Err(message))) => Err(WorkerError::StartupFailed(message)),
            Ok(Err(_)) => {
                Err(WorkerError::StartupFailed("worker thread exited during startup".into()))
            }
            Err(_) => {
                warn!(timeout = ?options.startup_timeout, "git worker startup timed out");
                let _ = requests.send(Request::Shutdown);
                Err(WorkerError::StartupTimeout(options.startup_timeout))
            }
        }
    }

    /// Working-tree changes of `repo`.
    pub async fn inspect(&self, repo: PathBuf) -> Result<Vec<FileChangeRecord>, WorkerError> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Inspect { repo, reply })?;
        Ok(response.await.map_err(|_| WorkerError::Stopped)??)
    }

    pub async fn resolve_remote(&self, repo: PathBuf) -> Result<RemoteDescriptor, WorkerError> {
        let (reply, response) = oneshot::channel();
        self.send(Request::ResolveRemote { repo, reply })?;
        Ok(response.await.map_err(|_| WorkerError::Stopped)??)
    }

    pub fn commit_and_sync(
        &self,
        repo: PathBuf,
        config: CommitAndSyncConfig,
        user: UserInfo,
    ) -> Result<ProgressStream, WorkerError> {
        let (emitter, stream) = progress_channel();
        self.send(Request::CommitAndSync { repo, config, user, emitter })?;
        Ok(stream)
    }

    pub fn init_wiki_git(
        &self,
        repo: PathBuf,
        remote_url: Option<String>,
        user: UserInfo,
        sync_immediately: bool,
    ) -> Result<ProgressStream, WorkerError> {
        let (emitter, stream) = progress_channel();
        self.send(Request::InitWikiGit { repo, remote_url, user, sync_immediately, emitter })?;
        Ok(stream)
    }

    pub fn clone_wiki(
        &self,
        remote_url: String,
        destination: PathBuf,
        user: UserInfo,
    ) -> Result<ProgressStream, WorkerError> {
        let (emitter, stream) = progress_channel();
        self.send(Request::Clone { remote_url, destination, user, emitter })?;
        Ok(stream)
    }

    /// Stop accepting requests. In-flight operations run to completion.
    pub fn shutdown(&self) {
        let _ = self.requests.send(Request::Shutdown);
    }

    /// Shut down and wait for the worker thread to exit.
    pub async fn wait(mut self) {
        self.shutdown();
        if let Some(thread) = self.thread.take() {
            let joined = tokio::task::spawn_blocking(move || thread.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                warn!("git worker thread panicked");
            }
        }
    }

    fn send(&self, request: Request) -> Result<(), WorkerError> {
        self.requests.send(request).map_err(|_| WorkerError::Stopped)
    }
}

impl Drop for GitWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Worker thread ──────────────────────────────────────────────────

fn run_worker<E: CommandExecutor + 'static>(
    ctx: SyncContext<E>,
    requests: mpsc::UnboundedReceiver<Request>,
    ready: oneshot::Sender<Result<(), String>>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            let _ = ready.send(Err(format!("failed to build worker runtime: {error}")));
            return;
        }
    };

    runtime.block_on(async move {
        if let Err(message) = check_git(&ctx).await {
            let _ = ready.send(Err(message));
            return;
        }
        if ready.send(Ok(())).is_err() {
            debug!("spawner gave up before the worker became ready");
            return;
        }
        info!("git worker ready");
        serve(ctx, requests).await;
    });
}

async fn check_git<E: CommandExecutor>(ctx: &SyncContext<E>) -> Result<(), String> {
    let git = ctx.runner(&std::env::temp_dir());
    let output = git.run(&["--version"]).await.map_err(|error| error.to_string())?;
    debug!(version = %output.stdout.trim(), "git available");
    Ok(())
}

async fn serve<E: CommandExecutor + 'static>(
    ctx: SyncContext<E>,
    mut requests: mpsc::UnboundedReceiver<Request>,
) {
    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            request = requests.recv() => match request {
                Some(Request::Shutdown) | None => break,
                Some(request) => dispatch(&ctx, request, &mut tasks),
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(error) = joined {
                    warn!(%error, "git operation task failed");
                }
            }
        }
    }

    if !tasks.is_empty() {
        info!(in_flight = tasks.len(), "git worker draining operations");
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(error) = joined {
            warn!(%error, "git operation task failed");
        }
    }
    info!("git worker stopped");
}

fn dispatch<E: CommandExecutor + 'static>(
    ctx: &SyncContext<E>,
    request: Request,
    tasks: &mut JoinSet<()>,
) {
    let ctx = ctx.clone();
    let op_id = Uuid::new_v4();
    match request {
        Request::Inspect { repo, reply } => {
            let span = info_span!("git_op", op = "inspect", %op_id, repo = %repo.display());
            tasks.spawn(
                async move {
                    let result = inspect(&ctx.runner(&repo)).await;
                    let _ = reply.send(result);
                }
                .instrument(span),
            );
        }
        Request::ResolveRemote { repo, reply } => {
            let span = info_span!("git_op", op = "resolve_remote", %op_id, repo = %repo.display());
            tasks.spawn(
                async move {
                    let git = ctx.runner(&repo);
                    let result = repo::resolve_remote(&git, &ctx.options.default_branch).await;
                    let _ = reply.send(result);
                }
                .instrument(span),
            );
        }
        Request::CommitAndSync { repo, config, user, mut emitter } => {
            let span = info_span!("git_op", op = "commit_and_sync", %op_id, repo = %repo.display());
            tasks.spawn(
                async move {
                    let result =
                        orchestrator::commit_and_sync(&ctx, &repo, &config, &user, &mut emitter)
                            .await;
                    if let Ok(moved) = &result {
                        debug!(moved, "commit and sync finished");
                    }
                    report(emitter, result.map(|_| ())).await;
                }
                .instrument(span),
            );
        }
        Request::InitWikiGit { repo, remote_url, user, sync_immediately, mut emitter } => {
            let span = info_span!("git_op", op = "init_wiki_git", %op_id, repo = %repo.display());
            tasks.spawn(
                async move {
                    let result = orchestrator::init_wiki_git(
                        &ctx,
                        &repo,
                        remote_url.as_deref(),
                        &user,
                        sync_immediately,
                        &mut emitter,
                    )
                    .await;
                    report(emitter, result).await;
                }
                .instrument(span),
            );
        }
        Request::Clone { remote_url, destination, user, mut emitter } => {
            let span =
                info_span!("git_op", op = "clone", %op_id, repo = %destination.display());
            tasks.spawn(
                async move {
                    let result =
                        orchestrator::clone(&ctx, &remote_url, &destination, &user, &mut emitter)
                            .await;
                    report(emitter, result).await;
                }
                .instrument(span),
            );
        }
        Request::Shutdown => {}
    }
}

async fn report(emitter: ProgressEmitter, result: Result<(), SyncError>) {
    if let Err(error) = &result {
        warn!(kind = error.kind().as_str(), %error, "git operation failed");
    }
    emitter.finish(result.map_err(|error| error.to_wire())).await;
}
