// CLI subcommand dispatch and the session shared by every subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use tidgit_common::types::UserInfo;
use tidgit_sync::config::Config;
use tidgit_sync::connectivity::{self, Connectivity, StaticConnectivity, TcpProbe};
use tidgit_sync::service::GitService;
use tidgit_sync::worker::{GitWorker, WorkerOptions};
use tracing::debug;

use crate::exit_code::ExitCode;
use crate::messages::English;
use crate::output::OutputFormat;
use crate::terminal::{SystemNative, TerminalWindow, TiddlerFiles};

pub mod clone;
pub mod init;
pub mod remote;
pub mod status;
pub mod sync;

/// Access token for HTTPS remotes. Never read from the config file.
pub const TOKEN_ENV: &str = "TIDGIT_TOKEN";

#[derive(Subcommand)]
pub enum Command {
    /// List changed files and the configured remote
    Status(status::StatusArgs),
    /// Commit local changes and synchronize with the remote
    Sync(sync::SyncArgs),
    /// Turn a folder into a git-tracked wiki
    Init(init::InitArgs),
    /// Clone an online wiki into a new folder
    Clone(clone::CloneArgs),
    /// Show the remote and record the GitHub repository in the wiki
    Remote(remote::RemoteArgs),
}

/// Flags accepted by every subcommand.
pub struct Globals {
    pub config: Option<PathBuf>,
    pub offline: bool,
    pub format: OutputFormat,
}

pub async fn run(globals: &Globals, cmd: Command) -> anyhow::Result<ExitCode> {
    match cmd {
        Command::Status(args) => status::run(globals, args).await,
        Command::Sync(args) => sync::run(globals, args).await,
        Command::Init(args) => init::run(globals, args).await,
        Command::Clone(args) => clone::run(globals, args).await,
        Command::Remote(args) => remote::run(globals, args).await,
    }
}

pub type TerminalService = GitService<TerminalWindow, SystemNative, TiddlerFiles>;

pub struct Session {
    pub config: Config,
    pub service: TerminalService,
}

impl Session {
    /// Load config, probe connectivity (when the command needs the network)
    /// and start the git worker.
    pub async fn open(globals: &Globals, needs_network: bool) -> anyhow::Result<Self> {
        let config = load_config(globals)?;
        let connectivity = probe_connectivity(globals, &config, needs_network).await;
        let worker = GitWorker::spawn(WorkerOptions::from_config(&config), connectivity.clone())
            .await
            .context("failed to start the git worker")?;
        let service = GitService::new(
            worker,
            connectivity,
            TerminalWindow::detect(),
            SystemNative,
            TiddlerFiles,
            Box::new(English),
        );
        Ok(Self { config, service })
    }

    /// Commit identity from config plus the token from the environment.
    pub fn user(&self) -> UserInfo {
        user_with_token(&self.config, std::env::var(TOKEN_ENV).ok())
    }

    pub async fn close(self) {
        self.service.shutdown().await;
    }
}

fn load_config(globals: &Globals) -> anyhow::Result<Config> {
    match &globals.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(Config::load()),
    }
}

/// Probe once per invocation; every later check reuses the answer.
async fn probe_connectivity(
    globals: &Globals,
    config: &Config,
    needs_network: bool,
) -> Arc<dyn Connectivity> {
    if globals.offline || !needs_network {
        return Arc::new(StaticConnectivity(!globals.offline));
    }
    let address = config.sync.probe_address.clone();
    let probe: Arc<dyn Connectivity> =
        Arc::new(TcpProbe::new(address.clone(), config.probe_timeout()));
    let online = connectivity::check(&probe).await;
    debug!(%address, online, "connectivity probed");
    Arc::new(StaticConnectivity(online))
}

fn user_with_token(config: &Config, token: Option<String>) -> UserInfo {
    let user = config.user.to_user_info();
    match token.filter(|token| !token.trim().is_empty()) {
        Some(token) => user.with_access_token(token.trim()),
        None => user,
    }
}

/// Absolute wiki folder; defaults to the current directory.
pub fn resolve_folder(folder: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    Ok(absolute_from(&cwd, folder))
}

fn absolute_from(cwd: &Path, folder: Option<PathBuf>) -> PathBuf {
    match folder {
        Some(folder) if folder.is_absolute() => folder,
        Some(folder) => cwd.join(folder),
        None => cwd.to_path_buf(),
    }
}
