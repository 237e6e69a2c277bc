// Supervising git service: drives the worker on behalf of the host
// application and turns progress streams into logs and dialogs.
//
// Windows, the native shell and the wiki itself are reached through traits
// so the host (or the CLI) decides how they look.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tidgit_common::protocol::message::{LogLevel, LogMessage, Signal, WireError};
use tidgit_common::protocol::step::SyncStep;
use tidgit_common::types::{CommitAndSyncConfig, FileChangeRecord, UserInfo, Workspace};
use tracing::{error, info, warn};
use url::Url;

use crate::connectivity::{self, Connectivity};
use crate::progress::ProgressStream;
use crate::worker::GitWorker;

/// Offered when no Git GUI could be opened for a failed sync.
pub const GIT_GUI_DOWNLOAD_URL: &str = "https://desktop.github.com";
/// Tiddler holding `owner/repo` of the GitHub remote.
pub const GITHUB_REPO_TIDDLER: &str = "$:/GitHub/Repo";

const OPEN_GIT_GUI_BUTTON: usize = 1;

// ── Collaborators ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBox {
    pub title: String,
    pub message: String,
    pub buttons: Vec<String>,
    pub cancel_id: usize,
    pub default_id: usize,
}

/// Dialog calls may block until the user answers; the service runs them on
/// the blocking pool.
pub trait WindowService: Send + Sync {
    /// Show a modal dialog; `None` when there is no window to show it in.
    fn show_message_box(&self, message_box: &MessageBox) -> Option<usize>;
}

pub trait NativeService: Send + Sync {
    /// Open the folder in an external Git GUI; `Ok(false)` when none is installed.
    fn open_in_git_gui(&self, folder: &Path) -> anyhow::Result<bool>;
    fn open_external(&self, url: &str) -> anyhow::Result<()>;
}

pub trait WikiService: Send + Sync {
    fn get_tiddler_text(&self, workspace: &Workspace, title: &str)
        -> anyhow::Result<Option<String>>;
    fn add_tiddler(&self, workspace: &Workspace, title: &str, text: &str) -> anyhow::Result<()>;
}

/// Fixed user-facing texts that are not sync steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SyncFailedTitle,
    TokenMissingTitle,
    TokenExpiredOrWrong,
    OkButton,
    OpenGitGuiButton,
}

/// Locale data lives outside the core; the host supplies the table.
pub trait StepTranslator: Send + Sync {
    fn translate(&self, step: SyncStep) -> String;
    fn notice(&self, notice: Notice) -> String;
}

// ── Service ────────────────────────────────────────────────────────

pub struct GitService<W, N, K> {
    worker: GitWorker,
    connectivity: Arc<dyn Connectivity>,
    window: Arc<W>,
    native: Arc<N>,
    wiki: K,
    translator: Box<dyn StepTranslator>,
}

/// What an observed stream amounted to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Observed {
    pub has_changes: bool,
    pub error: Option<WireError>,
}

impl<W, N, K> GitService<W, N, K>
where
    W: WindowService + 'static,
    N: NativeService + 'static,
    K: WikiService,
{
    pub fn new(
        worker: GitWorker,
        connectivity: Arc<dyn Connectivity>,
        window: W,
        native: N,
        wiki: K,
        translator: Box<dyn StepTranslator>,
    ) -> Self {
        Self {
            worker,
            connectivity,
            window: Arc::new(window),
            native: Arc::new(native),
            wiki,
            translator,
        }
    }

    pub fn translate(&self, step: SyncStep) -> String {
        self.translator.translate(step)
    }

    /// Stop the worker and wait for in-flight operations.
    pub async fn shutdown(self) {
        self.worker.wait().await;
    }

    pub async fn get_modified_file_list(&self, wiki_folder: &Path) -> Vec<FileChangeRecord> {
        match self.worker.inspect(wiki_folder.to_path_buf()).await {
            Ok(records) => records,
            Err(error) => {
                warn!(repo = %wiki_folder.display(), %error, "could not list modified files");
                Vec::new()
            }
        }
    }

    pub async fn get_workspace_remote(&self, wiki_folder: &Path) -> Option<String> {
        match self.worker.resolve_remote(wiki_folder.to_path_buf()).await {
            Ok(remote) => Some(remote.remote_url),
            Err(error) => {
                info!(repo = %wiki_folder.display(), %error, "no remote for workspace");
                None
            }
        }
    }

    /// Returns whether content moved. A failed run counts as moved, since it
    /// may have committed or pulled before failing.
    pub async fn commit_and_sync(
        &self,
        workspace: &Workspace,
        config: CommitAndSyncConfig,
        user: UserInfo,
    ) -> bool {
        let observed = self.sync_workspace(workspace, config, user).await;
        observed.error.is_some() || observed.has_changes
    }

    /// Like [`Self::commit_and_sync`], but keeps the error for callers that
    /// need its kind.
    pub async fn sync_workspace(
        &self,
        workspace: &Workspace,
        config: CommitAndSyncConfig,
        user: UserInfo,
    ) -> Observed {
        if !self.is_online().await {
            info!(workspace = %workspace.name, "offline, skipping commit and sync");
            return Observed::default();
        }
        let folder = &workspace.wiki_folder;
        match self.worker.commit_and_sync(folder.clone(), config, user) {
            Ok(stream) => self.observe(folder, stream).await,
            Err(error) => self.fail(folder, error.to_wire()).await,
        }
    }

    pub async fn is_online(&self) -> bool {
        connectivity::check(&self.connectivity).await
    }

    pub async fn init_wiki_git(
        &self,
        wiki_folder: &Path,
        is_synced_wiki: bool,
        is_main_wiki: bool,
        remote_url: Option<String>,
        user: UserInfo,
    ) -> Result<(), WireError> {
        let sync_immediately = is_synced_wiki && is_main_wiki && self.is_online().await;
        let observed = match self.worker.init_wiki_git(
            wiki_folder.to_path_buf(),
            remote_url,
            user,
            sync_immediately,
        ) {
            Ok(stream) => self.observe(wiki_folder, stream).await,
            Err(error) => self.fail(wiki_folder, error.to_wire()).await,
        };
        observed.error.map_or(Ok(()), Err)
    }

    pub async fn clone(
        &self,
        remote_url: &str,
        wiki_folder: &Path,
        user: UserInfo,
    ) -> Result<(), WireError> {
        if !self.is_online().await {
            return Ok(());
        }
        let observed =
            match self.worker.clone_wiki(remote_url.to_string(), wiki_folder.to_path_buf(), user) {
                Ok(stream) => self.observe(wiki_folder, stream).await,
                Err(error) => self.fail(wiki_folder, error.to_wire()).await,
            };
        observed.error.map_or(Ok(()), Err)
    }

    /// Store `repo_name` (`owner/repo`) in the wiki unless it is already there.
    pub fn update_git_info_tiddler(
        &self,
        workspace: &Workspace,
        repo_name: &str,
    ) -> anyhow::Result<()> {
        let current = self.wiki.get_tiddler_text(workspace, GITHUB_REPO_TIDDLER)?;
        if current.as_deref() == Some(repo_name) {
            return Ok(());
        }
        self.wiki.add_tiddler(workspace, GITHUB_REPO_TIDDLER, repo_name)?;
        info!(workspace = %workspace.name, repo_name, "updated GitHub repo tiddler");
        Ok(())
    }

    // ── Stream observation ─────────────────────────────────────────

    async fn observe(&self, folder: &Path, mut stream: ProgressStream) -> Observed {
        let mut observed = Observed::default();
        while let Some(signal) = stream.next().await {
            match signal {
                Signal::Next(message) => {
                    if message.step.is_some_and(SyncStep::moves_content) {
                        observed.has_changes = true;
                    }
                    self.on_message(folder, &message).await;
                }
                Signal::Error(error) => observed.error = self.fail(folder, error).await.error,
                Signal::Complete => {}
            }
        }
        observed
    }

    async fn on_message(&self, folder: &Path, message: &LogMessage) {
        let text = match message.step {
            Some(step) => self.translate(step),
            None => message.message.clone(),
        };
        let step = message.step.map(SyncStep::code).unwrap_or_default();
        let detail = message.error.as_ref().map(|error| error.message.as_str()).unwrap_or_default();
        match message.level {
            LogLevel::Info => info!(repo = %folder.display(), step, "{text}"),
            LogLevel::Warn => warn!(repo = %folder.display(), step, detail, "{text}"),
            LogLevel::Error => error!(repo = %folder.display(), step, detail, "{text}"),
        }

        if message.step == Some(SyncStep::GitPushFailed)
            && (message.message.contains("403") || detail.contains("403"))
        {
            self.show_token_expired(detail).await;
        }
    }

    async fn fail(&self, folder: &Path, error: WireError) -> Observed {
        error!(
            repo = %folder.display(),
            kind = error.kind.as_str(),
            error = %error.message,
            "git operation failed"
        );
        self.show_failed_dialog(folder, &error).await;
        Observed { has_changes: false, error: Some(error) }
    }

    async fn show_token_expired(&self, detail: &str) {
        let dialog = MessageBox {
            title: self.translator.notice(Notice::TokenMissingTitle),
            message: format!("{} ({detail})", self.translator.notice(Notice::TokenExpiredOrWrong)),
            buttons: vec![self.translator.notice(Notice::OkButton)],
            cancel_id: 0,
            default_id: 0,
        };
        self.ask(dialog).await;
    }

    async fn show_failed_dialog(&self, folder: &Path, error: &WireError) {
        let dialog = MessageBox {
            title: self.translator.notice(Notice::SyncFailedTitle),
            message: error.message.clone(),
            buttons: vec![
                self.translator.notice(Notice::OkButton),
                self.translator.notice(Notice::OpenGitGuiButton),
            ],
            cancel_id: 0,
            default_id: OPEN_GIT_GUI_BUTTON,
        };
        if self.ask(dialog).await != Some(OPEN_GIT_GUI_BUTTON) {
            return;
        }
        let native = Arc::clone(&self.native);
        let folder = folder.to_path_buf();
        let opened = tokio::task::spawn_blocking(move || open_git_gui(&*native, &folder)).await;
        if let Err(error) = opened {
            warn!(%error, "opening the Git GUI did not finish");
        }
    }

    /// Show `dialog` off the async runtime; a lost answer counts as no answer.
    async fn ask(&self, dialog: MessageBox) -> Option<usize> {
        let window = Arc::clone(&self.window);
        match tokio::task::spawn_blocking(move || window.show_message_box(&dialog)).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!(%error, "dialog did not finish");
                None
            }
        }
    }
}

fn open_git_gui<N: NativeService>(native: &N, folder: &Path) {
    match native.open_in_git_gui(folder) {
        Ok(true) => return,
        Ok(false) => info!(repo = %folder.display(), "no Git GUI installed"),
        Err(error) => warn!(repo = %folder.display(), %error, "failed to open Git GUI"),
    }
    if let Err(error) = native.open_external(GIT_GUI_DOWNLOAD_URL) {
        warn!(%error, url = GIT_GUI_DOWNLOAD_URL, "failed to open Git GUI download page");
    }
}

/// `owner/repo` for a GitHub remote URL, `None` for anything else.
pub fn github_repo_name(remote_url: &str) -> Option<String> {
    let url = Url::parse(remote_url).ok()?;
    if url.host_str()? != "github.com" {
        return None;
    }
    let mut segments = url.path_segments()?.filter(|segment| !segment.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?.trim_end_matches(".git");
    if segments.next().is_some() || repo.is_empty() {
        return None;
    }
    Some(format!("{owner}/{repo}"))
}

/// Wiki folder of a workspace, for callers that only hold the path.
pub fn workspace_for(folder: &Path) -> Workspace {
    let name = folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| folder.display().to_string());
    Workspace::new(name, PathBuf::from(folder))
}
