// `tidgit sync`: commit local changes and converge with the remote.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tidgit_common::protocol::message::WireError;
use tidgit_common::types::CommitAndSyncConfig;
use tidgit_sync::service::workspace_for;

use super::{resolve_folder, Globals, Session};
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Wiki folder (defaults to the current directory).
    folder: Option<PathBuf>,

    /// Commit message (defaults to a timestamped one).
    #[arg(short, long)]
    message: Option<String>,

    /// Path to leave out of the commit; repeatable.
    #[arg(long = "ignore", value_name = "PATH")]
    ignore: Vec<String>,

    /// Remote to add when the wiki has none yet.
    #[arg(long)]
    remote_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub wiki_folder: PathBuf,
    pub online: bool,
    pub has_changes: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

pub async fn run(globals: &Globals, args: SyncArgs) -> anyhow::Result<ExitCode> {
    let folder = resolve_folder(args.folder)?;
    let session = Session::open(globals, true).await?;
    let online = session.service.is_online().await;
    let config = CommitAndSyncConfig {
        commit_message: args.message,
        files_to_ignore: args.ignore,
        remote_url: args.remote_url,
    };
    let workspace = workspace_for(&folder);
    let observed = session.service.sync_workspace(&workspace, config, session.user()).await;
    session.close().await;

    let result = SyncResult {
        wiki_folder: folder,
        online,
        has_changes: observed.has_changes,
        error: observed.error,
    };
    output::print_output(globals.format, &result, format_human)?;
    Ok(exit_code(globals, &result))
}

fn exit_code(globals: &Globals, result: &SyncResult) -> ExitCode {
    if let Some(error) = &result.error {
        output::print_wire_error(globals.format, error);
        return ExitCode::from_wire(error);
    }
    if !result.online {
        output::print_warning(globals.format, "OFFLINE", "offline, nothing was synchronized");
        return ExitCode::Network;
    }
    ExitCode::Success
}

fn format_human(result: &SyncResult) -> String {
    let folder = result.wiki_folder.display();
    match (&result.error, result.online, result.has_changes) {
        (Some(_), _, _) => format!("Sync of {folder} failed."),
        (None, false, _) => format!("Offline; {folder} was left as it is."),
        (None, true, true) => format!("Synchronized {folder}."),
        (None, true, false) => format!("{folder} is already up to date."),
    }
}
