// `tidgit init`: make a folder a git-tracked wiki, optionally backed up.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use super::{resolve_folder, Globals, Session};
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Wiki folder (defaults to the current directory). Created if missing.
    folder: Option<PathBuf>,

    /// Remote to configure as the backup target.
    #[arg(long)]
    remote_url: Option<String>,

    /// Push to the remote right away.
    #[arg(long, requires = "remote_url")]
    sync: bool,

    /// Sub-wikis are never synced on init, even with `--sync`.
    #[arg(long)]
    sub_wiki: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitResult {
    pub wiki_folder: PathBuf,
    pub remote_url: Option<String>,
    pub synced: bool,
}

pub async fn run(globals: &Globals, args: InitArgs) -> anyhow::Result<ExitCode> {
    let folder = resolve_folder(args.folder)?;
    let session = Session::open(globals, args.sync).await?;
    let synced = args.sync && !args.sub_wiki && session.service.is_online().await;
    let outcome = session
        .service
        .init_wiki_git(&folder, args.sync, !args.sub_wiki, args.remote_url.clone(), session.user())
        .await;
    session.close().await;

    if let Err(error) = outcome {
        output::print_wire_error(globals.format, &error);
        return Ok(ExitCode::from_wire(&error));
    }
    let result = InitResult { wiki_folder: folder, remote_url: args.remote_url, synced };
    output::print_output(globals.format, &result, format_human)?;
    Ok(ExitCode::Success)
}

fn format_human(result: &InitResult) -> String {
    let mut line = format!("Initialized wiki repository in {}", result.wiki_folder.display());
    if let Some(url) = &result.remote_url {
        line.push_str(&format!("\nRemote: {url}"));
        if result.synced {
            line.push_str(" (backed up)");
        }
    }
    line
}
