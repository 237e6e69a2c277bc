// `tidgit remote`: show a wiki's remote and keep `$:/GitHub/Repo` current.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tidgit_sync::service::{github_repo_name, workspace_for};

use super::{resolve_folder, Globals, Session};
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct RemoteArgs {
    /// Wiki folder (defaults to the current directory).
    folder: Option<PathBuf>,

    /// Write `owner/repo` of a GitHub remote into the wiki's `$:/GitHub/Repo` tiddler.
    #[arg(long)]
    write_tiddler: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoteResult {
    pub wiki_folder: PathBuf,
    pub remote_url: Option<String>,
    pub github_repo: Option<String>,
    pub tiddler_written: bool,
}

pub async fn run(globals: &Globals, args: RemoteArgs) -> anyhow::Result<ExitCode> {
    let folder = resolve_folder(args.folder)?;
    let session = Session::open(globals, false).await?;
    let remote_url = session.service.get_workspace_remote(&folder).await;
    let github_repo = remote_url.as_deref().and_then(github_repo_name);

    let mut tiddler_written = false;
    if args.write_tiddler {
        if let Some(repo) = &github_repo {
            session.service.update_git_info_tiddler(&workspace_for(&folder), repo)?;
            tiddler_written = true;
        }
    }
    session.close().await;

    let result = RemoteResult { wiki_folder: folder, remote_url, github_repo, tiddler_written };
    output::print_output(globals.format, &result, format_human)?;
    if result.remote_url.is_none() {
        return Ok(ExitCode::Usage);
    }
    Ok(ExitCode::Success)
}

fn format_human(result: &RemoteResult) -> String {
    let Some(url) = &result.remote_url else {
        return format!("{} has no remote.", result.wiki_folder.display());
    };
    let mut lines = vec![format!("Remote: {url}")];
    if let Some(repo) = &result.github_repo {
        lines.push(format!("GitHub repository: {repo}"));
    }
    if result.tiddler_written {
        lines.push("Recorded in $:/GitHub/Repo".into());
    }
    lines.join("\n")
}
