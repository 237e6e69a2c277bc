// `tidgit status`: changed files and the configured remote of a wiki.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tidgit_common::types::FileChangeRecord;

use super::{resolve_folder, Globals, Session};
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Wiki folder (defaults to the current directory).
    folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub wiki_folder: PathBuf,
    pub remote_url: Option<String>,
    pub changes: Vec<FileChangeRecord>,
}

pub async fn run(globals: &Globals, args: StatusArgs) -> anyhow::Result<ExitCode> {
    let folder = resolve_folder(args.folder)?;
    let session = Session::open(globals, false).await?;
    let changes = session.service.get_modified_file_list(&folder).await;
    let remote_url = session.service.get_workspace_remote(&folder).await;
    session.close().await;

    let result = StatusResult { wiki_folder: folder, remote_url, changes };
    output::print_output(globals.format, &result, format_human)?;
    Ok(ExitCode::Success)
}

fn format_human(result: &StatusResult) -> String {
    let mut lines = vec![
        format!("Wiki: {}", result.wiki_folder.display()),
        format!("Remote: {}", result.remote_url.as_deref().unwrap_or("(none)")),
    ];
    if result.changes.is_empty() {
        lines.push("No local changes.".into());
    } else {
        lines.push(format!("Changes ({}):", result.changes.len()));
        for change in &result.changes {
            lines.push(format!("  {} {}", change.change_type.marker(), change.relative_path));
        }
    }
    lines.join("\n")
}
