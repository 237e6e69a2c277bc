// `tidgit clone`: fetch an online wiki into a new folder.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use serde::Serialize;

use super::{resolve_folder, Globals, Session};
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct CloneArgs {
    /// URL (or path) of the wiki repository.
    url: String,

    /// Destination folder; must be missing or empty. Defaults to the
    /// repository name in the current directory.
    folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloneResult {
    pub url: String,
    pub wiki_folder: PathBuf,
    pub online: bool,
}

pub async fn run(globals: &Globals, args: CloneArgs) -> anyhow::Result<ExitCode> {
    let folder = match args.folder {
        Some(folder) => folder,
        None => match folder_name_for(&args.url) {
            Some(name) => PathBuf::from(name),
            None => bail!("cannot derive a folder name from {}; pass one explicitly", args.url),
        },
    };
    let folder = resolve_folder(Some(folder))?;

    let session = Session::open(globals, true).await?;
    let online = session.service.is_online().await;
    let outcome = session.service.clone(&args.url, &folder, session.user()).await;
    session.close().await;

    if let Err(error) = outcome {
        output::print_wire_error(globals.format, &error);
        return Ok(ExitCode::from_wire(&error));
    }
    let result = CloneResult { url: args.url, wiki_folder: folder, online };
    output::print_output(globals.format, &result, format_human)?;
    if !online {
        output::print_warning(globals.format, "OFFLINE", "offline, nothing was cloned");
        return Ok(ExitCode::Network);
    }
    Ok(ExitCode::Success)
}

/// Last path segment of the URL without a `.git` suffix.
fn folder_name_for(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', '\\', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty() && name != "." && name != "..").then(|| name.to_string())
}

fn format_human(result: &CloneResult) -> String {
    if result.online {
        format!("Cloned {} into {}", result.url, result.wiki_folder.display())
    } else {
        format!("Offline; {} was not cloned.", result.url)
    }
}
