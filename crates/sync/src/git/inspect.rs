// Repository Inspector: `git status --porcelain` into file-change records.
//
// Only the two-token form `<code> <path>` is recognised. Rename arrows
// (`R  old -> new`) and quoted paths do not match and are dropped.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tidgit_common::types::{ChangeType, FileChangeRecord};

use super::runner::{CommandExecutor, GitRunner};
use crate::error::SyncError;

fn status_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s?(\?\?|[ACMR][DM]?|D)\s+(\S+)$")
            .expect("status line pattern should compile")
    })
}

/// Parse one porcelain line into its change type and relative path.
pub fn parse_status_line(line: &str) -> Option<(ChangeType, String)> {
    let captures = status_line_pattern().captures(line.trim_end_matches('\r'))?;
    let change_type = ChangeType::from_status_code(captures.get(1)?.as_str())?;
    Some((change_type, captures.get(2)?.as_str().to_string()))
}

/// Parse the whole porcelain output; blank and unparseable lines are skipped.
pub fn parse_status_output(repo_path: &Path, stdout: &str) -> Vec<FileChangeRecord> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_status_line)
        .map(|(change_type, relative_path)| FileChangeRecord {
            change_type,
            absolute_path: repo_path.join(&relative_path),
            relative_path,
        })
        .collect()
}

pub async fn inspect<E: CommandExecutor>(
    git: &GitRunner<E>,
) -> Result<Vec<FileChangeRecord>, SyncError> {
    let output = git.run(&["status", "--porcelain"]).await?;
    Ok(parse_status_output(git.repo_path(), &output.stdout))
}
