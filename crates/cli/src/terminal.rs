// Terminal stand-ins for the desktop collaborators of the sync service:
// dialogs go to stderr, the native shell is reached by spawning commands,
// and tiddlers are `.tid` files under `<wiki>/tiddlers`.

use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context;
use tidgit_common::types::Workspace;
use tidgit_sync::service::{MessageBox, NativeService, WikiService, WindowService};
use tracing::debug;

// ── Dialogs ────────────────────────────────────────────────────────

pub struct TerminalWindow {
    interactive: bool,
}

impl TerminalWindow {
    /// Prompt only when both stdin and stderr are terminals.
    pub fn detect() -> Self {
        Self { interactive: io::stdin().is_terminal() && io::stderr().is_terminal() }
    }
}

impl WindowService for TerminalWindow {
    fn show_message_box(&self, message_box: &MessageBox) -> Option<usize> {
        let mut err = io::stderr().lock();
        let _ = write!(err, "{}", render_message_box(message_box, self.interactive));
        if !self.interactive {
            return None;
        }
        let _ = err.flush();
        drop(err);

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => Some(message_box.cancel_id),
            Ok(_) => Some(parse_choice(&line, message_box)),
        }
    }
}

fn render_message_box(message_box: &MessageBox, interactive: bool) -> String {
    let mut out = format!("\n{}\n  {}\n", message_box.title, message_box.message);
    if interactive && message_box.buttons.len() > 1 {
        let choices: Vec<String> = message_box
            .buttons
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let marker = if index == message_box.default_id { "*" } else { "" };
                format!("[{}{marker}] {label}", index + 1)
            })
            .collect();
        out.push_str(&format!("{} > ", choices.join("  ")));
    }
    out
}

/// 1-based choice; blank picks the default, anything unrecognised cancels.
fn parse_choice(input: &str, message_box: &MessageBox) -> usize {
    let input = input.trim();
    if input.is_empty() {
        return message_box.default_id;
    }
    match input.parse::<usize>() {
        Ok(choice) if (1..=message_box.buttons.len()).contains(&choice) => choice - 1,
        _ => message_box.cancel_id,
    }
}

// ── Native shell ───────────────────────────────────────────────────

pub struct SystemNative;

impl NativeService for SystemNative {
    fn open_in_git_gui(&self, folder: &Path) -> anyhow::Result<bool> {
        let installed = Command::new("git")
            .args(["gui", "version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success());
        if !installed {
            debug!("git gui is not available");
            return Ok(false);
        }
        Command::new("git")
            .arg("gui")
            .current_dir(folder)
            .spawn()
            .with_context(|| format!("failed to start git gui in {}", folder.display()))?;
        Ok(true)
    }

    fn open_external(&self, url: &str) -> anyhow::Result<()> {
        opener(url).spawn().with_context(|| format!("failed to open {url}"))?;
        Ok(())
    }
}

#[cfg(target_os = "windows")]
fn opener(target: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", target]);
    command
}

#[cfg(target_os = "macos")]
fn opener(target: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(target);
    command
}

#[cfg(all(unix, not(target_os = "macos")))]
fn opener(target: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(target);
    command
}

// ── Tiddler files ──────────────────────────────────────────────────

const TIDDLERS_DIR: &str = "tiddlers";
const TIDDLER_TYPE: &str = "text/vnd.tiddlywiki";

/// Reads and writes tiddlers as `.tid` files in the wiki's tiddlers folder.
pub struct TiddlerFiles;

impl TiddlerFiles {
    pub fn path_for(workspace: &Workspace, title: &str) -> PathBuf {
        workspace.wiki_folder.join(TIDDLERS_DIR).join(format!("{}.tid", file_stem(title)))
    }
}

impl WikiService for TiddlerFiles {
    fn get_tiddler_text(
        &self,
        workspace: &Workspace,
        title: &str,
    ) -> anyhow::Result<Option<String>> {
        let path = Self::path_for(workspace, title);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(tid_body(&contents))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => {
                Err(error).with_context(|| format!("failed to read tiddler {}", path.display()))
            }
        }
    }

    fn add_tiddler(&self, workspace: &Workspace, title: &str, text: &str) -> anyhow::Result<()> {
        let path = Self::path_for(workspace, title);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = format!("title: {title}\ntype: {TIDDLER_TYPE}\n\n{text}\n");
        fs::write(&path, contents)
            .with_context(|| format!("failed to write tiddler {}", path.display()))
    }
}

/// File name for a tiddler title, with characters unsafe in paths replaced.
fn file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Text of a `.tid` file: everything after the first blank line.
fn tid_body(contents: &str) -> String {
    let contents = contents.replace("\r\n", "\n");
    let body = contents.split_once("\n\n").map_or("", |(_, body)| body);
    body.trim_end_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dialog() -> MessageBox {
        MessageBox {
            title: "Synchronization failed".into(),
            message: "push failed".into(),
            buttons: vec!["OK".into(), "Open in Git GUI".into()],
            cancel_id: 0,
            default_id: 1,
        }
    }

    #[test]
    fn choices_are_one_based() {
        assert_eq!(parse_choice("1\n", &dialog()), 0);
        assert_eq!(parse_choice(" 2 ", &dialog()), 1);
    }

    #[test]
    fn blank_choice_takes_default_and_garbage_cancels() {
        assert_eq!(parse_choice("\n", &dialog()), 1);
        assert_eq!(parse_choice("3", &dialog()), 0);
        assert_eq!(parse_choice("yes", &dialog()), 0);
    }

    #[test]
    fn rendered_dialog_marks_default_only_when_interactive() {
        let interactive = render_message_box(&dialog(), true);
        assert!(interactive.contains("Synchronization failed"));
        assert!(interactive.contains("[1] OK  [2*] Open in Git GUI > "));

        let plain = render_message_box(&dialog(), false);
        assert!(plain.ends_with("push failed\n"));
        assert!(!plain.contains("[1]"));
    }

    #[test]
    fn system_title_maps_to_safe_file_name() {
        let workspace = Workspace::new("notes", "/wikis/notes");
        assert_eq!(
            TiddlerFiles::path_for(&workspace, "$:/GitHub/Repo"),
            PathBuf::from("/wikis/notes/tiddlers/$__GitHub_Repo.tid")
        );
    }

    #[test]
    fn tiddler_roundtrip_through_files() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new("notes", dir.path());

        assert_eq!(TiddlerFiles.get_tiddler_text(&workspace, "$:/GitHub/Repo").unwrap(), None);
        TiddlerFiles.add_tiddler(&workspace, "$:/GitHub/Repo", "owner/notes").unwrap();

        let written =
            fs::read_to_string(dir.path().join("tiddlers").join("$__GitHub_Repo.tid")).unwrap();
        assert_eq!(written, "title: $:/GitHub/Repo\ntype: text/vnd.tiddlywiki\n\nowner/notes\n");
        assert_eq!(
            TiddlerFiles.get_tiddler_text(&workspace, "$:/GitHub/Repo").unwrap().as_deref(),
            Some("owner/notes")
        );
    }

    #[test]
    fn tid_body_handles_crlf_and_missing_body() {
        assert_eq!(tid_body("title: a\r\n\r\nline one\r\nline two\r\n"), "line one\nline two");
        assert_eq!(tid_body("title: a\n"), "");
    }
}
