use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Temp dir with a config file so tests never read `~/.tidgit`.
struct Env {
    temp: TempDir,
    config: PathBuf,
}

impl Env {
    fn new() -> Self {
        Self::with_probe("127.0.0.1:9")
    }

    /// The connectivity probe dials `probe_address`.
    fn with_probe(probe_address: &str) -> Self {
        let temp = TempDir::new().expect("tempdir should be created");
        let config = temp.path().join("config.toml");
        let contents = format!(
            "[user]\nname = \"Wiki Author\"\nemail = \"author@example.test\"\n\n\
             [sync]\nprobe_address = \"{probe_address}\"\nprobe_timeout_ms = 500\n"
        );
        std::fs::write(&config, contents).expect("write config");
        Self { temp, config }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn tidgit(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_tidgit"))
            .arg("--config")
            .arg(&self.config)
            .arg("--json")
            .args(args)
            .current_dir(self.root())
            .env_remove("TIDGIT_TOKEN")
            .output()
            .expect("tidgit should run")
    }
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|error| {
        panic!(
            "stdout is not JSON ({error}):\nstdout: {stdout}\nstderr: {}",
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[test]
fn init_then_status_lists_new_tiddler() {
    let env = Env::new();

    let init = env.tidgit(&["init", "wiki"]);
    assert_eq!(init.status.code(), Some(0), "{}", String::from_utf8_lossy(&init.stderr));
    let json = stdout_json(&init);
    assert_eq!(json["synced"], false);
    assert!(env.root().join("wiki").join(".git").exists());

    std::fs::create_dir_all(env.root().join("wiki").join("tiddlers")).unwrap();
    std::fs::write(env.root().join("wiki").join("tiddlers").join("Home.tid"), "title: Home\n")
        .unwrap();

    let status = env.tidgit(&["status", "wiki"]);
    assert_eq!(status.status.code(), Some(0));
    let json = stdout_json(&status);
    assert!(json["remote_url"].is_null());
    assert_eq!(json["changes"][0]["change_type"], "untracked");
    assert_eq!(json["changes"][0]["relative_path"], "tiddlers/");
}

#[test]
fn offline_sync_exits_with_network_code() {
    let env = Env::new();
    assert_eq!(env.tidgit(&["init", "wiki"]).status.code(), Some(0));

    let output = env.tidgit(&["--offline", "sync", "wiki"]);

    assert_eq!(output.status.code(), Some(13));
    let json = stdout_json(&output);
    assert_eq!(json["online"], false);
    assert_eq!(json["has_changes"], false);
    assert!(String::from_utf8_lossy(&output.stderr).contains("OFFLINE"));
}

#[test]
fn sync_without_remote_is_a_usage_error() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe target");
    let env = Env::with_probe(&listener.local_addr().unwrap().to_string());
    assert_eq!(env.tidgit(&["init", "wiki"]).status.code(), Some(0));

    let output = env.tidgit(&["sync", "wiki"]);

    assert_eq!(output.status.code(), Some(2));
    let json = stdout_json(&output);
    assert_eq!(json["online"], true);
    assert_eq!(json["error"]["kind"], "configuration");
    assert!(String::from_utf8_lossy(&output.stderr).contains("NO_REMOTE"));
}

#[test]
fn sync_pushes_to_local_bare_remote() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe target");
    let env = Env::with_probe(&listener.local_addr().unwrap().to_string());
    let remote = env.root().join("remote.git");
    let created = Command::new("git")
        .args(["init", "--bare", "-b", "main"])
        .arg(&remote)
        .status()
        .expect("git should run");
    assert!(created.success());
    let remote_url = remote.to_str().expect("utf8 path");
    assert_eq!(
        env.tidgit(&["init", "wiki", "--remote-url", remote_url]).status.code(),
        Some(0)
    );
    std::fs::write(env.root().join("wiki").join("Home.tid"), "title: Home\n").unwrap();

    let output = env.tidgit(&["sync", "wiki", "-m", "docs: add home"]);

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json["has_changes"], true);
    let log = Command::new("git")
        .args(["--git-dir", remote_url, "log", "-1", "--pretty=%s", "main"])
        .output()
        .expect("git should run");
    assert_eq!(String::from_utf8_lossy(&log.stdout).trim(), "docs: add home");
}

#[test]
fn remote_of_plain_repo_is_reported_missing() {
    let env = Env::new();
    assert_eq!(env.tidgit(&["init", "wiki"]).status.code(), Some(0));

    let output = env.tidgit(&["remote", "wiki", "--write-tiddler"]);

    assert_eq!(output.status.code(), Some(2));
    let json = stdout_json(&output);
    assert!(json["remote_url"].is_null());
    assert_eq!(json["tiddler_written"], false);
    assert!(!env.root().join("wiki").join("tiddlers").exists());
}

#[test]
fn remote_records_github_repository_tiddler() {
    let env = Env::new();
    assert_eq!(env.tidgit(&["init", "wiki"]).status.code(), Some(0));
    let wiki = env.root().join("wiki");
    let added = Command::new("git")
        .args(["remote", "add", "origin", "https://github.com/owner/notes.git"])
        .current_dir(&wiki)
        .status()
        .expect("git should run");
    assert!(added.success());

    let output = env.tidgit(&["remote", "wiki", "--write-tiddler"]);

    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["github_repo"], "owner/notes");
    assert_eq!(json["tiddler_written"], true);
    let tiddler = std::fs::read_to_string(wiki.join("tiddlers").join("$__GitHub_Repo.tid"))
        .expect("tiddler should be written");
    assert!(tiddler.ends_with("\n\nowner/notes\n"), "got:\n{tiddler}");
}

#[test]
fn offline_clone_leaves_destination_alone() {
    let env = Env::new();
    let occupied = env.root().join("occupied");
    std::fs::create_dir_all(&occupied).unwrap();
    std::fs::write(occupied.join("keep.txt"), "keep\n").unwrap();

    let output = env.tidgit(&["--offline", "clone", "/nowhere/notes.git", "occupied"]);

    // Offline short-circuits before the destination is inspected.
    assert_eq!(output.status.code(), Some(13));
    assert_eq!(std::fs::read_to_string(occupied.join("keep.txt")).unwrap(), "keep\n");
}
