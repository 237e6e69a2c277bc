use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;
use tidgit_common::protocol::message::ErrorKind;
use tidgit_common::protocol::step::SyncStep;
use tidgit_common::types::{ChangeType, CommitAndSyncConfig, UserInfo};
use tidgit_sync::connectivity::StaticConnectivity;
use tidgit_sync::worker::{GitWorker, WorkerOptions};

fn user() -> UserInfo {
    UserInfo::new("Wiki Author", "author@example.test")
}

async fn worker(online: bool) -> GitWorker {
    GitWorker::spawn(WorkerOptions::default(), Arc::new(StaticConnectivity(online)))
        .await
        .expect("worker should start")
}

/// A bare remote plus a working copy that has already pushed one commit.
fn seeded_wiki(root: &Path, name: &str) -> PathBuf {
    let remote = root.join(format!("{name}.git"));
    let wiki = root.join(name);
    run_git(root, &["init", "--bare", "-b", "main", path_str(&remote)]);
    run_git(root, &["init", "-b", "main", path_str(&wiki)]);
    run_git(&wiki, &["config", "user.name", "Fixture"]);
    run_git(&wiki, &["config", "user.email", "fixture@example.test"]);
    run_git(&wiki, &["remote", "add", "origin", path_str(&remote)]);
    std::fs::write(wiki.join("index.tid"), "title: index\n").unwrap();
    run_git(&wiki, &["add", "index.tid"]);
    run_git(&wiki, &["commit", "-m", "seed"]);
    run_git(&wiki, &["push", "-u", "origin", "main"]);
    wiki
}

#[tokio::test]
async fn inspect_and_resolve_remote_through_worker() {
    let temp = TempDir::new().unwrap();
    let wiki = seeded_wiki(temp.path(), "wiki");
    std::fs::write(wiki.join("index.tid"), "title: index\n\nedited\n").unwrap();
    std::fs::write(wiki.join("new.tid"), "title: new\n").unwrap();
    let worker = worker(true).await;

    let mut changes = worker.inspect(wiki.clone()).await.expect("inspect should succeed");
    changes.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    let summary: Vec<(ChangeType, &str)> =
        changes.iter().map(|c| (c.change_type, c.relative_path.as_str())).collect();
    assert_eq!(
        summary,
        vec![(ChangeType::Modified, "index.tid"), (ChangeType::Untracked, "new.tid")]
    );
    assert_eq!(changes[1].absolute_path, wiki.join("new.tid"));

    let remote = worker.resolve_remote(wiki.clone()).await.expect("remote should resolve");
    assert_eq!(remote.remote_name, "origin");
    assert_eq!(remote.branch, "main");
    assert!(remote.remote_url.ends_with("wiki.git"), "got {}", remote.remote_url);

    worker.wait().await;
}

#[tokio::test]
async fn inspect_of_plain_folder_is_an_error() {
    let temp = TempDir::new().unwrap();
    let worker = worker(true).await;

    let error = worker.inspect(temp.path().to_path_buf()).await.expect_err("not a repository");
    assert_eq!(error.kind(), ErrorKind::Internal);

    worker.wait().await;
}

#[tokio::test]
async fn concurrent_syncs_on_different_wikis_both_finish() {
    let temp = TempDir::new().unwrap();
    let first = seeded_wiki(temp.path(), "first");
    let second = seeded_wiki(temp.path(), "second");
    std::fs::write(first.join("a.tid"), "title: a\n").unwrap();
    std::fs::write(second.join("b.tid"), "title: b\n").unwrap();
    let worker = worker(true).await;

    let first_stream =
        worker.commit_and_sync(first.clone(), CommitAndSyncConfig::default(), user()).unwrap();
    let second_stream =
        worker.commit_and_sync(second.clone(), CommitAndSyncConfig::default(), user()).unwrap();
    let (first_report, second_report) =
        tokio::join!(first_stream.collect(), second_stream.collect());

    for (wiki, report) in [(&first, first_report), (&second, second_report)] {
        assert_eq!(report.result, Ok(()), "{}: {:?}", wiki.display(), report.messages);
        assert!(report.has_changes());
        assert_eq!(report.steps().last(), Some(&SyncStep::SynchronizationFinish));
        assert!(run_git_capture(wiki, &["status", "--porcelain"]).trim().is_empty());
    }

    worker.wait().await;
}

#[tokio::test]
async fn failed_sync_ends_with_one_error_signal() {
    let temp = TempDir::new().unwrap();
    let folder = temp.path().join("not-a-repo");
    std::fs::create_dir_all(&folder).unwrap();
    let worker = worker(true).await;

    let report = worker
        .commit_and_sync(folder, CommitAndSyncConfig::default(), user())
        .unwrap()
        .collect()
        .await;

    let error = report.result.as_ref().expect_err("sync should fail");
    assert_eq!(error.kind, ErrorKind::Configuration);
    assert!(error.message.contains("not a git repository"), "got {}", error.message);
    assert_eq!(report.steps(), vec![SyncStep::PrepareSync, SyncStep::CheckingLocalGitRepoSanity]);

    worker.wait().await;
}

#[tokio::test]
async fn init_then_clone_through_worker() {
    let temp = TempDir::new().unwrap();
    let remote = temp.path().join("remote.git");
    run_git(temp.path(), &["init", "--bare", "-b", "main", path_str(&remote)]);
    let wiki = temp.path().join("wiki");
    let copy = temp.path().join("copy");
    let worker = worker(true).await;

    let init = worker
        .init_wiki_git(wiki.clone(), Some(path_str(&remote).to_string()), user(), true)
        .unwrap()
        .collect()
        .await;
    assert_eq!(init.result, Ok(()), "{:?}", init.messages);

    let clone = worker
        .clone_wiki(path_str(&remote).to_string(), copy.clone(), user())
        .unwrap()
        .collect()
        .await;
    assert_eq!(clone.result, Ok(()), "{:?}", clone.messages);
    assert_eq!(
        run_git_capture(&copy, &["rev-parse", "HEAD"]),
        run_git_capture(&wiki, &["rev-parse", "HEAD"])
    );

    worker.wait().await;
}

#[tokio::test]
async fn offline_clone_completes_without_touching_disk() {
    let temp = TempDir::new().unwrap();
    let destination = temp.path().join("never");
    let worker = worker(false).await;

    let report = worker
        .clone_wiki("https://github.com/owner/wiki.git".into(), destination.clone(), user())
        .unwrap()
        .collect()
        .await;

    assert_eq!(report.result, Ok(()));
    assert!(report.messages.is_empty());
    assert!(!destination.exists());

    worker.wait().await;
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

fn run_git(cwd: &Path, args: &[&str]) {
    let output =
        Command::new("git").args(args).current_dir(cwd).output().expect("git command should run");
    assert!(
        output.status.success(),
        "git {:?} failed:\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn run_git_capture(cwd: &Path, args: &[&str]) -> String {
    let output =
        Command::new("git").args(args).current_dir(cwd).output().expect("git command should run");
    assert!(
        output.status.success(),
        "git {:?} failed:\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf8 output")
}
