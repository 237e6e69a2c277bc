// Sync State Machine: repository sanity, remote resolution, and the
// fetch/compare/push-pull-rebase loop that converges local and remote.

use tidgit_common::protocol::message::LogLevel;
use tidgit_common::protocol::step::SyncStep;
use tidgit_common::types::{RemoteDescriptor, UserInfo, DEFAULT_BRANCH, DEFAULT_REMOTE};
use tracing::{debug, info, warn};

use super::repo::{self, SpecialState, SyncState};
use super::runner::{CommandExecutor, CommandResult, GitError, GitRunner};
use crate::error::SyncError;
use crate::progress::ProgressEmitter;

pub const DEFAULT_MAX_SYNC_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Branch used when HEAD is detached or a repository is created.
    pub default_branch: String,
    /// Remote name used when a remote is configured by `init`.
    pub default_remote: String,
    /// Upper bound on passes through the compare/act loop.
    pub max_sync_attempts: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            default_branch: DEFAULT_BRANCH.to_string(),
            default_remote: DEFAULT_REMOTE.to_string(),
            max_sync_attempts: DEFAULT_MAX_SYNC_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local and remote already matched and nothing was committed.
    UpToDate,
    /// Content moved and the final check found both sides equal.
    Synchronized,
}

/// One synchronization run against one working copy.
///
/// The phases are public so the commit orchestrator can stage and commit
/// between remote preparation and convergence.
pub struct SyncMachine<'a, E: CommandExecutor> {
    git: GitRunner<E>,
    user: &'a UserInfo,
    emitter: &'a mut ProgressEmitter,
    options: &'a SyncOptions,
    /// Connectivity as sampled when the operation started.
    online: bool,
}

impl<'a, E: CommandExecutor> SyncMachine<'a, E> {
    pub fn new(
        git: &GitRunner<E>,
        user: &'a UserInfo,
        emitter: &'a mut ProgressEmitter,
        options: &'a SyncOptions,
        online: bool,
    ) -> Self {
        Self { git: git.with_identity(user), user, emitter, options, online }
    }

    /// Runner carrying this run's identity and credentials.
    pub fn git(&self) -> &GitRunner<E> {
        &self.git
    }

    pub fn emitter(&mut self) -> &mut ProgressEmitter {
        &mut *self.emitter
    }

    // ── Preflight ──────────────────────────────────────────────────

    /// Connectivity, repository sanity, and recovery from special states.
    pub async fn preflight(&mut self) -> Result<(), SyncError> {
        if !self.online {
            return Err(SyncError::Offline);
        }

        self.emitter.step(SyncStep::CheckingLocalGitRepoSanity).await;
        if !repo::is_repository(&self.git).await? {
            return Err(SyncError::NotInitialized { path: self.git.repo_path().to_path_buf() });
        }

        let Some(state) = repo::special_state(&self.git).await? else {
            return Ok(());
        };
        let repo_path = self.git.repo_path().display().to_string();
        warn!(repo = %repo_path, %state, "special git state, attempting recovery");

        let recovery = self.recover(state).await.err();
        let remaining = repo::special_state(&self.git).await?;
        match (recovery, remaining) {
            (None, None) => {
                info!(repo = %repo_path, %state, "recovered from special git state");
                self.emitter.step(SyncStep::CantSyncInSpecialGitStateAutoFixSucceed).await;
                Ok(())
            }
            (recovery, remaining) => {
                let detail = recovery
                    .map(|error| error.stderr().trim().to_string())
                    .or_else(|| remaining.map(|still| format!("repository is still {still}")))
                    .unwrap_or_default();
                let error = SyncError::SpecialStateAutoFixFailed { state, detail };
                self.emitter
                    .fail_step(LogLevel::Error, SyncStep::CantSyncInSpecialGitStateAutoFixFailed, &error)
                    .await;
                Err(error)
            }
        }
    }

    async fn recover(&self, state: SpecialState) -> Result<(), GitError> {
        let args: Vec<&str> = match state {
            SpecialState::Rebasing => vec!["rebase", "--abort"],
            SpecialState::Merging => vec!["merge", "--abort"],
            SpecialState::CherryPicking => vec!["cherry-pick", "--abort"],
            SpecialState::Reverting => vec!["revert", "--abort"],
            SpecialState::Detached => vec!["checkout", self.options.default_branch.as_str()],
        };
        self.git.run(&args).await.map(|_| ())
    }

    // ── Remote and identity ────────────────────────────────────────

    /// Validate the user and resolve the remote, adding `remote_url` when
    /// the repository has no remote under the resolved name.
    pub async fn prepare_remote(
        &mut self,
        remote_url: Option<&str>,
    ) -> Result<RemoteDescriptor, SyncError> {
        self.emitter.step(SyncStep::PreparingUserInfo).await;
        if self.user.name.trim().is_empty() {
            return Err(SyncError::MissingParameter("user.name"));
        }
        if self.user.email.trim().is_empty() {
            return Err(SyncError::MissingParameter("user.email"));
        }

        let remote = match repo::resolve_remote(&self.git, &self.options.default_branch).await {
            Ok(remote) => remote,
            Err(SyncError::NoRemote { remote }) => {
                let Some(url) = remote_url.map(str::trim).filter(|url| !url.is_empty()) else {
                    return Err(SyncError::NoRemote { remote });
                };
                info!(repo = %self.git.repo_path().display(), %remote, "adding missing remote");
                self.git.run(&["remote", "add", remote.as_str(), url]).await?;
                let branch = repo::current_branch(&self.git)
                    .await?
                    .unwrap_or_else(|| self.options.default_branch.clone());
                RemoteDescriptor { remote_name: remote, remote_url: url.to_string(), branch }
            }
            Err(error) => return Err(error),
        };

        if remote.is_http() && !self.user.has_access_token() {
            return Err(SyncError::MissingParameter("access_token"));
        }
        Ok(remote)
    }

    // ── Convergence ────────────────────────────────────────────────

    pub async fn converge(&mut self, remote: &RemoteDescriptor) -> Result<SyncOutcome, SyncError> {
        self.emitter.step(SyncStep::FetchingData).await;
        self.fetch(remote).await?;

        let tracking = remote.tracking_ref();
        let max_attempts = self.options.max_sync_attempts.max(1);
        for attempt in 1..=max_attempts {
            self.emitter.step(SyncStep::CheckingLocalSyncState).await;
            let state = repo::sync_state(&self.git, remote).await?;
            debug!(repo = %self.git.repo_path().display(), attempt, ?state, "local sync state");

            match state {
                SyncState::Clean if !self.emitter.has_changes() => {
                    self.emitter.step(SyncStep::NoNeedToSync).await;
                    return Ok(SyncOutcome::UpToDate);
                }
                SyncState::Clean => return self.finish(remote).await,
                SyncState::LocalAhead | SyncState::NoUpstream => {
                    self.emitter.step(SyncStep::LocalAheadStartUpload).await;
                    match self.push(remote, state == SyncState::NoUpstream).await {
                        Ok(()) => return self.finish(remote).await,
                        Err(error) if error.is_non_fast_forward() => {
                            info!(
                                repo = %self.git.repo_path().display(),
                                "push rejected as non-fast-forward, fetching again"
                            );
                            self.emitter
                                .info("Remote has new commits, fetching them before retrying")
                                .await;
                            self.fetch(remote).await?;
                        }
                        Err(error) => {
                            let error = SyncError::classify(error, SyncError::Push);
                            self.emitter.fail_step(LogLevel::Warn, SyncStep::GitPushFailed, &error).await;
                            return Err(error);
                        }
                    }
                }
                SyncState::LocalBehind => {
                    self.emitter.step(SyncStep::LocalBehindPull).await;
                    match self.git.run(&["merge", "--ff-only", tracking.as_str()]).await {
                        Ok(_) => return self.finish(remote).await,
                        Err(error) => {
                            let error = SyncError::classify(error, SyncError::Merge);
                            self.emitter.fail_step(LogLevel::Warn, SyncStep::GitMergeFailed, &error).await;
                            return Err(error);
                        }
                    }
                }
                SyncState::Diverged => {
                    self.emitter.step(SyncStep::LocalStateDivergeRebase).await;
                    self.rebase(&tracking).await?;
                    self.emitter.step(SyncStep::RebaseSucceed).await;
                }
            }
        }

        let error = SyncError::RetryLimitExceeded { attempts: max_attempts };
        self.emitter.fail_step(LogLevel::Error, SyncStep::SyncFailedAlgorithmWrong, &error).await;
        Err(error)
    }

    async fn fetch(&self, remote: &RemoteDescriptor) -> Result<(), SyncError> {
        self.git
            .run(&["fetch", remote.remote_name.as_str()])
            .await
            .map(|_| ())
            .map_err(|error| SyncError::classify(error, SyncError::Fetch))
    }

    async fn push(&self, remote: &RemoteDescriptor, set_upstream: bool) -> Result<(), GitError> {
        let refspec = format!("HEAD:refs/heads/{}", remote.branch);
        let mut args = vec!["push"];
        if set_upstream {
            args.push("--set-upstream");
        }
        args.extend([remote.remote_name.as_str(), refspec.as_str()]);
        self.git.run(&args).await.map(|_| ())
    }

    /// Rebase onto the tracking ref. On conflicts the rebase is aborted so the
    /// working copy is left as it was, and the conflicting paths are reported.
    async fn rebase(&mut self, tracking: &str) -> Result<(), SyncError> {
        let result = self.git.probe(&["rebase", "--autostash", tracking]).await?;
        self.emitter.step(SyncStep::RebaseResultChecking).await;
        if result.success {
            return Ok(());
        }

        let detail = failure_detail(&result);
        if repo::special_state(&self.git).await? != Some(SpecialState::Rebasing) {
            return Err(SyncError::from(GitError::CommandFailed {
                command: format!("git rebase --autostash {tracking}"),
                code: result.code,
                stderr: detail,
            }));
        }

        let files = repo::conflicted_files(&self.git).await.unwrap_or_default();
        warn!(repo = %self.git.repo_path().display(), files = ?files, "rebase stopped on conflicts");
        let error = SyncError::RebaseConflict { files, detail };
        self.emitter.fail_step(LogLevel::Error, SyncStep::RebaseConflictNeedsResolve, &error).await;
        if let Err(abort) = self.git.run(&["rebase", "--abort"]).await {
            warn!(repo = %self.git.repo_path().display(), error = %abort, "rebase --abort failed");
        }
        Err(error)
    }

    async fn finish(&mut self, remote: &RemoteDescriptor) -> Result<SyncOutcome, SyncError> {
        self.emitter.step(SyncStep::PerformLastCheckBeforeFinish).await;
        let state = repo::sync_state(&self.git, remote).await?;
        if state != SyncState::Clean {
            let error = SyncError::AlgorithmWrong(format!(
                "expected local and remote to match after syncing, found {state:?}"
            ));
            self.emitter.fail_step(LogLevel::Error, SyncStep::SyncFailedAlgorithmWrong, &error).await;
            return Err(error);
        }
        self.emitter.step(SyncStep::SynchronizationFinish).await;
        info!(repo = %self.git.repo_path().display(), remote = %remote.remote_name, "synchronized");
        Ok(SyncOutcome::Synchronized)
    }
}

/// Rebase writes conflict lines to stdout and the summary to stderr.
fn failure_detail(result: &CommandResult) -> String {
    [result.stderr.trim(), result.stdout.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::tests::{fail, ok, MockExecutor};
    use crate::progress::progress_channel;
    use std::sync::Arc;

    fn remote() -> RemoteDescriptor {
        RemoteDescriptor {
            remote_name: "origin".into(),
            remote_url: "/srv/wiki.git".into(),
            branch: "main".into(),
        }
    }

    fn user() -> UserInfo {
        UserInfo::new("Alice", "alice@example.test")
    }

    /// Responses for one `sync_state` call that finds the given counts.
    fn state(ahead: u32, behind: u32) -> Vec<Result<CommandResult, std::io::Error>> {
        if ahead == 0 && behind == 0 {
            return vec![ok("aaa\n"), ok("aaa\n")];
        }
        vec![ok("aaa\n"), ok("bbb\n"), ok(&format!("{ahead}\t{behind}\n"))]
    }

    async fn run_converge(
        mock: Arc<MockExecutor>,
        max_sync_attempts: u32,
    ) -> (Result<SyncOutcome, SyncError>, Vec<SyncStep>) {
        let (mut emitter, stream) = progress_channel();
        let observer = tokio::spawn(stream.collect());
        let options = SyncOptions { max_sync_attempts, ..SyncOptions::default() };
        let user = user();
        let git = GitRunner::with_executor("/wiki", mock);

        let result = {
            let mut machine = SyncMachine::new(&git, &user, &mut emitter, &options, true);
            machine.converge(&remote()).await
        };
        emitter.finish(result.as_ref().map(|_| ()).map_err(SyncError::to_wire)).await;
        (result, observer.await.unwrap().steps())
    }

    fn script(parts: Vec<Vec<Result<CommandResult, std::io::Error>>>) -> Arc<MockExecutor> {
        MockExecutor::new(parts.into_iter().flatten().collect())
    }

    #[tokio::test]
    async fn clean_without_changes_is_no_need_to_sync() {
        let mock = script(vec![vec![ok("")], state(0, 0)]);
        let (result, steps) = run_converge(mock.clone(), 5).await;

        assert_eq!(result.unwrap(), SyncOutcome::UpToDate);
        assert_eq!(
            steps,
            vec![SyncStep::FetchingData, SyncStep::CheckingLocalSyncState, SyncStep::NoNeedToSync]
        );
        assert_eq!(mock.commands()[0], "fetch origin");
        assert_eq!(mock.remaining(), 0);
    }

    #[tokio::test]
    async fn ahead_pushes_then_checks() {
        let mock = script(vec![vec![ok("")], state(2, 0), vec![ok("")], state(0, 0)]);
        let (result, steps) = run_converge(mock.clone(), 5).await;

        assert_eq!(result.unwrap(), SyncOutcome::Synchronized);
        assert_eq!(
            steps,
            vec![
                SyncStep::FetchingData,
                SyncStep::CheckingLocalSyncState,
                SyncStep::LocalAheadStartUpload,
                SyncStep::PerformLastCheckBeforeFinish,
                SyncStep::SynchronizationFinish,
            ]
        );
        assert!(mock.commands().contains(&"push origin HEAD:refs/heads/main".to_string()));
    }

    #[tokio::test]
    async fn no_upstream_pushes_with_set_upstream() {
        let mock = script(vec![
            vec![ok("")],
            vec![ok("aaa\n"), fail(1, "")],
            vec![ok("")],
            state(0, 0),
        ]);
        let (result, _) = run_converge(mock.clone(), 5).await;

        assert_eq!(result.unwrap(), SyncOutcome::Synchronized);
        assert!(mock
            .commands()
            .contains(&"push --set-upstream origin HEAD:refs/heads/main".to_string()));
    }

    #[tokio::test]
    async fn behind_fast_forwards() {
        let mock = script(vec![vec![ok("")], state(0, 3), vec![ok("")], state(0, 0)]);
        let (result, steps) = run_converge(mock.clone(), 5).await;

        assert_eq!(result.unwrap(), SyncOutcome::Synchronized);
        assert!(steps.contains(&SyncStep::LocalBehindPull));
        assert!(mock.commands().contains(&"merge --ff-only refs/remotes/origin/main".to_string()));
    }

    #[tokio::test]
    async fn failed_fast_forward_reports_merge_failure() {
        let mock = script(vec![
            vec![ok("")],
            state(0, 1),
            vec![fail(128, "fatal: Not possible to fast-forward, aborting.")],
        ]);
        let (result, steps) = run_converge(mock, 5).await;

        assert!(matches!(result, Err(SyncError::Merge(_))));
        assert_eq!(steps.last(), Some(&SyncStep::GitMergeFailed));
    }

    #[tokio::test]
    async fn diverged_rebases_then_pushes() {
        let mock = script(vec![
            vec![ok("")],
            state(1, 1),
            vec![ok("Successfully rebased and updated refs/heads/main.\n")],
            state(1, 0),
            vec![ok("")],
            state(0, 0),
        ]);
        let (result, steps) = run_converge(mock.clone(), 5).await;

        assert_eq!(result.unwrap(), SyncOutcome::Synchronized);
        assert_eq!(
            steps,
            vec![
                SyncStep::FetchingData,
                SyncStep::CheckingLocalSyncState,
                SyncStep::LocalStateDivergeRebase,
                SyncStep::RebaseResultChecking,
                SyncStep::RebaseSucceed,
                SyncStep::CheckingLocalSyncState,
                SyncStep::LocalAheadStartUpload,
                SyncStep::PerformLastCheckBeforeFinish,
                SyncStep::SynchronizationFinish,
            ]
        );
        assert!(mock
            .commands()
            .contains(&"rebase --autostash refs/remotes/origin/main".to_string()));
    }

    #[tokio::test]
    async fn rebase_conflict_aborts_and_lists_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".git/rebase-merge")).unwrap();
        let mock = script(vec![
            vec![ok("")],
            state(1, 1),
            vec![Ok(CommandResult {
                success: false,
                code: Some(1),
                stdout: "CONFLICT (content): Merge conflict in tiddlers/Index.tid\n".into(),
                stderr: "error: could not apply 1234abc... local edit\n".into(),
            })],
            vec![ok(".git/rebase-merge\n")],
            vec![ok("tiddlers/Index.tid\n")],
            vec![ok("")],
        ]);

        let (mut emitter, stream) = progress_channel();
        let observer = tokio::spawn(stream.collect());
        let options = SyncOptions::default();
        let user = user();
        let git = GitRunner::with_executor(tmp.path(), mock.clone());
        let result = {
            let mut machine = SyncMachine::new(&git, &user, &mut emitter, &options, true);
            machine.converge(&remote()).await
        };
        emitter.finish(Ok(())).await;
        let report = observer.await.unwrap();

        match result {
            Err(SyncError::RebaseConflict { files, detail }) => {
                assert_eq!(files, vec!["tiddlers/Index.tid".to_string()]);
                assert!(detail.contains("CONFLICT (content)"));
            }
            other => panic!("expected rebase conflict, got {other:?}"),
        }
        let last = report.messages.last().unwrap();
        assert_eq!(last.step, Some(SyncStep::RebaseConflictNeedsResolve));
        assert_eq!(last.level, LogLevel::Error);
        assert_eq!(mock.commands().last().map(String::as_str), Some("rebase --abort"));
        assert_eq!(mock.remaining(), 0);
    }

    #[tokio::test]
    async fn rejected_push_refetches_and_retries() {
        let mock = script(vec![
            vec![ok("")],
            state(1, 0),
            vec![fail(1, " ! [rejected]        HEAD -> main (fetch first)\n")],
            vec![ok("")],
            state(1, 1),
            vec![ok("")],
            state(1, 0),
            vec![ok("")],
            state(0, 0),
        ]);
        let (result, steps) = run_converge(mock.clone(), 5).await;

        assert_eq!(result.unwrap(), SyncOutcome::Synchronized);
        let checks = steps.iter().filter(|s| **s == SyncStep::CheckingLocalSyncState).count();
        assert_eq!(checks, 3);
        assert_eq!(mock.commands().iter().filter(|c| c.as_str() == "fetch origin").count(), 2);
    }

    #[tokio::test]
    async fn other_push_failure_is_reported_as_warn_step() {
        let mock = script(vec![
            vec![ok("")],
            state(1, 0),
            vec![fail(128, "remote: Permission denied\nfatal: unable to access: The requested URL returned error: 403\n")],
        ]);
        let (result, steps) = run_converge(mock, 5).await;

        match result {
            Err(SyncError::Push(error)) => assert!(error.stderr().contains("403")),
            other => panic!("expected push error, got {other:?}"),
        }
        assert_eq!(steps.last(), Some(&SyncStep::GitPushFailed));
    }

    #[tokio::test]
    async fn endless_rejection_hits_retry_limit() {
        let rejected = || fail(1, "Updates were rejected because the remote contains work");
        let mock = script(vec![
            vec![ok("")],
            state(1, 0),
            vec![rejected(), ok("")],
            state(1, 0),
            vec![rejected(), ok("")],
        ]);
        let (result, steps) = run_converge(mock, 2).await;

        assert!(matches!(result, Err(SyncError::RetryLimitExceeded { attempts: 2 })));
        assert_eq!(steps.last(), Some(&SyncStep::SyncFailedAlgorithmWrong));
    }

    #[tokio::test]
    async fn unclean_last_check_is_algorithm_wrong() {
        let mock = script(vec![vec![ok("")], state(1, 0), vec![ok("")], state(1, 0)]);
        let (result, steps) = run_converge(mock, 5).await;

        assert!(matches!(result, Err(SyncError::AlgorithmWrong(_))));
        assert_eq!(
            &steps[steps.len() - 2..],
            &[SyncStep::PerformLastCheckBeforeFinish, SyncStep::SyncFailedAlgorithmWrong]
        );
    }

    #[tokio::test]
    async fn fetch_lock_contention_is_classified() {
        let mock = script(vec![vec![fail(
            255,
            "error: cannot lock ref 'refs/remotes/origin/main': Unable to create '/w/.git/refs/remotes/origin/main.lock'",
        )]]);
        let (result, _) = run_converge(mock, 5).await;

        let error = result.unwrap_err();
        assert!(matches!(error, SyncError::LockContention(_)));
        assert!(error.is_retryable());
    }

    // ── Preflight and remote preparation ───────────────────────────

    #[tokio::test]
    async fn offline_preflight_makes_no_git_calls() {
        let mock = MockExecutor::new(vec![]);
        let (mut emitter, _stream) = progress_channel();
        let (options, user) = (SyncOptions::default(), user());
        let git = GitRunner::with_executor("/wiki", mock.clone());
        let mut machine = SyncMachine::new(&git, &user, &mut emitter, &options, false);

        assert!(matches!(machine.preflight().await, Err(SyncError::Offline)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn http_remote_without_token_is_missing_parameter() {
        let mock = MockExecutor::new(vec![
            ok("main\n"),
            fail(1, ""),
            ok("https://github.com/owner/wiki.git\n"),
        ]);
        let (mut emitter, stream) = progress_channel();
        let observer = tokio::spawn(stream.collect());
        let (options, user) = (SyncOptions::default(), user());
        let git = GitRunner::with_executor("/wiki", mock);
        let result = {
            let mut machine = SyncMachine::new(&git, &user, &mut emitter, &options, true);
            machine.prepare_remote(None).await
        };
        emitter.finish(Ok(())).await;

        assert!(matches!(result, Err(SyncError::MissingParameter("access_token"))));
        assert_eq!(observer.await.unwrap().steps(), vec![SyncStep::PreparingUserInfo]);
    }

    #[tokio::test]
    async fn missing_remote_is_added_from_url() {
        let mock = MockExecutor::new(vec![
            ok("main\n"),
            fail(1, ""),
            fail(2, "error: No such remote 'origin'"),
            ok(""),
            ok("main\n"),
        ]);
        let (mut emitter, stream) = progress_channel();
        let observer = tokio::spawn(stream.collect());
        let (options, user) = (SyncOptions::default(), user());
        let git = GitRunner::with_executor("/wiki", mock.clone());
        let result = {
            let mut machine = SyncMachine::new(&git, &user, &mut emitter, &options, true);
            machine.prepare_remote(Some("/srv/wiki.git")).await
        };
        emitter.finish(Ok(())).await;
        observer.await.unwrap();

        assert_eq!(result.unwrap(), remote());
        assert_eq!(mock.commands()[3], "remote add origin /srv/wiki.git");
    }

    #[tokio::test]
    async fn blank_user_name_is_missing_parameter() {
        let mock = MockExecutor::new(vec![]);
        let (mut emitter, _stream) = progress_channel();
        let options = SyncOptions::default();
        let user = UserInfo::new(" ", "alice@example.test");
        let git = GitRunner::with_executor("/wiki", mock);
        let mut machine = SyncMachine::new(&git, &user, &mut emitter, &options, true);

        // The unread stream's single slot absorbs the PreparingUserInfo step.
        let result = machine.prepare_remote(None).await;
        assert!(matches!(result, Err(SyncError::MissingParameter("user.name"))));
    }

    #[test]
    fn failure_detail_joins_stderr_and_stdout() {
        let result = CommandResult {
            success: false,
            code: Some(1),
            stdout: "CONFLICT\n".into(),
            stderr: "error: could not apply\n".into(),
        };
        assert_eq!(failure_detail(&result), "error: could not apply\nCONFLICT");
    }
}
