//! Repository resolution, the sync workflow and its result types.

use crate::config::Config;
use crate::constants::{COMMIT_TIMESTAMP_FORMAT, DEFAULT_REPO_NAME, GIT_DIR};
use crate::git::{self, GitLogger, Head};
use anyhow::Context;
use chrono::{DateTime, TimeZone};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStep {
    Started,
    DetectingBranch,
    CheckingRemote,
    CheckingChanges,
    Stashing,
    Pulling,
    PoppingStash,
    Staging,
    Confirming,
    Committing,
    Pushing,
    Completed,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStep::Started => "Started",
            SyncStep::DetectingBranch => "Detecting branch",
            SyncStep::CheckingRemote => "Checking remote",
            SyncStep::CheckingChanges => "Checking changes",
            SyncStep::Stashing => "Stashing",
            SyncStep::Pulling => "Pulling",
            SyncStep::PoppingStash => "Popping stash",
            SyncStep::Staging => "Staging",
            SyncStep::Confirming => "Confirming",
            SyncStep::Committing => "Committing",
            SyncStep::Pushing => "Pushing",
            SyncStep::Completed => "Completed",
        };
        f.write_str(name)
    }
}

/// Hooks for observing a sync as it runs.
///
/// Every method has a default so implementors only override what they display.
pub trait SyncCallbacks {
    fn on_sync_start(&self, _repo_name: &str) {}

    /// Progress update, used by spinners.
    fn on_step(&self, _step: &SyncStep) {}

    /// Called right before a step runs, used by verbose output.
    fn on_step_execute(&self, _step: &SyncStep) {}

    fn on_complete(&self, _result: &SyncResult) {}

    fn on_completion_status(&self, _success: bool, _error: Option<&str>) {}

    /// Asked once changes are staged. `Ok(false)` skips the commit and the push;
    /// an error fails the sync.
    fn confirm_commit(
        &self,
        _files: &[String],
        _remote: &str,
        _branch: &str,
    ) -> anyhow::Result<bool> {
        Ok(true)
    }
}

#[derive(Debug)]
pub struct SyncResult {
    pub path: PathBuf,
    pub outcome: SyncOutcome,
    pub duration: Duration,
}

impl SyncResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Success(_))
    }
}

#[derive(Debug)]
struct SyncError {
    source: anyhow::Error,
    step: SyncStep,
}

/// How the pull step went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStatus {
    Pulled,
    /// The branch does not exist on the remote yet.
    NoRemoteBranch,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SyncSuccess {
    pub branch: String,
    pub remote: String,
    pub pull: PullStatus,
    pub had_stash: bool,
    /// Message of the commit that was created, if any.
    pub commit: Option<String>,
    pub pushed: bool,
}

#[derive(Debug)]
pub struct SyncFailure {
    pub error: String,
    pub step: SyncStep,
}

#[derive(Debug)]
pub enum SyncOutcome {
    Success(SyncSuccess),
    Failed(SyncFailure),
}

/// Display name for a repository path.
pub fn repo_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_REPO_NAME)
}

/// Resolves the directory to sync and checks that it is a git work tree.
///
/// Uses `path` when given, otherwise the current working directory.
/// Returns the top level of the repository containing it.
pub fn resolve_repo_dir(path: Option<&Path>, config: &Config) -> anyhow::Result<PathBuf> {
    let dir = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    if !dir.is_dir() {
        anyhow::bail!("{} does not exist or is not a directory", dir.display());
    }

    let logger = config.git_logger();
    if !git::is_inside_work_tree(&dir, config, logger) {
        anyhow::bail!("{} is not a git repository", dir.display());
    }

    git::repo_root(&dir, config, logger)
}

fn is_git_repo(path: &Path) -> bool {
    // `.git` is a file in worktrees and submodules.
    path.join(GIT_DIR).exists()
}

/// Finds git repositories directly under `path`, sorted by path.
pub fn find_git_repos(path: &Path) -> Vec<PathBuf> {
    let mut repos: Vec<PathBuf> = std::fs::read_dir(path)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && is_git_repo(p))
        .collect();
    repos.sort();
    repos
}

/// Builds the generated commit message, e.g. `Auto-sync: 2024-05-01 09:30:00`.
pub fn commit_message<Tz>(prefix: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("{}: {}", prefix, now.format(COMMIT_TIMESTAMP_FORMAT))
}

fn at_step<T>(step: SyncStep, result: anyhow::Result<T>) -> Result<T, SyncError> {
    result.map_err(|e| SyncError { source: e, step })
}

/// Runs the full sync for one repository and reports how it went.
pub fn sync<C: SyncCallbacks>(path: &Path, callbacks: &C, config: &Config) -> SyncResult {
    let start = Instant::now();
    callbacks.on_sync_start(repo_name(path));

    let outcome = match do_sync(path, callbacks, config) {
        Ok(success) => {
            callbacks.on_completion_status(true, None);
            SyncOutcome::Success(success)
        }
        Err(e) => {
            let error = format!("{:#}", e.source);
            callbacks.on_completion_status(false, Some(&error));
            SyncOutcome::Failed(SyncFailure {
                error,
                step: e.step,
            })
        }
    };

    let result = SyncResult {
        path: path.to_path_buf(),
        outcome,
        duration: start.elapsed(),
    };
    callbacks.on_complete(&result);
    result
}

fn enter<C: SyncCallbacks>(callbacks: &C, step: SyncStep) -> SyncStep {
    callbacks.on_step(&step);
    callbacks.on_step_execute(&step);
    step
}

fn do_sync<C: SyncCallbacks>(
    path: &Path,
    callbacks: &C,
    config: &Config,
) -> Result<SyncSuccess, SyncError> {
    let logger = config.git_logger();
    let remote = config.remote.as_str();

    callbacks.on_step(&SyncStep::Started);

    let step = enter(callbacks, SyncStep::DetectingBranch);
    let branch = match at_step(step.clone(), git::get_current_head(path, config, logger))? {
        Head::Branch(name) => name,
        Head::Detached(sha) => {
            return Err(SyncError {
                source: anyhow::anyhow!("HEAD is detached at {}; check out a branch first", sha),
                step,
            });
        }
    };

    let step = enter(callbacks, SyncStep::CheckingRemote);
    if !at_step(step.clone(), git::remote_exists(path, config, remote, logger))? {
        return Err(SyncError {
            source: anyhow::anyhow!("remote '{}' is not configured", remote),
            step,
        });
    }
    let remote_has_branch = at_step(
        step,
        git::remote_branch_exists(path, config, remote, &branch, logger),
    )?;

    let (pull, had_stash) = if remote_has_branch {
        let had_stash = pull_with_stash(path, callbacks, config, &branch, logger)?;
        (PullStatus::Pulled, had_stash)
    } else {
        (PullStatus::NoRemoteBranch, false)
    };

    let step = enter(callbacks, SyncStep::Staging);
    at_step(step.clone(), git::add_all(path, config, logger))?;
    let staged = at_step(step, git::staged_files(path, config, logger))?;

    let confirmed = if staged.is_empty() {
        true
    } else {
        let step = enter(callbacks, SyncStep::Confirming);
        at_step(step, callbacks.confirm_commit(&staged, remote, &branch))?
    };

    if !confirmed {
        callbacks.on_step(&SyncStep::Completed);
        return Ok(SyncSuccess {
            branch,
            remote: remote.to_string(),
            pull,
            had_stash,
            commit: None,
            pushed: false,
        });
    }

    let commit = if staged.is_empty() {
        None
    } else {
        let step = enter(callbacks, SyncStep::Committing);
        let message = commit_message(&config.message_prefix, &chrono::Local::now());
        at_step(step, git::commit(path, config, &message, logger))?;
        Some(message)
    };

    let step = enter(callbacks, SyncStep::Pushing);
    let set_upstream = !git::has_upstream(path, config, logger);
    at_step(
        step,
        git::push(path, config, remote, &branch, set_upstream, logger),
    )?;

    callbacks.on_step(&SyncStep::Completed);

    Ok(SyncSuccess {
        branch,
        remote: remote.to_string(),
        pull,
        had_stash,
        commit,
        pushed: true,
    })
}

/// Stashes local changes if needed, pulls, and restores the stash.
/// Returns whether a stash was created.
fn pull_with_stash<C: SyncCallbacks>(
    path: &Path,
    callbacks: &C,
    config: &Config,
    branch: &str,
    logger: GitLogger,
) -> Result<bool, SyncError> {
    let step = enter(callbacks, SyncStep::CheckingChanges);
    let is_dirty = at_step(step, git::has_uncommitted_changes(path, config, logger))?;

    let had_stash = if is_dirty {
        let step = enter(callbacks, SyncStep::Stashing);
        at_step(step, git::stash(path, config, logger))?
    } else {
        false
    };

    let step = enter(callbacks, SyncStep::Pulling);
    let pulled = git::pull(path, config, &config.remote, branch, config.rebase, logger);
    if had_stash {
        at_step(
            step,
            pulled.context("local changes are still stashed; run `git stash pop` once resolved"),
        )?;
    } else {
        at_step(step, pulled)?;
    }

    if had_stash {
        let step = enter(callbacks, SyncStep::PoppingStash);
        at_step(
            step,
            git::stash_pop(path, config, logger)
                .context("resolve the conflicts; the stash entry was kept"),
        )?;
    }

    Ok(had_stash)
}

/// Syncs many repositories in parallel on `config.jobs` threads.
///
/// Results come back in the same order as `repos`.
pub fn sync_workspace<C, F>(repos: &[PathBuf], make_callbacks: F, config: &Config) -> Vec<SyncResult>
where
    C: SyncCallbacks,
    F: Fn(&Path) -> C + Sync,
{
    let run = || -> Vec<SyncResult> {
        repos
            .par_iter()
            .map(|repo| {
                let callbacks = make_callbacks(repo.as_path());
                sync(repo, &callbacks, config)
            })
            .collect()
    };

    match rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs.max(1))
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(_) => run(),
    }
}
