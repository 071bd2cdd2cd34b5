//! Git command wrappers.
//!
//! This module provides a thin wrapper around git CLI commands,
//! handling command execution, timeouts and error formatting.

use crate::config::Config;
use crate::constants::{GIT_POLL_INTERVAL_MS, STASH_MESSAGE};
use anyhow::Context;
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Callback invoked with the arguments of every git command before it runs.
pub type GitLogger = fn(&[&str]);

/// Prints the git command line to stderr.
pub fn verbose_logger(args: &[&str]) {
    eprintln!("    {}", format!("$ git {}", args.join(" ")).dimmed());
}

pub fn no_op_logger(_args: &[&str]) {}

/// What HEAD points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Branch(String),
    Detached(String),
}

/// Runs `git <args>` inside `repo` and returns its trimmed stdout.
///
/// The child gets no stdin and credential prompts are disabled, so a git
/// that would block on input fails instead. The child is killed once
/// `config.timeout` elapses.
pub fn run_git(repo: &Path, config: &Config, args: &[&str]) -> anyhow::Result<String> {
    let mut child = Command::new("git")
        .current_dir(repo)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn git command: git {}", args.join(" ")))?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + config.timeout;
    let status = loop {
        if let Some(status) = child
            .try_wait()
            .context("Failed to wait for git command")?
        {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            anyhow::bail!(
                "git {} timed out after {}s",
                args.join(" "),
                config.timeout.as_secs()
            );
        }
        thread::sleep(Duration::from_millis(GIT_POLL_INTERVAL_MS));
    };

    let stdout = collect(stdout);
    let stderr = collect(stderr);

    if status.success() {
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    } else {
        // Merge conflicts and hook output land on stdout, so report both streams.
        let detail = [&stderr, &stdout]
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        anyhow::bail!("git {} failed: {}", args.join(" "), detail)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn run_logged(
    repo: &Path,
    config: &Config,
    args: &[&str],
    logger: GitLogger,
) -> anyhow::Result<String> {
    logger(args);
    run_git(repo, config, args)
}

const FORBIDDEN_NAME_CHARS: &[char] = &[
    ';', '&', '|', '$', '`', '<', '>', '(', ')', '\\', '"', '\'', '*', '?', '[', '~', '^', ':',
];

fn validate_name(kind: &str, name: &str) -> anyhow::Result<()> {
    if name.is_empty()
        || name.starts_with('-')
        || name.chars().any(|c| c.is_whitespace() || c.is_control())
        || name.contains(FORBIDDEN_NAME_CHARS)
    {
        anyhow::bail!("Invalid {} name: {:?}", kind, name);
    }
    Ok(())
}

fn validate_branch_name(branch: &str) -> anyhow::Result<()> {
    validate_name("branch", branch)
}

fn validate_remote_name(remote: &str) -> anyhow::Result<()> {
    validate_name("remote", remote)
}

fn validate_commit_message(message: &str) -> anyhow::Result<()> {
    if message.trim().is_empty() || message.contains('\0') {
        anyhow::bail!("Invalid commit message: {:?}", message);
    }
    Ok(())
}

pub fn is_inside_work_tree(dir: &Path, config: &Config, logger: GitLogger) -> bool {
    run_logged(dir, config, &["rev-parse", "--is-inside-work-tree"], logger)
        .map(|output| output == "true")
        .unwrap_or(false)
}

pub fn repo_root(dir: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<PathBuf> {
    run_logged(dir, config, &["rev-parse", "--show-toplevel"], logger)
        .map(PathBuf::from)
        .context("Failed to resolve repository root")
}

/// Name of the checked-out branch. Works on a branch with no commits yet;
/// fails on a detached HEAD.
pub fn get_current_branch(
    repo: &Path,
    config: &Config,
    logger: GitLogger,
) -> anyhow::Result<String> {
    run_logged(repo, config, &["symbolic-ref", "--quiet", "--short", "HEAD"], logger)
        .context("Failed to get current branch")
}

pub fn head_commit(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<String> {
    run_logged(repo, config, &["rev-parse", "--short", "HEAD"], logger)
        .context("Failed to get HEAD commit")
}

pub fn get_current_head(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<Head> {
    match get_current_branch(repo, config, logger) {
        Ok(branch) => Ok(Head::Branch(branch)),
        Err(not_symbolic) => head_commit(repo, config, logger)
            .map(Head::Detached)
            .map_err(|_| not_symbolic),
    }
}

/// Paths reported by `git status --porcelain`, one entry per line.
pub fn changed_files(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<Vec<String>> {
    run_logged(repo, config, &["status", "--porcelain"], logger)
        .map(|output| output.lines().map(str::to_string).collect())
        .context("Failed to check for uncommitted changes")
}

/// Paths staged in the index relative to HEAD (or all of them before the first commit).
pub fn staged_files(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<Vec<String>> {
    run_logged(repo, config, &["diff", "--cached", "--name-only"], logger)
        .map(|output| output.lines().map(str::to_string).collect())
        .context("Failed to list staged changes")
}

pub fn has_uncommitted_changes(
    repo: &Path,
    config: &Config,
    logger: GitLogger,
) -> anyhow::Result<bool> {
    changed_files(repo, config, logger).map(|files| !files.is_empty())
}

/// Stashes tracked and untracked changes. Returns `false` when there was nothing to stash.
pub fn stash(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<bool> {
    let output = run_logged(
        repo,
        config,
        &["stash", "push", "--include-untracked", "-m", STASH_MESSAGE],
        logger,
    )
    .context("Failed to stash changes")?;
    Ok(!output.contains("No local changes to save"))
}

pub fn stash_pop(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<()> {
    run_logged(repo, config, &["stash", "pop"], logger).context("Failed to pop stash")?;
    Ok(())
}

pub fn remote_exists(
    repo: &Path,
    config: &Config,
    remote: &str,
    logger: GitLogger,
) -> anyhow::Result<bool> {
    validate_remote_name(remote)?;
    Ok(run_logged(repo, config, &["remote", "get-url", remote], logger).is_ok())
}

pub fn remote_branch_exists(
    repo: &Path,
    config: &Config,
    remote: &str,
    branch: &str,
    logger: GitLogger,
) -> anyhow::Result<bool> {
    validate_remote_name(remote)?;
    validate_branch_name(branch)?;
    let refname = format!("refs/heads/{}", branch);
    run_logged(repo, config, &["ls-remote", "--heads", remote, &refname], logger)
        .map(|output| !output.is_empty())
        .with_context(|| format!("Failed to query remote '{}'", remote))
}

pub fn pull(
    repo: &Path,
    config: &Config,
    remote: &str,
    branch: &str,
    rebase: bool,
    logger: GitLogger,
) -> anyhow::Result<()> {
    validate_remote_name(remote)?;
    validate_branch_name(branch)?;
    let mode = if rebase { "--rebase" } else { "--no-rebase" };
    run_logged(
        repo,
        config,
        &["pull", mode, "--no-edit", remote, branch],
        logger,
    )
    .with_context(|| format!("Failed to pull '{}' from '{}'", branch, remote))?;
    Ok(())
}

pub fn add_all(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<()> {
    run_logged(repo, config, &["add", "--all"], logger).context("Failed to stage changes")?;
    Ok(())
}

pub fn commit(
    repo: &Path,
    config: &Config,
    message: &str,
    logger: GitLogger,
) -> anyhow::Result<()> {
    validate_commit_message(message)?;
    run_logged(repo, config, &["commit", "-m", message], logger)
        .context("Failed to commit changes")?;
    Ok(())
}

pub fn has_upstream(repo: &Path, config: &Config, logger: GitLogger) -> bool {
    run_logged(
        repo,
        config,
        &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"],
        logger,
    )
    .is_ok()
}

pub fn push(
    repo: &Path,
    config: &Config,
    remote: &str,
    branch: &str,
    set_upstream: bool,
    logger: GitLogger,
) -> anyhow::Result<()> {
    validate_remote_name(remote)?;
    validate_branch_name(branch)?;
    let mut args = vec!["push"];
    if set_upstream {
        args.push("--set-upstream");
    }
    args.extend([remote, branch]);
    run_logged(repo, config, &args, logger)
        .with_context(|| format!("Failed to push '{}' to '{}'", branch, remote))?;
    Ok(())
}
