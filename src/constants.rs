//! Application-wide constants.
//!
//! Centralized configuration values to avoid magic numbers throughout the codebase.

use std::time::Duration;

/// Default timeout for individual git operations (in seconds).
/// Pulls and pushes go over the network, so this is generous.
const DEFAULT_GIT_TIMEOUT_SECS: u64 = 120;

/// Returns the git command timeout.
///
/// Can be customized via the GIT_SYNC_TIMEOUT environment variable (in seconds).
/// Falls back to 120 seconds if not set or invalid.
///
/// Example: `GIT_SYNC_TIMEOUT=300 git-sync`
pub fn git_timeout() -> Duration {
    parse_timeout(std::env::var("GIT_SYNC_TIMEOUT").ok().as_deref())
}

fn parse_timeout(value: Option<&str>) -> Duration {
    value
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
}

/// Remote used when none is given on the command line.
pub const DEFAULT_REMOTE: &str = "origin";

/// Prefix of the generated commit message.
pub const DEFAULT_MESSAGE_PREFIX: &str = "Auto-sync";

/// strftime format of the timestamp appended to commit messages.
pub const COMMIT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Message attached to the stash created around a pull.
pub const STASH_MESSAGE: &str = "git-sync: local changes before pull";

/// Number of threads for workspace syncs.
/// Every sync talks to a remote, so this is kept modest to avoid hammering it.
pub const DEFAULT_WORKSPACE_JOBS: usize = 8;

/// Polling interval while waiting on a git child process.
pub const GIT_POLL_INTERVAL_MS: u64 = 20;

/// Progress bar tick interval in milliseconds.
/// Controls how often the spinner/bar animates.
pub const PROGRESS_TICK_MS: u64 = 80;

/// Git directory name used to detect repositories.
pub const GIT_DIR: &str = ".git";

/// Default name used when a repository name cannot be determined from its path.
pub const DEFAULT_REPO_NAME: &str = "repository";
