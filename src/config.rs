//! Configuration types for CLI verbosity and sync options.

use crate::constants::{self, DEFAULT_MESSAGE_PREFIX, DEFAULT_REMOTE, DEFAULT_WORKSPACE_JOBS};
use crate::git::{self, GitLogger};
use std::time::Duration;

/// Runtime configuration derived from CLI arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Controls the verbosity level of CLI output.
    pub verbosity: Verbosity,
    /// Remote to pull from and push to.
    pub remote: String,
    /// Pull with `--rebase` instead of merging.
    pub rebase: bool,
    /// Prefix of the generated commit message.
    pub message_prefix: String,
    /// Upper bound for a single git invocation.
    pub timeout: Duration,
    /// Ask before committing and pushing.
    pub confirm: bool,
    /// Worker threads for workspace mode.
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            remote: DEFAULT_REMOTE.to_string(),
            rebase: false,
            message_prefix: DEFAULT_MESSAGE_PREFIX.to_string(),
            timeout: constants::git_timeout(),
            confirm: false,
            jobs: DEFAULT_WORKSPACE_JOBS,
        }
    }
}

impl Config {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Returns the appropriate git logger based on verbosity settings.
    ///
    /// Config only picks which logger function to use; the loggers
    /// themselves live in the git module.
    #[must_use]
    pub fn git_logger(&self) -> GitLogger {
        if self.is_verbose() {
            git::verbose_logger
        } else {
            git::no_op_logger
        }
    }
}

/// Verbosity level for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// Maps the mutually exclusive `--quiet`/`--verbose` flags to a level.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (_, true) => Verbosity::Verbose,
            _ => Verbosity::Normal,
        }
    }
}
