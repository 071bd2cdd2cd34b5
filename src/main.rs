use clap::Parser;
use clap::builder::RangedU64ValueParser;
use git_sync_rust::config::{Config, Verbosity};
use git_sync_rust::constants::{
    self, DEFAULT_MESSAGE_PREFIX, DEFAULT_REMOTE, DEFAULT_WORKSPACE_JOBS,
};
use git_sync_rust::output;
use git_sync_rust::sync::{self, SyncResult};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Pull, commit and push the current branch in one go.
///
/// Local changes are stashed around the pull, everything is staged and
/// committed with a timestamped message, then the branch is pushed.
#[derive(Debug, Parser)]
#[command(name = "git-sync", version, about)]
struct Cli {
    /// Repository directory (defaults to the current directory)
    path: Option<PathBuf>,

    /// Remote to pull from and push to
    #[arg(short, long, default_value = DEFAULT_REMOTE, value_name = "NAME")]
    remote: String,

    /// Prefix of the generated commit message
    #[arg(short, long, default_value = DEFAULT_MESSAGE_PREFIX, value_name = "PREFIX")]
    message: String,

    /// Rebase local commits onto the remote branch instead of merging
    #[arg(long)]
    rebase: bool,

    /// Timeout for each git command in seconds [env: GIT_SYNC_TIMEOUT]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Ask before committing and pushing
    #[arg(short, long, conflicts_with = "workspace")]
    confirm: bool,

    /// Sync every repository directly under PATH
    #[arg(short, long)]
    workspace: bool,

    /// Number of repositories synced at once in workspace mode
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_WORKSPACE_JOBS,
        value_name = "N",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    jobs: usize,

    /// Only print the final count and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print every step and git command
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            verbosity: Verbosity::from_flags(self.quiet, self.verbose),
            remote: self.remote.clone(),
            rebase: self.rebase,
            message_prefix: self.message.clone(),
            timeout: self
                .timeout
                .map(Duration::from_secs)
                .unwrap_or_else(constants::git_timeout),
            confirm: self.confirm,
            jobs: self.jobs,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config();
    let start = Instant::now();

    let results = if cli.workspace {
        run_workspace(cli.path, &config)?
    } else {
        run_single(cli.path, &config)?
    };

    output::print_summary(&results, start.elapsed(), &config);

    if results.iter().any(|r| !r.is_success()) {
        std::process::exit(1);
    }
    Ok(())
}

fn run_single(path: Option<PathBuf>, config: &Config) -> anyhow::Result<Vec<SyncResult>> {
    let repo = sync::resolve_repo_dir(path.as_deref(), config)?;
    output::print_working_dir(&repo, config);

    let progress = output::create_single_repo_progress(config);
    let callbacks = output::SingleRepoCallbacks::new(progress, config.clone());
    let result = sync::sync(&repo, &callbacks, config);
    callbacks.finish(&result);

    Ok(vec![result])
}

fn run_workspace(path: Option<PathBuf>, config: &Config) -> anyhow::Result<Vec<SyncResult>> {
    let dir = match path {
        Some(p) => p,
        None => std::env::current_dir()?,
    };
    if !dir.is_dir() {
        anyhow::bail!("{} does not exist or is not a directory", dir.display());
    }
    output::print_working_dir(&dir, config);

    let repos = sync::find_git_repos(&dir);
    output::print_workspace_start(repos.len(), config);

    let progress = output::create_workspace_progress(repos.len(), config);
    let results = sync::sync_workspace(
        &repos,
        |_| progress.create_repo_tracker(config),
        config,
    );
    progress.finish();

    Ok(results)
}
