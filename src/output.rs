//! Progress bars, colored output, prompts and summary formatting.
//!
//! This module provides visual feedback during syncs including
//! spinners, progress bars, the commit confirmation prompt and
//! colored summary output.

use crate::config::Config;
use crate::constants::PROGRESS_TICK_MS;
use crate::sync::{self, PullStatus, SyncCallbacks, SyncOutcome, SyncResult, SyncStep, SyncSuccess};
use colored::{ColoredString, Colorize};
use dialoguer::Confirm;
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Maximum number of changed files listed in the confirmation prompt.
const MAX_LISTED_FILES: usize = 10;

/// No-op callbacks for when progress tracking is not needed.
/// Commits are always confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpCallbacks;

impl SyncCallbacks for NoOpCallbacks {}

/// Prints a repository header in verbose mode.
pub fn print_repo_header(config: &Config, repo_name: &str) {
    if !config.is_verbose() {
        return;
    }
    eprintln!("\n{}", format!("[{}]", repo_name).white().bold());
}

/// Prints a step progress message in verbose mode.
pub fn print_step(config: &Config, step: &SyncStep) {
    if !config.is_verbose() {
        return;
    }
    eprintln!("  {}...", step.to_string().dimmed());
}

/// Prints completion status (verbose mode only).
pub fn print_completion_status(config: &Config, success: bool, error: Option<&str>) {
    if !config.is_verbose() {
        return;
    }
    if success {
        eprintln!("  {} completed successfully", "✓".green());
    } else if let Some(err) = error {
        eprintln!("  {} failed: {}", "✗".red(), err);
    }
}

/// Spinner for single repository syncs.
/// `None` when progress is hidden (quiet/verbose modes).
pub struct SingleRepoProgress {
    spinner: Option<ProgressBar>,
}

impl SingleRepoProgress {
    pub fn update(&self, step: &SyncStep) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(format_step_message(step));
        }
    }

    pub fn finish_success(&self, repo_name: &str) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(format!(
                "{} {} synced successfully",
                "✓".green(),
                repo_name
            ));
        }
    }

    pub fn finish_failed(&self, repo_name: &str, error: &str) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(format!("{} {} failed: {}", "✗".red(), repo_name, error));
        }
    }

    /// Runs `f` with the spinner hidden so it does not draw over a prompt.
    fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.spinner {
            Some(spinner) => spinner.suspend(f),
            None => f(),
        }
    }
}

/// Callbacks for single repository syncs.
/// Combines the spinner with verbose output and the commit prompt.
pub struct SingleRepoCallbacks {
    progress: SingleRepoProgress,
    config: Config,
}

impl SingleRepoCallbacks {
    pub fn new(progress: SingleRepoProgress, config: Config) -> Self {
        Self { progress, config }
    }

    /// Finish the spinner with a success/failure message.
    pub fn finish(&self, result: &SyncResult) {
        let repo_name = sync::repo_name(&result.path);

        match &result.outcome {
            SyncOutcome::Success(_) => self.progress.finish_success(repo_name),
            SyncOutcome::Failed(failure) => self.progress.finish_failed(repo_name, &failure.error),
        }
    }
}

impl SyncCallbacks for SingleRepoCallbacks {
    fn on_sync_start(&self, repo_name: &str) {
        print_repo_header(&self.config, repo_name);
    }

    fn on_step(&self, step: &SyncStep) {
        self.progress.update(step);
    }

    fn on_step_execute(&self, step: &SyncStep) {
        print_step(&self.config, step);
    }

    fn on_completion_status(&self, success: bool, error: Option<&str>) {
        print_completion_status(&self.config, success, error);
    }

    fn confirm_commit(
        &self,
        files: &[String],
        remote: &str,
        branch: &str,
    ) -> anyhow::Result<bool> {
        if !self.config.confirm {
            return Ok(true);
        }
        self.progress.suspend(|| {
            eprintln!("{}", format_changed_files(files));
            Confirm::new()
                .with_prompt(format!(
                    "Commit {} file(s) and push to {}/{}?",
                    files.len(),
                    remote,
                    branch
                ))
                .default(true)
                .interact()
                .context("Failed to read confirmation (is stdin a terminal?)")
        })
    }
}

/// Workspace-mode progress: one bar counting synced repositories, with a
/// line printed above it as each repository finishes.
#[derive(Clone)]
pub struct WorkspaceProgress {
    bar: ProgressBar,
    failed: Arc<AtomicUsize>,
}

impl WorkspaceProgress {
    pub fn create_repo_tracker(&self, config: &Config) -> RepoProgressTracker {
        RepoProgressTracker {
            workspace: self.clone(),
            config: config.clone(),
        }
    }

    pub fn mark_completed(&self, result: &SyncResult) {
        if !result.is_success() {
            let failed = self.failed.fetch_add(1, Ordering::Relaxed) + 1;
            self.bar.set_message(format!("({} failed)", failed).red().to_string());
        }
        self.bar.println(format_completion_line(result));
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Workspace callbacks for one repository.
pub struct RepoProgressTracker {
    workspace: WorkspaceProgress,
    config: Config,
}

impl SyncCallbacks for RepoProgressTracker {
    fn on_sync_start(&self, repo_name: &str) {
        print_repo_header(&self.config, repo_name);
    }

    fn on_step_execute(&self, step: &SyncStep) {
        print_step(&self.config, step);
    }

    fn on_complete(&self, result: &SyncResult) {
        self.workspace.mark_completed(result);
    }

    fn on_completion_status(&self, success: bool, error: Option<&str>) {
        print_completion_status(&self.config, success, error);
    }
}

fn format_completion_line(result: &SyncResult) -> String {
    let name = sync::repo_name(&result.path);
    match &result.outcome {
        SyncOutcome::Success(_) => format!("{} {}", "✓".green(), name),
        SyncOutcome::Failed(failure) => format!(
            "{} {} {}",
            "✗".red(),
            name,
            format!("(at {})", failure.step).dimmed()
        ),
    }
}

/// Creates a spinner-based progress tracker for single repository syncs.
/// No spinner in quiet or verbose mode.
#[must_use]
pub fn create_single_repo_progress(config: &Config) -> SingleRepoProgress {
    if config.is_quiet() || config.is_verbose() {
        return SingleRepoProgress { spinner: None };
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
    SingleRepoProgress {
        spinner: Some(spinner),
    }
}

/// Creates the workspace progress bar. Hidden in quiet or verbose mode.
#[must_use]
pub fn create_workspace_progress(total: usize, config: &Config) -> WorkspaceProgress {
    let bar = if config.is_quiet() || config.is_verbose() {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} synced {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
        bar
    };

    WorkspaceProgress {
        bar,
        failed: Arc::new(AtomicUsize::new(0)),
    }
}

pub fn print_working_dir(path: &Path, config: &Config) {
    if config.is_quiet() {
        return;
    }
    println!(
        "{} {}",
        "Working in:".cyan(),
        path.display().to_string().white().bold()
    )
}

pub fn print_workspace_start(count: usize, config: &Config) {
    if config.is_quiet() {
        return;
    }
    if count == 0 {
        print_no_repos()
    } else {
        println!(
            "{}",
            format!("Starting in workspace mode with {} repositories", count).dimmed()
        )
    }
}

pub fn print_summary(results: &[SyncResult], duration: Duration, config: &Config) {
    if config.is_quiet() {
        print_quiet_summary(results);
    } else {
        print_normal_summary(results, duration);
    }
}

fn print_quiet_summary(results: &[SyncResult]) {
    let synced = results.iter().filter(|r| r.is_success()).count();

    println!("{}/{} repositories synced", synced, results.len());

    for result in results {
        if let SyncOutcome::Failed(failure) = &result.outcome {
            eprintln!("error: {}: {}", result.path.display(), failure.error);
        }
    }
}

fn print_normal_summary(results: &[SyncResult], duration: Duration) {
    print_section("Summary");
    let (successes, failures): (Vec<_>, Vec<_>) = results.iter().partition(|r| r.is_success());

    print_successes(&successes);
    print_failures(&failures);

    println!(
        "{}: {}/{} repos in {}",
        "Total".white().bold(),
        successes.len(),
        results.len(),
        format_duration(duration)
    );
}

fn print_no_repos() {
    println!("{}", "No git repositories found".yellow().bold())
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f32())
}

fn print_section(title: &str) {
    let line = "=".repeat(50).cyan().dimmed();
    let padding = 50usize.saturating_sub(title.len()) / 2;
    let centered = format!("{:>width$}", title, width = padding + title.len());
    println!("\n{}\n{}\n{}\n", line, centered.cyan().bold(), line);
}

fn print_successes(successes: &[&SyncResult]) {
    if successes.is_empty() {
        return;
    }
    println!(
        "{}",
        format!("Succeeded ({}):", successes.len()).green().bold()
    );

    for result in successes {
        if let SyncOutcome::Success(success) = &result.outcome {
            println!(
                "  {} {} {} in {}",
                "OK".green().bold(),
                result.path.display().to_string().white(),
                format!("{}/{}", success.remote, success.branch).cyan(),
                format_duration(result.duration).dimmed(),
            );
            for line in describe_success(success) {
                println!("     {}", line);
            }
        }
    }
    println!();
}

/// One line per workflow phase: pull, stash, commit and push.
fn describe_success(success: &SyncSuccess) -> Vec<ColoredString> {
    let mut lines = Vec::new();

    lines.push(match success.pull {
        PullStatus::Pulled => "pulled latest changes".normal(),
        PullStatus::NoRemoteBranch => "no remote branch yet, pull skipped".dimmed(),
    });

    if success.had_stash {
        lines.push("local changes stashed and restored".yellow());
    }

    lines.push(match &success.commit {
        Some(message) => format!("committed \"{}\"", message).normal(),
        None if success.pushed => "nothing to commit".dimmed(),
        None => "commit declined".yellow(),
    });

    lines.push(if success.pushed {
        "pushed".green()
    } else {
        "push skipped".yellow()
    });

    lines
}

fn print_failures(failures: &[&SyncResult]) {
    if failures.is_empty() {
        return;
    }

    println!("{}", format!("Failed ({}):", failures.len()).red().bold());

    for result in failures {
        if let SyncOutcome::Failed(failure) = &result.outcome {
            println!(
                "  {} {} {} in {}",
                "FAIL".red().bold(),
                result.path.display().to_string().white(),
                format!("at {}: {}", failure.step, failure.error).red(),
                format_duration(result.duration).dimmed(),
            );
        }
    }
    println!();
}

fn format_changed_files(files: &[String]) -> String {
    let mut lines: Vec<String> = files
        .iter()
        .take(MAX_LISTED_FILES)
        .map(|f| format!("  {}", f))
        .collect();
    if files.len() > MAX_LISTED_FILES {
        lines.push(format!("  ... and {} more", files.len() - MAX_LISTED_FILES));
    }
    lines.join("\n")
}

fn format_step_message(step: &SyncStep) -> &'static str {
    match step {
        SyncStep::Started => "Starting sync...",
        SyncStep::DetectingBranch => "Detecting current branch...",
        SyncStep::CheckingRemote => "Checking remote branch...",
        SyncStep::CheckingChanges => "Checking for uncommitted changes...",
        SyncStep::Stashing => "Stashing local changes...",
        SyncStep::Pulling => "Pulling latest changes...",
        SyncStep::PoppingStash => "Restoring stashed changes...",
        SyncStep::Staging => "Staging all changes...",
        SyncStep::Confirming => "Waiting for confirmation...",
        SyncStep::Committing => "Committing...",
        SyncStep::Pushing => "Pushing to remote...",
        SyncStep::Completed => "Completed",
    }
}
