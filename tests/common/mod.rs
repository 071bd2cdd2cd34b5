//! Test infrastructure for git-sync integration tests.
#![allow(dead_code)]

use anyhow::Result;
use git_sync_rust::config::{Config, Verbosity};
use git_sync_rust::git::run_git;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Quiet config with a timeout that tolerates slow CI machines.
pub fn test_config() -> Config {
    Config {
        verbosity: Verbosity::Quiet,
        timeout: Duration::from_secs(60),
        ..Config::default()
    }
}

/// Runs git in `dir`, panicking with the git error on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    run_git(dir, &test_config(), args)
        .unwrap_or_else(|e| panic!("git {} failed: {:#}", args.join(" "), e))
}

fn configure_identity(path: &Path) -> Result<()> {
    let config = test_config();
    run_git(path, &config, &["config", "user.email", "test@example.com"])?;
    run_git(path, &config, &["config", "user.name", "Test User"])?;
    run_git(path, &config, &["config", "commit.gpgsign", "false"])?;
    Ok(())
}

/// A temporary git repository for testing, optionally with a bare remote.
/// Automatically cleaned up when dropped.
pub struct TestRepo {
    _temp_dir: Option<TempDir>,
    path: PathBuf,
    branch: String,
    remote: Option<TempDir>,
}

impl TestRepo {
    /// Creates a new test repository with an initial commit on the master branch.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        let mut repo = Self::init_at(path, "master")?;
        repo._temp_dir = Some(temp_dir);
        Ok(repo)
    }

    /// Creates a test repository whose `origin` is a fresh bare repository.
    /// `branch` defaults to `master`.
    pub fn with_remote(branch: Option<&str>) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        let mut repo = Self::init_at(path, branch.unwrap_or("master"))?;
        repo._temp_dir = Some(temp_dir);
        repo.attach_remote()?;
        Ok(repo)
    }

    /// Creates a repository with no commits yet whose `origin` is an empty bare repository.
    pub fn unborn_with_remote(branch: &str) -> Result<Self> {
        let config = test_config();
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        run_git(&path, &config, &["init", "-b", branch])?;
        configure_identity(&path)?;

        let remote_dir = TempDir::new()?;
        run_git(remote_dir.path(), &config, &["init", "--bare", "-b", branch])?;
        let url = remote_dir.path().to_string_lossy().to_string();
        run_git(&path, &config, &["remote", "add", "origin", &url])?;

        Ok(Self {
            _temp_dir: Some(temp_dir),
            path,
            branch: branch.to_string(),
            remote: Some(remote_dir),
        })
    }

    /// Creates a repository with a remote at `parent/name`, for workspace tests.
    /// The directory itself is owned by the caller's workspace.
    pub fn with_remote_in(parent: &Path, name: &str) -> Result<Self> {
        let path = parent.join(name);
        std::fs::create_dir_all(&path)?;
        let mut repo = Self::init_at(path, "master")?;
        repo.attach_remote()?;
        Ok(repo)
    }

    fn init_at(path: PathBuf, branch: &str) -> Result<Self> {
        let config = test_config();
        run_git(&path, &config, &["init", "-b", branch])?;
        configure_identity(&path)?;

        std::fs::write(path.join("README.md"), "# Test Repo\n")?;
        run_git(&path, &config, &["add", "README.md"])?;
        run_git(&path, &config, &["commit", "-m", "Initial commit"])?;

        Ok(Self {
            _temp_dir: None,
            path,
            branch: branch.to_string(),
            remote: None,
        })
    }

    fn attach_remote(&mut self) -> Result<()> {
        let config = test_config();
        let remote_dir = TempDir::new()?;
        run_git(
            remote_dir.path(),
            &config,
            &["init", "--bare", "-b", &self.branch],
        )?;

        let url = remote_dir.path().to_string_lossy().to_string();
        run_git(&self.path, &config, &["remote", "add", "origin", &url])?;
        run_git(&self.path, &config, &["push", "-u", "origin", &self.branch])?;

        self.remote = Some(remote_dir);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remote_path(&self) -> &Path {
        self.remote
            .as_ref()
            .map(|r| r.path())
            .expect("test repo has no remote")
    }

    pub fn create_branch(&self, name: &str) -> Result<()> {
        run_git(&self.path, &test_config(), &["branch", name])?;
        Ok(())
    }

    pub fn checkout(&self, name: &str) -> Result<()> {
        run_git(&self.path, &test_config(), &["checkout", name])?;
        Ok(())
    }

    pub fn checkout_new(&self, name: &str) -> Result<()> {
        run_git(&self.path, &test_config(), &["checkout", "-b", name])?;
        Ok(())
    }

    /// Modifies a tracked file without committing.
    pub fn make_dirty(&self) -> Result<()> {
        std::fs::write(self.path.join("README.md"), "# Test Repo\n\nLocal edit\n")?;
        Ok(())
    }

    pub fn make_untracked(&self) -> Result<()> {
        std::fs::write(self.path.join("untracked.txt"), "untracked\n")?;
        Ok(())
    }

    /// Writes and commits a file locally without pushing it.
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> Result<()> {
        let config = test_config();
        std::fs::write(self.path.join(name), content)?;
        run_git(&self.path, &config, &["add", name])?;
        run_git(&self.path, &config, &["commit", "-m", message])?;
        Ok(())
    }

    /// Commits a nested repository as a gitlink and pushes it, so that later edits
    /// inside it show up in `git status` but are never staged by `git add --all`.
    pub fn add_embedded_repo(&self, name: &str) -> Result<()> {
        let config = test_config();
        let nested = self.path.join(name);
        std::fs::create_dir_all(&nested)?;
        run_git(&nested, &config, &["init", "-b", "master"])?;
        configure_identity(&nested)?;
        std::fs::write(nested.join("inner.txt"), "inner\n")?;
        run_git(&nested, &config, &["add", "inner.txt"])?;
        run_git(&nested, &config, &["commit", "-m", "Inner commit"])?;

        run_git(&self.path, &config, &["add", name])?;
        run_git(&self.path, &config, &["commit", "-m", "Add embedded repo"])?;
        run_git(&self.path, &config, &["push", "origin", &self.branch])?;
        Ok(())
    }

    pub fn has_stash(&self) -> Result<bool> {
        let output = run_git(&self.path, &test_config(), &["stash", "list"])?;
        Ok(!output.is_empty())
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.path.join(name).exists()
    }

    pub fn read_file(&self, name: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.path.join(name))?)
    }

    pub fn remove_remote(&self) {
        let _ = run_git(&self.path, &test_config(), &["remote", "remove", "origin"]);
    }

    pub fn break_remote(&self) -> Result<()> {
        run_git(
            &self.path,
            &test_config(),
            &["remote", "set-url", "origin", "/no/such/remote"],
        )?;
        Ok(())
    }

    /// Subject of the latest local commit.
    pub fn head_message(&self) -> Result<String> {
        run_git(&self.path, &test_config(), &["log", "-1", "--format=%s"])
    }

    /// Subject of the latest commit of `branch` on the bare remote.
    pub fn remote_message(&self, branch: &str) -> Result<String> {
        run_git(
            self.remote_path(),
            &test_config(),
            &["log", "-1", "--format=%s", branch],
        )
    }

    pub fn remote_has_branch(&self, branch: &str) -> Result<bool> {
        let refname = format!("refs/heads/{}", branch);
        let output = run_git(
            self.remote_path(),
            &test_config(),
            &["for-each-ref", &refname],
        )?;
        Ok(!output.is_empty())
    }

    /// Pushes a commit to the remote from a second clone, as a collaborator would.
    pub fn push_upstream_change(&self, name: &str, content: &str) -> Result<()> {
        let config = test_config();
        let other = TempDir::new()?;
        let url = self.remote_path().to_string_lossy().to_string();
        run_git(other.path(), &config, &["clone", &url, "clone"])?;

        let clone = other.path().join("clone");
        configure_identity(&clone)?;
        run_git(&clone, &config, &["checkout", &self.branch])?;
        std::fs::write(clone.join(name), content)?;
        run_git(&clone, &config, &["add", name])?;
        run_git(&clone, &config, &["commit", "-m", "Upstream change"])?;
        run_git(&clone, &config, &["push", "origin", &self.branch])?;
        Ok(())
    }
}
