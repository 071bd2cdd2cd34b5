//! Git sync library.
//!
//! This crate keeps a working copy in step with its remote by:
//! - Resolving the repository and checking it is a git work tree
//! - Stashing local changes around a pull of the current branch
//! - Staging everything and committing with a timestamped message
//! - Pushing the branch, setting its upstream on first push

pub mod config;
pub mod constants;
pub mod git;
pub mod output;
pub mod sync;
