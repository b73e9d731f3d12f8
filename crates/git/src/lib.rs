//! Thin wrapper around the `git` binary.
//!
//! Remote catalogs can be mirrored into a local clone instead of being read
//! through the hosted repository API; this crate provides the clone/pull
//! primitives behind the [`GitClient`] trait so tests can substitute a fake.

pub mod client;
pub mod error;

pub use {
    client::{GitCli, GitClient, is_git_repo},
    error::{Error, Result},
};
