//! GitHub access for remote skill catalogs.
//!
//! Only the two operations the catalog walker needs are modelled: listing a
//! directory and reading a file. Both sit behind [`RepositoryClient`] so the
//! walker can be exercised against an in-memory tree.

pub mod client;
pub mod error;
pub mod repo;

pub use {
    client::{ContentEntry, EntryKind, GithubClient, RepositoryClient},
    error::{Error, Result},
    repo::RepoRef,
};
