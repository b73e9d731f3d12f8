//! Where catalogs get their skills from.
//!
//! Every backing implements [`SkillRepository`]. Failures reading a single
//! candidate are logged and skipped; only failing to enumerate the root is
//! reported to the caller.

pub mod local;
pub mod mirror;
pub mod remote;

use async_trait::async_trait;

use crate::{error::FetchError, types::Skill};

pub use {
    local::{LocalRoot, LocalSkillRepository, RootKind},
    mirror::GitMirrorRepository,
    remote::RemoteSkillRepository,
};

/// Enumerates the skills offered by one source.
#[async_trait]
pub trait SkillRepository: Send + Sync {
    /// All skills, sorted by case-insensitive name.
    async fn fetch_all(&self) -> Result<Vec<Skill>, FetchError>;

    /// A single skill by directory name, if the source has one.
    async fn fetch(&self, id: &str) -> Result<Option<Skill>, FetchError>;
}

/// Run blocking filesystem work off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, FetchError>
where
    F: FnOnce() -> Result<T, FetchError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FetchError::Transport(format!("scan task failed: {e}")))?
}
