use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    async_trait::async_trait,
    skillport_git::GitClient,
    skillport_github::RepoRef,
};

use crate::{
    error::FetchError,
    source::{SkillRepository, blocking, local::read_skill_dir},
    types::{Skill, SkillSource, sort_skills},
};

/// Remote catalog backed by a shallow git clone instead of the HTTP API.
///
/// The clone lives at `<mirrors_root>/<owner>-<repo>`. Layout detection is
/// the same as [`RemoteSkillRepository`](super::RemoteSkillRepository), so
/// both backings report identical unique keys for the same repository.
pub struct GitMirrorRepository {
    url: String,
    mirrors_root: PathBuf,
    git: Arc<dyn GitClient>,
}

impl GitMirrorRepository {
    pub fn new(
        url: impl Into<String>,
        mirrors_root: impl Into<PathBuf>,
        git: Arc<dyn GitClient>,
    ) -> Self {
        Self {
            url: url.into(),
            mirrors_root: mirrors_root.into(),
            git,
        }
    }

    /// Default location for mirrors: `<data_dir>/mirrors`.
    pub fn default_mirrors_root() -> PathBuf {
        skillport_config::data_dir().join("mirrors")
    }

    fn checkout_dir(&self) -> Result<(RepoRef, PathBuf), FetchError> {
        let repo =
            RepoRef::parse(&self.url).ok_or_else(|| FetchError::InvalidUrl(self.url.clone()))?;
        let dir = self.mirrors_root.join(format!("{}-{}", repo.owner, repo.repo));
        Ok((repo, dir))
    }

    /// Bring the local clone up to date, cloning it first if needed.
    async fn sync(&self) -> Result<PathBuf, FetchError> {
        let (repo, dir) = self.checkout_dir()?;

        if self.git.is_git_repository(&dir).await {
            if let Err(e) = self.git.pull(&dir).await {
                tracing::warn!(%repo, ?dir, %e, "mirror pull failed, using existing checkout");
            }
        } else {
            if dir.exists() {
                // Leftover from an interrupted clone.
                tokio::fs::remove_dir_all(&dir)
                    .await
                    .map_err(|e| FetchError::from_io(&dir, &e))?;
            }
            self.git.clone_repo(&repo.clone_url(), &dir).await?;
            tracing::info!(%repo, ?dir, "cloned catalog mirror");
        }
        Ok(dir)
    }
}

#[async_trait]
impl SkillRepository for GitMirrorRepository {
    async fn fetch_all(&self) -> Result<Vec<Skill>, FetchError> {
        let dir = self.sync().await?;
        let source = SkillSource::Remote(self.url.clone());
        blocking(move || scan_checkout(&dir, &source)).await
    }

    async fn fetch(&self, id: &str) -> Result<Option<Skill>, FetchError> {
        Ok(self.fetch_all().await?.into_iter().find(|s| s.id == id))
    }
}

/// Immediate children of `skills/` when present, else of the checkout root.
fn scan_checkout(checkout: &Path, source: &SkillSource) -> Result<Vec<Skill>, FetchError> {
    let skills_dir = checkout.join("skills");
    let base = if skills_dir.is_dir() {
        skills_dir
    } else {
        checkout.to_path_buf()
    };

    let entries = std::fs::read_dir(&base).map_err(|e| FetchError::from_io(&base, &e))?;

    let mut skills: Vec<Skill> = entries
        .flatten()
        .filter_map(|entry| {
            let dir = entry.path();
            let id = entry.file_name().to_string_lossy().into_owned();
            if id.starts_with('.') || !dir.is_dir() {
                return None;
            }
            read_skill_dir(&dir, &id, source.clone())
        })
        .collect();
    sort_skills(&mut skills);
    Ok(skills)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::testing::FakeGit};

    const URL: &str = "https://github.com/acme/skills";

    fn manifest(name: &str) -> String {
        format!("---\nname: {name}\n---\nbody\n")
    }

    #[tokio::test]
    async fn clones_then_scans_skills_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let git = Arc::new(FakeGit::with_files(&[
            ("skills/foo/SKILL.md", &manifest("foo")),
            ("skills/foo/helper.sh", "echo hi"),
            ("skills/bar/SKILL.md", &manifest("bar")),
            ("README.md", "readme"),
        ]));
        let repo = GitMirrorRepository::new(URL, tmp.path(), git.clone());

        let skills = repo.fetch_all().await.unwrap();
        let ids: Vec<_> = skills.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["bar", "foo"]);
        assert_eq!(skills[0].path, None);
        assert_eq!(skills[0].source, SkillSource::Remote(URL.into()));
        assert_eq!(
            skills[1].directory.as_deref(),
            Some(tmp.path().join("acme-skills/skills/foo").as_path())
        );
        assert_eq!(git.clones(), 1);
        assert_eq!(git.pulls(), 0);
    }

    #[tokio::test]
    async fn existing_checkout_is_pulled_not_recloned() {
        let tmp = tempfile::tempdir().unwrap();
        let git = Arc::new(FakeGit::with_files(&[("pdf/SKILL.md", &manifest("pdf"))]));
        let repo = GitMirrorRepository::new(URL, tmp.path(), git.clone());

        repo.fetch_all().await.unwrap();
        let skills = repo.fetch_all().await.unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(git.clones(), 1);
        assert_eq!(git.pulls(), 1);
    }

    #[tokio::test]
    async fn failed_pull_keeps_stale_checkout() {
        let tmp = tempfile::tempdir().unwrap();
        let git = Arc::new(FakeGit::with_files(&[("pdf/SKILL.md", &manifest("pdf"))]));
        let repo = GitMirrorRepository::new(URL, tmp.path(), git.clone());
        repo.fetch_all().await.unwrap();

        git.fail_pulls();
        let skills = repo.fetch_all().await.unwrap();
        assert_eq!(skills[0].id, "pdf");
    }

    #[tokio::test]
    async fn failed_clone_is_a_transport_error() {
        let tmp = tempfile::tempdir().unwrap();
        let git = Arc::new(FakeGit::default());
        git.fail_clones();
        let err = GitMirrorRepository::new(URL, tmp.path(), git)
            .fetch_all()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn rejects_non_github_urls() {
        let tmp = tempfile::tempdir().unwrap();
        let err = GitMirrorRepository::new("ftp://x/y", tmp.path(), Arc::new(FakeGit::default()))
            .fetch_all()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn unlistable_checkout_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let source = SkillSource::Remote(URL.into());
        let err = scan_checkout(&tmp.path().join("gone"), &source).unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }
}
