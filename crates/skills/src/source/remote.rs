use std::sync::Arc;

use {
    async_trait::async_trait,
    futures::{StreamExt, stream},
    skillport_github::{ContentEntry, RepoRef, RepositoryClient},
};

use crate::{
    error::FetchError,
    parse,
    source::SkillRepository,
    types::{MANIFEST_FILENAME, Skill, SkillSource, sort_skills},
};

/// Directory that, when present at the repository root, holds the skills.
const SKILLS_DIR: &str = "skills";

const DEFAULT_CONCURRENCY: usize = 8;

/// Skills listed by a GitHub repository, read through the contents API.
///
/// Only two layouts are recognized: skills directly below `skills/`, or
/// directly below the repository root. Deeper nesting is not explored.
pub struct RemoteSkillRepository {
    url: String,
    client: Arc<dyn RepositoryClient>,
    concurrency: usize,
}

impl RemoteSkillRepository {
    pub fn new(url: impl Into<String>, client: Arc<dyn RepositoryClient>) -> Self {
        Self {
            url: url.into(),
            client,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Limit the number of manifests downloaded at once.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn repo(&self) -> Result<RepoRef, FetchError> {
        RepoRef::parse(&self.url).ok_or_else(|| FetchError::InvalidUrl(self.url.clone()))
    }

    /// Directory names that may hold a skill, and the path they live under.
    async fn candidates(&self, repo: &RepoRef) -> Result<(String, Vec<String>), FetchError> {
        let root = self.client.get_contents(&repo.owner, &repo.repo, "").await?;

        let has_skills_dir = root.iter().any(|e| e.is_dir() && e.name == SKILLS_DIR);
        let (base, entries) = if has_skills_dir {
            let listing = self
                .client
                .get_contents(&repo.owner, &repo.repo, SKILLS_DIR)
                .await?;
            (SKILLS_DIR.to_string(), listing)
        } else {
            (String::new(), root)
        };

        Ok((base, directory_names(entries)))
    }

    async fn read_candidate(&self, repo: &RepoRef, base: &str, id: &str) -> Option<Skill> {
        let manifest = manifest_path(base, id);
        let content = match self
            .client
            .get_file_content(&repo.owner, &repo.repo, &manifest)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(%repo, %manifest, %e, "no readable SKILL.md");
                return None;
            },
        };
        match parse::parse(&content, id, SkillSource::Remote(self.url.clone())) {
            Ok(skill) => Some(skill),
            Err(e) => {
                tracing::warn!(%repo, %manifest, %e, "skipping invalid SKILL.md");
                None
            },
        }
    }
}

#[async_trait]
impl SkillRepository for RemoteSkillRepository {
    async fn fetch_all(&self) -> Result<Vec<Skill>, FetchError> {
        let repo = self.repo()?;
        let (base, candidates) = self.candidates(&repo).await?;

        let mut skills: Vec<Skill> = stream::iter(candidates)
            .map(|id| {
                let repo = &repo;
                let base = base.as_str();
                async move { self.read_candidate(repo, base, &id).await }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|skill| async move { skill })
            .collect()
            .await;

        sort_skills(&mut skills);
        tracing::debug!(%repo, count = skills.len(), "fetched remote skills");
        Ok(skills)
    }

    async fn fetch(&self, id: &str) -> Result<Option<Skill>, FetchError> {
        let repo = self.repo()?;
        for base in ["", SKILLS_DIR] {
            if let Some(skill) = self.read_candidate(&repo, base, id).await {
                return Ok(Some(skill));
            }
        }
        Ok(None)
    }
}

fn directory_names(entries: Vec<ContentEntry>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|e| e.is_dir() && !e.name.starts_with('.'))
        .map(|e| e.name)
        .collect()
}

fn manifest_path(base: &str, id: &str) -> String {
    if base.is_empty() {
        format!("{id}/{MANIFEST_FILENAME}")
    } else {
        format!("{base}/{id}/{MANIFEST_FILENAME}")
    }
}
