//! Wires config, the catalog registry and the skills library together.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result},
    skillport_config::SkillportConfig,
    skillport_git::{GitCli, GitClient},
    skillport_github::{GithubClient, RepoRef, RepositoryClient},
    skillport_skills::{
        CatalogEntry, CatalogRegistry, CatalogRegistryStore, FsSkillInstaller, FsSkillWriter,
        GitMirrorRepository, LOCAL_CATALOG_ID, Library, LocalSkillRepository, Provider,
        RemoteSkillRepository, SkillRepository, SkillsCatalog, resolve_provider_roots,
    },
    uuid::Uuid,
};

/// Everything a command needs, built once per invocation.
pub struct App {
    pub config: SkillportConfig,
    pub roots: BTreeMap<Provider, PathBuf>,
    pub store: CatalogRegistryStore,
    pub registry: CatalogRegistry,
    pub library: Library,
    github: Arc<dyn RepositoryClient>,
    git: Arc<dyn GitClient>,
}

impl App {
    /// Build the library from config and the persisted registry. Nothing is loaded yet.
    pub fn open(config: SkillportConfig) -> Result<Self> {
        let store = CatalogRegistryStore::new(CatalogRegistryStore::default_path());
        let registry = store
            .load()
            .with_context(|| format!("failed to read {}", store.path().display()))?;

        let roots = resolve_provider_roots(&config.providers);
        let local = SkillsCatalog::local(Box::new(LocalSkillRepository::for_providers(&roots)));
        let library = Library::new(
            local,
            Box::new(FsSkillInstaller::new(roots.clone())),
            Box::new(FsSkillWriter),
        );

        let github: Arc<dyn RepositoryClient> = Arc::new(
            GithubClient::new()
                .with_api_url(config.github.api_url.clone())
                .with_token(config.github.token.clone()),
        );

        let mut app = Self {
            config,
            roots,
            store,
            registry,
            library,
            github,
            git: Arc::new(GitCli::new()),
        };

        let entries: Vec<CatalogEntry> = app.registry.remotes().cloned().collect();
        for entry in entries {
            app.attach(entry);
        }
        for folder in app.config.catalogs.folders.clone() {
            let path = skillport_config::expand_home(&folder);
            let name = folder_name(&path);
            app.attach(CatalogEntry::new(path.display().to_string(), name));
        }
        Ok(app)
    }

    /// Add a catalog for `entry` to the library.
    pub fn attach(&mut self, entry: CatalogEntry) -> Uuid {
        let id = entry.id;
        let repository = self.repository_for(entry.url.as_deref().unwrap_or_default());
        self.library.add_catalog(SkillsCatalog::new(entry, repository));
        id
    }

    /// Folder path, git mirror or GitHub API, depending on the url and config.
    fn repository_for(&self, url: &str) -> Box<dyn SkillRepository> {
        let path = skillport_config::expand_home(url);
        if path.is_dir() {
            return Box::new(LocalSkillRepository::folder(path));
        }
        if self.config.catalogs.mirror {
            return Box::new(GitMirrorRepository::new(
                url,
                GitMirrorRepository::default_mirrors_root(),
                Arc::clone(&self.git),
            ));
        }
        Box::new(
            RemoteSkillRepository::new(url, Arc::clone(&self.github))
                .with_concurrency(self.config.github.concurrency),
        )
    }

    /// Resolve `local`, a catalog id, name or url to a catalog id.
    pub fn resolve_catalog(&self, selector: &str) -> Result<Uuid> {
        if selector.eq_ignore_ascii_case("local") {
            return Ok(LOCAL_CATALOG_ID);
        }
        if let Ok(id) = selector.parse::<Uuid>()
            && self.library.catalog(id).is_some()
        {
            return Ok(id);
        }
        self.library
            .catalog_entries()
            .into_iter()
            .find(|e| e.name == selector || e.url.as_deref() == Some(selector))
            .map(|e| e.id)
            .with_context(|| format!("no catalog matches '{selector}'"))
    }

    pub fn save_registry(&self) -> Result<()> {
        self.store
            .save(&self.registry)
            .with_context(|| format!("failed to write {}", self.store.path().display()))
    }
}

/// Default display name for a catalog url: `owner/repo` or the folder name.
pub fn default_catalog_name(url: &str) -> Option<String> {
    if let Some(repo) = RepoRef::parse(url) {
        return Some(repo.to_string());
    }
    let path = skillport_config::expand_home(url);
    path.is_dir().then(|| folder_name(&path))
}

fn folder_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_github_and_folder_catalogs() {
        assert_eq!(
            default_catalog_name("https://github.com/anthropics/skills.git").as_deref(),
            Some("anthropics/skills")
        );
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("templates");
        std::fs::create_dir_all(&folder).unwrap();
        assert_eq!(
            default_catalog_name(folder.to_str().unwrap()).as_deref(),
            Some("templates")
        );
        assert!(default_catalog_name("not a url").is_none());
    }
}
