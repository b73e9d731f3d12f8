//! In-memory doubles for the crate's trait seams.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    skillport_git::GitClient,
    skillport_github::{ContentEntry, EntryKind, RepositoryClient},
};

use crate::{
    editor::SkillWriter,
    error::{FetchError, InstallError, WriteError},
    install::SkillInstaller,
    source::SkillRepository,
    types::{DEFAULT_VERSION, Provider, Skill, SkillSource},
};

pub(crate) const TEST_REMOTE_URL: &str = "https://github.com/acme/skills";

/// A catalog-listed skill that is not installed anywhere.
pub(crate) fn remote_skill(id: &str, path: Option<&str>) -> Skill {
    Skill {
        id: id.into(),
        name: id.into(),
        description: String::new(),
        version: DEFAULT_VERSION.into(),
        content: format!("# {id}"),
        extra: Default::default(),
        path: None,
        source: SkillSource::Remote(TEST_REMOTE_URL.into()),
        installed_providers: BTreeSet::new(),
        directory: None,
    }
    .with_path(path.map(str::to_string))
}

/// A skill as the local catalog reports it after installation.
pub(crate) fn local_skill(id: &str, path: Option<&str>, providers: &[Provider]) -> Skill {
    let installed: BTreeSet<Provider> = providers.iter().copied().collect();
    let source = installed
        .first()
        .map(|p| SkillSource::Local(*p))
        .unwrap_or(SkillSource::Local(Provider::Claude));
    Skill {
        source,
        ..remote_skill(id, path)
    }
    .with_installed_providers(installed)
}

// ── Repositories ─────────────────────────────────────────────────────────────

type FetchResult = Result<Vec<Skill>, FetchError>;

/// Returns whatever result it currently holds.
pub(crate) struct StaticRepository {
    result: Arc<Mutex<FetchResult>>,
}

/// Swaps the result of a [`StaticRepository`] after it has been boxed.
#[derive(Clone)]
pub(crate) struct RepositoryHandle(Arc<Mutex<FetchResult>>);

impl RepositoryHandle {
    pub(crate) fn set(&self, result: FetchResult) {
        *self.0.lock().unwrap() = result;
    }
}

impl StaticRepository {
    pub(crate) fn ok(skills: Vec<Skill>) -> Self {
        Self {
            result: Arc::new(Mutex::new(Ok(skills))),
        }
    }

    pub(crate) fn handle(&self) -> RepositoryHandle {
        RepositoryHandle(Arc::clone(&self.result))
    }
}

#[async_trait]
impl SkillRepository for StaticRepository {
    async fn fetch_all(&self) -> Result<Vec<Skill>, FetchError> {
        self.result.lock().unwrap().clone()
    }

    async fn fetch(&self, id: &str) -> Result<Option<Skill>, FetchError> {
        Ok(self.fetch_all().await?.into_iter().find(|s| s.id == id))
    }
}

/// Never finishes a fetch.
pub(crate) struct PendingRepository;

#[async_trait]
impl SkillRepository for PendingRepository {
    async fn fetch_all(&self) -> Result<Vec<Skill>, FetchError> {
        std::future::pending().await
    }

    async fn fetch(&self, _id: &str) -> Result<Option<Skill>, FetchError> {
        std::future::pending().await
    }
}

// ── Installer and writer ─────────────────────────────────────────────────────

/// Tracks installed sets without touching the filesystem.
#[derive(Clone, Default)]
pub(crate) struct FakeInstaller {
    fail_next: Arc<AtomicBool>,
}

impl FakeInstaller {
    pub(crate) fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.fail_next.swap(false, Ordering::SeqCst)
    }
}

#[async_trait]
impl SkillInstaller for FakeInstaller {
    async fn install(
        &self,
        skill: &Skill,
        providers: &BTreeSet<Provider>,
    ) -> Result<Skill, InstallError> {
        if self.take_failure() {
            return Err(InstallError::PermissionDenied {
                path: Path::new("/skills").join(skill.relative_dir()),
            });
        }
        if providers.is_empty() {
            return Err(InstallError::EmptyProviderSet);
        }
        let mut installed = skill.installed_providers.clone();
        installed.extend(providers.iter().copied());
        let primary = installed.first().copied().unwrap_or(Provider::Claude);
        Ok(Skill {
            source: SkillSource::Local(primary),
            installed_providers: installed,
            ..skill.clone()
        })
    }

    async fn uninstall(&self, skill: &Skill, provider: Provider) -> Result<Skill, InstallError> {
        if self.take_failure() || !skill.is_installed_for(provider) {
            return Err(InstallError::NotInstalled {
                key: skill.unique_key(),
                provider,
            });
        }
        let mut updated = skill.clone();
        updated.installed_providers.remove(&provider);
        Ok(updated)
    }
}

/// Records saved skills instead of writing them.
#[derive(Clone, Default)]
pub(crate) struct FakeWriter {
    fail_next: Arc<AtomicBool>,
    saved: Arc<Mutex<Vec<Skill>>>,
}

impl FakeWriter {
    pub(crate) fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub(crate) fn saved(&self) -> Vec<Skill> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl SkillWriter for FakeWriter {
    async fn save(&self, skill: &Skill) -> Result<Skill, WriteError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(WriteError::NoLocalPath {
                key: skill.unique_key(),
            });
        }
        self.saved.lock().unwrap().push(skill.clone());
        Ok(skill.clone())
    }
}

// ── GitHub contents ──────────────────────────────────────────────────────────

/// Serves directory listings and files from maps keyed by repository path.
#[derive(Default)]
pub(crate) struct InMemoryRepositoryClient {
    dirs: HashMap<String, Vec<ContentEntry>>,
    files: HashMap<String, String>,
}

impl InMemoryRepositoryClient {
    pub(crate) fn with_dir(mut self, path: &str, entries: &[(&str, EntryKind)]) -> Self {
        let listing = entries
            .iter()
            .map(|(name, kind)| ContentEntry {
                name: (*name).to_string(),
                path: if path.is_empty() {
                    (*name).to_string()
                } else {
                    format!("{path}/{name}")
                },
                kind: *kind,
            })
            .collect();
        self.dirs.insert(path.to_string(), listing);
        self
    }

    pub(crate) fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }
}

#[async_trait]
impl RepositoryClient for InMemoryRepositoryClient {
    async fn get_contents(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
    ) -> skillport_github::Result<Vec<ContentEntry>> {
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| skillport_github::Error::NotFound { path: path.into() })
    }

    async fn get_file_content(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
    ) -> skillport_github::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| skillport_github::Error::NotFound { path: path.into() })
    }
}

// ── Git ──────────────────────────────────────────────────────────────────────

/// "Clones" by writing a fixed file set and a `.git` marker.
#[derive(Default)]
pub(crate) struct FakeGit {
    files: Vec<(String, String)>,
    clones: AtomicUsize,
    pulls: AtomicUsize,
    fail_clones: AtomicBool,
    fail_pulls: AtomicBool,
}

impl FakeGit {
    pub(crate) fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(p, c)| ((*p).to_string(), (*c).to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) fn clones(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub(crate) fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_clones(&self) {
        self.fail_clones.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_pulls(&self) {
        self.fail_pulls.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl GitClient for FakeGit {
    async fn clone_repo(&self, url: &str, to: &Path) -> skillport_git::Result<()> {
        if self.fail_clones.load(Ordering::SeqCst) {
            return Err(skillport_git::Error::CloneFailed(format!("{url}: unreachable")));
        }
        std::fs::create_dir_all(to.join(".git")).unwrap();
        for (path, content) in &self.files {
            let file = to.join(path);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(file, content).unwrap();
        }
        self.clones.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pull(&self, at: &Path) -> skillport_git::Result<()> {
        if self.fail_pulls.load(Ordering::SeqCst) {
            return Err(skillport_git::Error::PullFailed(format!(
                "{}: diverged",
                at.display()
            )));
        }
        self.pulls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn is_git_repository(&self, at: &Path) -> bool {
        at.join(".git").is_dir()
    }
}
