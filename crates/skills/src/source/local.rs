use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use {async_trait::async_trait, walkdir::WalkDir};

use crate::{
    error::FetchError,
    parse,
    source::{SkillRepository, blocking},
    types::{MANIFEST_FILENAME, Provider, Skill, SkillSource, slash_path, sort_skills},
};

/// What a scanned directory represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// A provider's installation directory; everything found is installed there.
    Provider(Provider),
    /// An ad hoc folder of templates, not installed anywhere.
    Folder,
}

/// One directory tree to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRoot {
    pub path: PathBuf,
    pub kind: RootKind,
}

impl LocalRoot {
    pub fn provider(provider: Provider, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: RootKind::Provider(provider),
        }
    }

    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: RootKind::Folder,
        }
    }
}

/// Skills found by walking one or more directory trees.
///
/// Provider roots are merged by unique key: a skill installed for several
/// providers is reported once with all of them.
pub struct LocalSkillRepository {
    roots: Vec<LocalRoot>,
}

impl LocalSkillRepository {
    pub fn new(roots: Vec<LocalRoot>) -> Self {
        Self { roots }
    }

    /// Repository over every provider's installation root.
    pub fn for_providers(roots: &BTreeMap<Provider, PathBuf>) -> Self {
        Self::new(
            roots
                .iter()
                .map(|(provider, path)| LocalRoot::provider(*provider, path))
                .collect(),
        )
    }

    /// Repository over a single template folder.
    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self::new(vec![LocalRoot::folder(path)])
    }

    pub fn roots(&self) -> &[LocalRoot] {
        &self.roots
    }
}

#[async_trait]
impl SkillRepository for LocalSkillRepository {
    async fn fetch_all(&self) -> Result<Vec<Skill>, FetchError> {
        let roots = self.roots.clone();
        let skills = blocking(move || scan_roots(&roots)).await?;
        tracing::debug!(count = skills.len(), roots = self.roots.len(), "scanned local skills");
        Ok(skills)
    }

    async fn fetch(&self, id: &str) -> Result<Option<Skill>, FetchError> {
        Ok(self.fetch_all().await?.into_iter().find(|s| s.id == id))
    }
}

fn scan_roots(roots: &[LocalRoot]) -> Result<Vec<Skill>, FetchError> {
    let mut skills: Vec<Skill> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for root in roots {
        if !root.path.is_dir() {
            match root.kind {
                // Never used on this machine.
                RootKind::Provider(provider) => {
                    tracing::debug!(%provider, path = ?root.path, "provider root missing");
                    continue;
                },
                RootKind::Folder => {
                    return Err(FetchError::NotFound(root.path.display().to_string()));
                },
            }
        }

        let (source, installed) = match root.kind {
            RootKind::Provider(provider) => {
                (SkillSource::Local(provider), BTreeSet::from([provider]))
            },
            RootKind::Folder => (SkillSource::Folder(root.path.clone()), BTreeSet::new()),
        };

        for skill in walk_tree(&root.path, &source)? {
            let skill = skill.with_installed_providers(installed.clone());
            let key = skill.unique_key();
            match index.get(&key) {
                Some(&i) => skills[i]
                    .installed_providers
                    .extend(skill.installed_providers),
                None => {
                    index.insert(key, skills.len());
                    skills.push(skill);
                },
            }
        }
    }

    sort_skills(&mut skills);
    Ok(skills)
}

/// Every directory below `root` (inclusive) that holds a manifest.
///
/// Only a root that cannot be listed is an error; deeper unreadable entries
/// are skipped.
pub(crate) fn walk_tree(root: &Path, source: &SkillSource) -> Result<Vec<Skill>, FetchError> {
    let mut skills = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(root_error(root, &e)),
            Err(e) => {
                tracing::debug!(%e, "skipping unreadable entry");
                continue;
            },
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let dir = entry.path();
        let Some(id) = dir_name(dir) else {
            continue;
        };
        let path = dir
            .strip_prefix(root)
            .ok()
            .and_then(Path::parent)
            .map(slash_path)
            .filter(|p| !p.is_empty());

        if let Some(skill) = read_skill_dir(dir, &id, source.clone()) {
            skills.push(skill.with_path(path));
        }
    }
    Ok(skills)
}

fn root_error(root: &Path, e: &walkdir::Error) -> FetchError {
    match e.io_error() {
        Some(io) => FetchError::from_io(e.path().unwrap_or(root), io),
        None => FetchError::Transport(e.to_string()),
    }
}

/// Parse `<dir>/SKILL.md`, logging and returning `None` on any failure.
pub(crate) fn read_skill_dir(dir: &Path, id: &str, source: SkillSource) -> Option<Skill> {
    let manifest = dir.join(MANIFEST_FILENAME);
    if !manifest.is_file() {
        return None;
    }
    let content = match std::fs::read_to_string(&manifest) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(?manifest, %e, "failed to read SKILL.md");
            return None;
        },
    };
    match parse::parse(&content, id, source) {
        Ok(skill) => Some(skill.with_directory(dir)),
        Err(e) => {
            tracing::warn!(?manifest, %e, "skipping invalid SKILL.md");
            None
        },
    }
}

fn dir_name(dir: &Path) -> Option<String> {
    dir.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
