use std::{
    collections::{BTreeMap, BTreeSet},
    io,
    path::{Component, Path, PathBuf},
};

use {async_trait::async_trait, skillport_config::ProvidersConfig, uuid::Uuid};

use crate::{
    error::InstallError,
    parse,
    types::{MANIFEST_FILENAME, Provider, Skill, SkillSource},
};

/// Copies skills into provider directories and removes them again.
#[async_trait]
pub trait SkillInstaller: Send + Sync {
    /// Install `skill` for every provider in `providers`.
    ///
    /// Returns the skill as it now exists locally, with its installed set
    /// widened to include `providers`.
    async fn install(
        &self,
        skill: &Skill,
        providers: &BTreeSet<Provider>,
    ) -> Result<Skill, InstallError>;

    /// Remove `skill` from a single provider.
    async fn uninstall(&self, skill: &Skill, provider: Provider) -> Result<Skill, InstallError>;
}

/// Resolve each provider's installation root from config.
///
/// Configured paths win; otherwise the provider's well-known directory is
/// used. Providers with neither (no home directory) are left out.
pub fn resolve_provider_roots(config: &ProvidersConfig) -> BTreeMap<Provider, PathBuf> {
    let mut roots = BTreeMap::new();
    for provider in Provider::ALL {
        let configured = match provider {
            Provider::Claude => config.claude.as_deref(),
            Provider::Codex => config.codex.as_deref(),
        };
        match configured
            .map(skillport_config::expand_home)
            .or_else(|| provider.default_root())
        {
            Some(root) => {
                roots.insert(provider, root);
            },
            None => tracing::warn!(%provider, "no skills directory for provider"),
        }
    }
    roots
}

/// Filesystem installer writing to `<root>/<path>/<id>` for each provider.
pub struct FsSkillInstaller {
    roots: BTreeMap<Provider, PathBuf>,
}

impl FsSkillInstaller {
    pub fn new(roots: BTreeMap<Provider, PathBuf>) -> Self {
        Self { roots }
    }

    pub fn from_config(config: &ProvidersConfig) -> Self {
        Self::new(resolve_provider_roots(config))
    }

    pub fn roots(&self) -> &BTreeMap<Provider, PathBuf> {
        &self.roots
    }

    fn root(&self, provider: Provider) -> Result<&Path, InstallError> {
        self.roots
            .get(&provider)
            .map(PathBuf::as_path)
            .ok_or(InstallError::ProviderRootMissing { provider })
    }

    /// Install into one provider. Returns the target when it did not exist before.
    async fn install_one(
        &self,
        provider: Provider,
        skill: &Skill,
        relative: &Path,
        rendered: Option<&str>,
    ) -> Result<Option<PathBuf>, InstallError> {
        let root = self.root(provider)?;
        let target = root.join(relative);
        let parent = target
            .parent()
            .ok_or_else(|| InstallError::UnsafePath(skill.unique_key()))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InstallError::io(parent, e))?;

        let existed = match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() && target.join(MANIFEST_FILENAME).is_file() => true,
            Ok(_) => return Err(InstallError::PathConflict { path: target }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(InstallError::io(&target, e)),
        };

        if existed && skill.directory.as_deref() == Some(target.as_path()) {
            return Ok(None);
        }

        let staging = parent.join(hidden_name(&skill.id, "staging"));
        if let Err(e) = stage(skill, rendered, &staging).await {
            remove_quietly(&staging).await;
            return Err(e);
        }

        if existed {
            let backup = parent.join(hidden_name(&skill.id, "old"));
            tokio::fs::rename(&target, &backup)
                .await
                .map_err(|e| InstallError::io(&target, e))?;
            if let Err(e) = tokio::fs::rename(&staging, &target).await {
                restore_backup(&backup, &target).await;
                remove_quietly(&staging).await;
                return Err(InstallError::io(&target, e));
            }
            remove_quietly(&backup).await;
            tracing::debug!(%provider, ?target, "replaced installed skill");
            Ok(None)
        } else {
            if let Err(e) = tokio::fs::rename(&staging, &target).await {
                remove_quietly(&staging).await;
                return Err(InstallError::io(&target, e));
            }
            Ok(Some(target))
        }
    }

    /// Undo installs made earlier in a failed call.
    async fn roll_back(&self, installed: &[(Provider, PathBuf)]) {
        for (provider, target) in installed {
            remove_quietly(target).await;
            if let Ok(root) = self.root(*provider) {
                prune_empty_parents(root, target.parent()).await;
            }
            tracing::debug!(%provider, ?target, "rolled back install");
        }
    }
}

#[async_trait]
impl SkillInstaller for FsSkillInstaller {
    async fn install(
        &self,
        skill: &Skill,
        providers: &BTreeSet<Provider>,
    ) -> Result<Skill, InstallError> {
        if providers.is_empty() {
            return Err(InstallError::EmptyProviderSet);
        }
        let relative = install_dir_for(skill)?;
        let rendered = match skill.directory {
            Some(_) => None,
            None => Some(parse::serialize(skill)?),
        };

        let mut created = Vec::new();
        for &provider in providers {
            match self
                .install_one(provider, skill, &relative, rendered.as_deref())
                .await
            {
                Ok(Some(target)) => created.push((provider, target)),
                Ok(None) => {},
                Err(e) => {
                    tracing::warn!(key = %skill.unique_key(), %provider, %e, "install failed");
                    self.roll_back(&created).await;
                    return Err(e);
                },
            }
        }

        let mut installed = skill.installed_providers.clone();
        installed.extend(providers.iter().copied());
        let Some(&primary) = installed.first() else {
            return Err(InstallError::EmptyProviderSet);
        };
        let directory = self
            .roots
            .get(&primary)
            .map(|root| root.join(&relative))
            .or_else(|| skill.directory.clone());

        tracing::info!(key = %skill.unique_key(), ?providers, "installed skill");
        Ok(Skill {
            source: SkillSource::Local(primary),
            installed_providers: installed,
            directory,
            ..skill.clone()
        })
    }

    async fn uninstall(&self, skill: &Skill, provider: Provider) -> Result<Skill, InstallError> {
        let relative = install_dir_for(skill)?;
        let root = self.root(provider)?;
        let target = root.join(&relative);

        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() => {},
            Ok(_) => return Err(InstallError::PathConflict { path: target }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(InstallError::NotInstalled {
                    key: skill.unique_key(),
                    provider,
                });
            },
            Err(e) => return Err(InstallError::io(&target, e)),
        }

        tokio::fs::remove_dir_all(&target)
            .await
            .map_err(|e| InstallError::io(&target, e))?;
        prune_empty_parents(root, target.parent()).await;

        let mut updated = skill.clone();
        updated.installed_providers.remove(&provider);
        if updated.source == SkillSource::Local(provider)
            && let Some(&next) = updated.installed_providers.first()
        {
            updated.source = SkillSource::Local(next);
            updated.directory = self.roots.get(&next).map(|r| r.join(&relative));
        }

        tracing::info!(key = %skill.unique_key(), %provider, "uninstalled skill");
        Ok(updated)
    }
}

/// Relative install location, rejecting anything that could escape the root.
fn install_dir_for(skill: &Skill) -> Result<PathBuf, InstallError> {
    let unsafe_path = || InstallError::UnsafePath(skill.unique_key());
    if skill.id.is_empty() || skill.id.contains(['/', '\\']) {
        return Err(unsafe_path());
    }

    let relative = skill.relative_dir();
    for component in relative.components() {
        match component {
            Component::Normal(_) => {},
            Component::CurDir
            | Component::ParentDir
            | Component::RootDir
            | Component::Prefix(_) => {
                return Err(unsafe_path());
            },
        }
    }
    Ok(relative)
}

/// Write the skill's content into a fresh `dest` directory.
async fn stage(skill: &Skill, rendered: Option<&str>, dest: &Path) -> Result<(), InstallError> {
    match (&skill.directory, rendered) {
        (Some(source), _) => copy_dir(source, dest).await,
        (None, Some(manifest)) => {
            tokio::fs::create_dir_all(dest)
                .await
                .map_err(|e| InstallError::io(dest, e))?;
            let path = dest.join(MANIFEST_FILENAME);
            tokio::fs::write(&path, manifest)
                .await
                .map_err(|e| InstallError::io(&path, e))
        },
        (None, None) => Err(InstallError::UnsafePath(skill.unique_key())),
    }
}

/// Recursively copy a skill directory, leaving out `.git` and dangling links.
async fn copy_dir(src: &Path, dest: &Path) -> Result<(), InstallError> {
    let mut pending = vec![(src.to_path_buf(), dest.to_path_buf())];

    while let Some((from, to)) = pending.pop() {
        tokio::fs::create_dir_all(&to)
            .await
            .map_err(|e| InstallError::io(&to, e))?;
        let mut entries = tokio::fs::read_dir(&from)
            .await
            .map_err(|e| InstallError::io(&from, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| InstallError::io(&from, e))?
        {
            let name = entry.file_name();
            if name == ".git" {
                continue;
            }
            let src_path = entry.path();
            let dest_path = to.join(&name);

            // Follow links to files; linked directories could cycle.
            let meta = match tokio::fs::metadata(&src_path).await {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::debug!(?src_path, %e, "skipping unreadable entry");
                    continue;
                },
            };
            let is_link = entry
                .file_type()
                .await
                .map(|t| t.is_symlink())
                .unwrap_or(false);

            if meta.is_dir() {
                if is_link {
                    tracing::debug!(?src_path, "skipping linked directory");
                    continue;
                }
                pending.push((src_path, dest_path));
            } else {
                tokio::fs::copy(&src_path, &dest_path)
                    .await
                    .map_err(|e| InstallError::io(&src_path, e))?;
            }
        }
    }
    Ok(())
}

/// Remove now-empty directories between `start` and `root` (exclusive).
async fn prune_empty_parents(root: &Path, start: Option<&Path>) {
    let mut current = start;
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        if tokio::fs::remove_dir(dir).await.is_err() {
            break;
        }
        current = dir.parent();
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(?path, %e, "failed to clean up");
    }
}

/// Put a replaced skill back after a failed swap. Returns whether it worked.
async fn restore_backup(backup: &Path, target: &Path) -> bool {
    match tokio::fs::rename(backup, target).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(?backup, ?target, %e, "failed to restore previous skill directory");
            false
        },
    }
}

fn hidden_name(id: &str, purpose: &str) -> String {
    format!(".{id}.{purpose}-{}", Uuid::new_v4().simple())
}
