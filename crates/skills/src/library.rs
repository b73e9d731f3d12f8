//! The local catalog plus every added catalog, kept consistent.
//!
//! The local catalog is the system of record for what is installed. Every
//! install, uninstall and edit is applied to it first and then pushed to each
//! other catalog that shows the same skill, so that a key present in several
//! catalogs always reports the same installed providers.

use std::collections::{BTreeSet, HashSet};

use {futures::future::join_all, uuid::Uuid};

use crate::{
    catalog::{LOCAL_CATALOG_ID, SkillsCatalog},
    editor::SkillWriter,
    install::SkillInstaller,
    registry::CatalogEntry,
    types::{Provider, Skill},
};

/// Which catalogs contribute to [`Library::filtered_skills`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFilter {
    /// Local first, then every other catalog; one entry per key.
    #[default]
    All,
    Local,
    Catalog(Uuid),
}

pub struct Library {
    local: SkillsCatalog,
    catalogs: Vec<SkillsCatalog>,
    installer: Box<dyn SkillInstaller>,
    writer: Box<dyn SkillWriter>,
    selected_skill: Option<Skill>,
    selected_source: SourceFilter,
    search_text: String,
    error_message: Option<String>,
}

impl Library {
    pub fn new(
        local: SkillsCatalog,
        installer: Box<dyn SkillInstaller>,
        writer: Box<dyn SkillWriter>,
    ) -> Self {
        Self {
            local,
            catalogs: Vec::new(),
            installer,
            writer,
            selected_skill: None,
            selected_source: SourceFilter::All,
            search_text: String::new(),
            error_message: None,
        }
    }

    // ── Catalogs ───────────────────────────────────────────────────────────

    pub fn local_catalog(&self) -> &SkillsCatalog {
        &self.local
    }

    pub fn remote_catalogs(&self) -> &[SkillsCatalog] {
        &self.catalogs
    }

    pub fn catalog(&self, id: Uuid) -> Option<&SkillsCatalog> {
        if id == LOCAL_CATALOG_ID {
            return Some(&self.local);
        }
        self.catalogs.iter().find(|c| c.id() == id)
    }

    /// Registry records for every catalog, local first.
    pub fn catalog_entries(&self) -> Vec<&CatalogEntry> {
        std::iter::once(&self.local)
            .chain(&self.catalogs)
            .map(SkillsCatalog::entry)
            .collect()
    }

    /// Add a catalog. Returns `false` for the local catalog or a duplicate id.
    pub fn add_catalog(&mut self, catalog: SkillsCatalog) -> bool {
        if catalog.is_local() || self.catalog(catalog.id()).is_some() {
            return false;
        }
        tracing::debug!(catalog = %catalog.name(), "added catalog");
        self.catalogs.push(catalog);
        true
    }

    /// Remove a catalog. The local catalog cannot be removed.
    pub fn remove_catalog(&mut self, id: Uuid) -> Option<SkillsCatalog> {
        let index = self.catalogs.iter().position(|c| c.id() == id)?;
        if self.selected_source == SourceFilter::Catalog(id) {
            self.selected_source = SourceFilter::All;
        }
        Some(self.catalogs.remove(index))
    }

    // ── Loading ────────────────────────────────────────────────────────────

    /// Load the local catalog, then all others, then sync their badges.
    pub async fn load_all(&mut self) {
        self.local.load_skills().await;
        join_all(self.catalogs.iter_mut().map(|c| c.load_skills())).await;
        for catalog in &mut self.catalogs {
            catalog.sync_installation_status(self.local.skills());
        }
    }

    /// Reload one catalog. Returns `false` if no catalog has that id.
    pub async fn refresh_catalog(&mut self, id: Uuid) -> bool {
        if id == LOCAL_CATALOG_ID {
            self.local.load_skills().await;
            for catalog in &mut self.catalogs {
                catalog.sync_installation_status(self.local.skills());
            }
            return true;
        }
        let Some(catalog) = self.catalogs.iter_mut().find(|c| c.id() == id) else {
            return false;
        };
        catalog.load_skills().await;
        catalog.sync_installation_status(self.local.skills());
        true
    }

    // ── Selection and filtering ────────────────────────────────────────────

    pub fn selected_skill(&self) -> Option<&Skill> {
        self.selected_skill.as_ref()
    }

    pub fn select_skill(&mut self, skill: Option<Skill>) {
        self.selected_skill = skill;
    }

    pub fn selected_source(&self) -> SourceFilter {
        self.selected_source
    }

    pub fn select_source(&mut self, source: SourceFilter) {
        self.selected_source = source;
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Skills of the selected source that match the search text.
    pub fn filtered_skills(&self) -> Vec<&Skill> {
        let pool: Vec<&Skill> = match self.selected_source {
            SourceFilter::All => {
                let mut seen = HashSet::new();
                self.local
                    .skills()
                    .iter()
                    .chain(self.catalogs.iter().flat_map(|c| c.skills()))
                    .filter(|s| seen.insert(s.unique_key()))
                    .collect()
            },
            SourceFilter::Local => self.local.skills().iter().collect(),
            SourceFilter::Catalog(id) => self
                .catalog(id)
                .map(|c| c.skills().iter().collect())
                .unwrap_or_default(),
        };
        pool.into_iter()
            .filter(|s| s.matches_query(&self.search_text))
            .collect()
    }

    // ── Install / uninstall ────────────────────────────────────────────────

    /// Install the selected skill. Returns `false` when nothing is selected
    /// or the install failed.
    pub async fn install(&mut self, providers: &BTreeSet<Provider>) -> bool {
        match self.selected_skill.clone() {
            Some(skill) => self.install_skill(&skill, providers).await,
            None => false,
        }
    }

    /// Install `skill` and reconcile every catalog that shows it.
    ///
    /// On failure no catalog changes and the error message is recorded.
    pub async fn install_skill(&mut self, skill: &Skill, providers: &BTreeSet<Provider>) -> bool {
        let key = skill.unique_key();
        let updated = match self.installer.install(skill, providers).await {
            Ok(updated) => updated,
            Err(e) => {
                self.record_error(format!("Installation failed: {e}"));
                return false;
            },
        };

        let installed = match self.local.skill(&key) {
            Some(existing) => {
                let mut union = existing.installed_providers.clone();
                union.extend(updated.installed_providers.iter().copied());
                self.local.update_installation_status(&key, &union);
                union
            },
            None => {
                let set = updated.installed_providers.clone();
                self.local.add_skill(updated);
                set
            },
        };
        self.propagate(&key, &installed);
        self.finish(&key);
        true
    }

    /// Uninstall the selected skill from one provider.
    pub async fn uninstall(&mut self, provider: Provider) -> bool {
        match self.selected_skill.clone() {
            Some(skill) => self.uninstall_skill(&skill, provider).await,
            None => false,
        }
    }

    /// Remove `skill` from `provider` and reconcile every catalog that shows it.
    ///
    /// A local skill left with no providers is dropped from the local catalog.
    pub async fn uninstall_skill(&mut self, skill: &Skill, provider: Provider) -> bool {
        let key = skill.unique_key();
        let target = self.local.skill(&key).cloned().unwrap_or_else(|| skill.clone());

        let updated = match self.installer.uninstall(&target, provider).await {
            Ok(updated) => updated,
            Err(e) => {
                self.record_error(format!("Uninstall failed: {e}"));
                return false;
            },
        };

        let remaining = updated.installed_providers.clone();
        if remaining.is_empty() && target.source.is_local() {
            self.local.remove_skill(&key);
        } else if self.local.contains(&key) {
            self.local.update_skill(updated);
        }
        self.propagate(&key, &remaining);
        self.finish(&key);
        true
    }

    // ── Editing ────────────────────────────────────────────────────────────

    /// Write an edited skill back to disk and update every copy of that file.
    pub async fn save_skill(&mut self, skill: &Skill) -> bool {
        let saved = match self.writer.save(skill).await {
            Ok(saved) => saved,
            Err(e) => {
                self.record_error(format!("Save failed: {e}"));
                return false;
            },
        };

        apply_edit(&mut self.local, &saved);
        for catalog in &mut self.catalogs {
            apply_edit(catalog, &saved);
        }
        self.finish(&saved.unique_key());
        true
    }

    // ── Internals ──────────────────────────────────────────────────────────

    fn propagate(&mut self, key: &str, installed: &BTreeSet<Provider>) {
        for catalog in &mut self.catalogs {
            catalog.update_installation_status(key, installed);
        }
    }

    /// Clear the error and point the selection at the current copy of `key`.
    fn finish(&mut self, key: &str) {
        self.error_message = None;
        if self
            .selected_skill
            .as_ref()
            .is_some_and(|s| s.unique_key() == key)
        {
            self.selected_skill = self.current(key).cloned();
        }
    }

    /// The copy of `key` the user is looking at, given the selected source.
    fn current(&self, key: &str) -> Option<&Skill> {
        if let SourceFilter::Catalog(id) = self.selected_source
            && let Some(skill) = self.catalog(id).and_then(|c| c.skill(key))
        {
            return Some(skill);
        }
        self.local
            .skill(key)
            .or_else(|| self.catalogs.iter().find_map(|c| c.skill(key)))
    }

    fn record_error(&mut self, message: String) {
        tracing::warn!(error = %message, "library operation failed");
        self.error_message = Some(message);
    }
}

/// Apply edited manifest fields to the catalog's copy of the same file.
fn apply_edit(catalog: &mut SkillsCatalog, saved: &Skill) {
    let Some(existing) = catalog.skill(&saved.unique_key()) else {
        return;
    };
    if existing.directory != saved.directory {
        return;
    }
    let edited = Skill {
        name: saved.name.clone(),
        description: saved.description.clone(),
        version: saved.version.clone(),
        content: saved.content.clone(),
        extra: saved.extra.clone(),
        ..existing.clone()
    };
    catalog.update_skill(edited);
}
