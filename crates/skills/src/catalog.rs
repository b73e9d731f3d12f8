use std::collections::{BTreeSet, HashMap, HashSet};

use uuid::Uuid;

use crate::{
    registry::{CatalogEntry, now_ms},
    source::SkillRepository,
    types::{Provider, Skill, sort_skills},
};

/// Fixed id of the catalog of locally installed skills.
pub const LOCAL_CATALOG_ID: Uuid = Uuid::from_u128(0x5c1b_0c4a_7a1e_4f00_9d3e_000000000001);

const LOCAL_CATALOG_NAME: &str = "Installed";

/// One collection of skills loaded from a single source.
///
/// Keys are unique within a catalog and the list stays ordered by
/// case-insensitive name. Consistency with other catalogs is the
/// [`Library`](crate::library::Library)'s job.
pub struct SkillsCatalog {
    entry: CatalogEntry,
    skills: Vec<Skill>,
    is_loading: bool,
    error_message: Option<String>,
    repository: Box<dyn SkillRepository>,
}

impl SkillsCatalog {
    pub fn new(entry: CatalogEntry, repository: Box<dyn SkillRepository>) -> Self {
        Self {
            entry,
            skills: Vec::new(),
            is_loading: false,
            error_message: None,
            repository,
        }
    }

    /// The catalog of everything installed across providers.
    pub fn local(repository: Box<dyn SkillRepository>) -> Self {
        Self::new(
            CatalogEntry {
                id: LOCAL_CATALOG_ID,
                url: None,
                name: LOCAL_CATALOG_NAME.into(),
                added_at_ms: now_ms(),
            },
            repository,
        )
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.entry.id
    }

    pub fn url(&self) -> Option<&str> {
        self.entry.url.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn entry(&self) -> &CatalogEntry {
        &self.entry
    }

    pub fn is_local(&self) -> bool {
        self.entry.is_local()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn skill(&self, key: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.unique_key() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.skill(key).is_some()
    }

    // ── Loading ────────────────────────────────────────────────────────────

    /// Replace the skill list with a fresh fetch from the source.
    ///
    /// On failure the previous list is kept and the error recorded. Dropping
    /// the returned future mid-fetch behaves the same as a failure without
    /// the message.
    pub async fn load_skills(&mut self) {
        let result = {
            let _loading = LoadingFlag::raise(&mut self.is_loading);
            self.repository.fetch_all().await
        };

        match result {
            Ok(skills) => {
                self.skills = dedupe(skills);
                sort_skills(&mut self.skills);
                self.error_message = None;
                tracing::info!(
                    catalog = %self.entry.name,
                    count = self.skills.len(),
                    "loaded skills"
                );
            },
            Err(e) => {
                let message = format!("Failed to load skills: {e}");
                tracing::warn!(catalog = %self.entry.name, %e, "failed to load skills");
                self.error_message = Some(message);
            },
        }
    }

    // ── Reconciliation ─────────────────────────────────────────────────────

    /// Overwrite the installed set of the skill with `key`, if present.
    pub fn update_installation_status(&mut self, key: &str, providers: &BTreeSet<Provider>) {
        if let Some(skill) = self.skills.iter_mut().find(|s| s.unique_key() == key) {
            skill.installed_providers = providers.clone();
        }
    }

    /// Copy installed sets from `installed` onto skills with matching keys.
    pub fn sync_installation_status(&mut self, installed: &[Skill]) {
        let by_key: HashMap<String, &BTreeSet<Provider>> = installed
            .iter()
            .map(|s| (s.unique_key(), &s.installed_providers))
            .collect();
        for skill in &mut self.skills {
            if let Some(providers) = by_key.get(&skill.unique_key()) {
                skill.installed_providers = (*providers).clone();
            }
        }
    }

    /// Insert a skill unless one with the same key is already present.
    pub fn add_skill(&mut self, skill: Skill) {
        if self.contains(&skill.unique_key()) {
            return;
        }
        self.skills.push(skill);
        sort_skills(&mut self.skills);
    }

    pub fn remove_skill(&mut self, key: &str) {
        self.skills.retain(|s| s.unique_key() != key);
    }

    /// Replace the skill sharing `skill`'s key. No-op when absent.
    pub fn update_skill(&mut self, skill: Skill) {
        let key = skill.unique_key();
        if let Some(existing) = self.skills.iter_mut().find(|s| s.unique_key() == key) {
            *existing = skill;
            sort_skills(&mut self.skills);
        }
    }
}

impl std::fmt::Debug for SkillsCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillsCatalog")
            .field("entry", &self.entry)
            .field("skills", &self.skills.len())
            .field("is_loading", &self.is_loading)
            .field("error_message", &self.error_message)
            .finish_non_exhaustive()
    }
}

/// Keeps the loading flag raised for as long as it lives.
struct LoadingFlag<'a>(&'a mut bool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Drop later duplicates of a key, keeping the first occurrence.
fn dedupe(skills: Vec<Skill>) -> Vec<Skill> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .filter(|s| seen.insert(s.unique_key()))
        .collect()
}
