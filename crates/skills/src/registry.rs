use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use {
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

use crate::error::RegistryError;

/// Persisted record of one catalog the user has added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: Uuid,
    /// Repository URL or folder path. `None` only for the local catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub name: String,
    pub added_at_ms: u64,
}

impl CatalogEntry {
    /// A new entry with a fresh id, stamped with the current time.
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: Some(url.into()),
            name: name.into(),
            added_at_ms: now_ms(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.url.is_none()
    }
}

/// All catalogs the user has added, in the order they were added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRegistry {
    pub version: u32,
    #[serde(default)]
    pub catalogs: Vec<CatalogEntry>,
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self {
            version: 1,
            catalogs: Vec::new(),
        }
    }
}

impl CatalogRegistry {
    /// Add an entry. Returns `false` when one with the same url is already present.
    pub fn add(&mut self, entry: CatalogEntry) -> bool {
        if let Some(url) = entry.url.as_deref()
            && self.find_by_url(url).is_some()
        {
            return false;
        }
        self.catalogs.push(entry);
        true
    }

    pub fn remove(&mut self, id: Uuid) -> Option<CatalogEntry> {
        let index = self.catalogs.iter().position(|c| c.id == id)?;
        Some(self.catalogs.remove(index))
    }

    pub fn find(&self, id: Uuid) -> Option<&CatalogEntry> {
        self.catalogs.iter().find(|c| c.id == id)
    }

    /// Look up by url, ignoring a trailing `/` or `.git`.
    pub fn find_by_url(&self, url: &str) -> Option<&CatalogEntry> {
        let wanted = normalize_url(url);
        self.catalogs
            .iter()
            .find(|c| c.url.as_deref().map(normalize_url) == Some(wanted))
    }

    pub fn remotes(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.catalogs.iter().filter(|c| !c.is_local())
    }
}

fn normalize_url(url: &str) -> &str {
    let url = url.trim().trim_end_matches('/');
    url.strip_suffix(".git").unwrap_or(url)
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Registry storage with atomic writes.
pub struct CatalogRegistryStore {
    path: PathBuf,
}

impl CatalogRegistryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default registry path: `<data_dir>/catalogs.json`.
    pub fn default_path() -> PathBuf {
        skillport_config::data_dir().join("catalogs.json")
    }

    /// Load the registry, returning an empty one if the file does not exist.
    pub fn load(&self) -> Result<CatalogRegistry, RegistryError> {
        if !self.path.exists() {
            return Ok(CatalogRegistry::default());
        }
        let data = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save via temp file + rename.
    pub fn save(&self, registry: &CatalogRegistry) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(registry)?;
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(
            path = ?self.path,
            count = registry.catalogs.len(),
            "saved catalog registry"
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CatalogRegistryStore::new(tmp.path().join("missing.json"));
        let registry = store.load().unwrap();
        assert_eq!(registry.version, 1);
        assert!(registry.catalogs.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CatalogRegistryStore::new(tmp.path().join("nested/catalogs.json"));

        let mut registry = CatalogRegistry::default();
        let entry = CatalogEntry::new("https://github.com/anthropics/skills", "Anthropic");
        let id = entry.id;
        assert!(registry.add(entry));
        store.save(&registry).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.catalogs.len(), 1);
        assert_eq!(loaded.catalogs[0].id, id);
        assert_eq!(loaded.catalogs[0].name, "Anthropic");
        assert!(loaded.catalogs[0].added_at_ms > 0);
        assert!(!tmp.path().join("nested/catalogs.json.tmp").exists());
    }

    #[test]
    fn rejects_duplicate_urls() {
        let mut registry = CatalogRegistry::default();
        assert!(registry.add(CatalogEntry::new("https://github.com/a/b", "b")));
        assert!(!registry.add(CatalogEntry::new("https://github.com/a/b.git", "b again")));
        assert!(!registry.add(CatalogEntry::new("https://github.com/a/b/", "b again")));
        assert_eq!(registry.catalogs.len(), 1);
    }

    #[test]
    fn find_and_remove_by_id() {
        let mut registry = CatalogRegistry::default();
        let a = CatalogEntry::new("https://github.com/a/a", "a");
        let b = CatalogEntry::new("https://github.com/b/b", "b");
        let (a_id, b_id) = (a.id, b.id);
        registry.add(a);
        registry.add(b);

        assert_eq!(registry.find(b_id).unwrap().name, "b");
        assert_eq!(registry.remove(a_id).unwrap().name, "a");
        assert!(registry.find(a_id).is_none());
        assert!(registry.remove(a_id).is_none());
        assert_eq!(registry.remotes().count(), 1);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("catalogs.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            CatalogRegistryStore::new(path).load(),
            Err(RegistryError::Json(_))
        ));
    }
}
