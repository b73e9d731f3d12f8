use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use {
    serde::{Deserialize, Serialize},
    serde_yaml::Mapping,
};

/// File name that marks a directory as a skill.
pub const MANIFEST_FILENAME: &str = "SKILL.md";

/// Version assigned to skills whose manifest does not declare one.
pub const DEFAULT_VERSION: &str = "1.0.0";

// ── Providers ────────────────────────────────────────────────────────────────

/// A tool that consumes skills from its own directory.
///
/// The set is closed: installation is always scoped to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Claude,
    Codex,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Claude, Provider::Codex];

    /// Stable identifier used in config files and on the command line.
    pub fn id(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Claude => "Claude Code",
            Self::Codex => "Codex",
        }
    }

    /// Skills directory relative to the user's home.
    fn home_relative_root(self) -> &'static str {
        match self {
            Self::Claude => ".claude/skills",
            Self::Codex => ".codex/skills",
        }
    }

    /// Well-known installation root, e.g. `~/.claude/skills`.
    pub fn default_root(self) -> Option<PathBuf> {
        directories::BaseDirs::new().map(|b| b.home_dir().join(self.home_relative_root()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider '{0}' (expected one of: claude, codex)")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "claude-code" | "claude_code" => Ok(Self::Claude),
            "codex" => Ok(Self::Codex),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

// ── Skill source ─────────────────────────────────────────────────────────────

/// Where a particular skill instance was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum SkillSource {
    /// Installed in a provider's skills directory.
    Local(Provider),
    /// Listed by a remote catalog bound to this repository URL.
    Remote(String),
    /// A user-chosen folder of skill templates, not installed anywhere.
    Folder(PathBuf),
}

impl SkillSource {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Short label shown next to a skill.
    pub fn display_name(&self) -> String {
        match self {
            Self::Local(provider) => provider.display_name().to_string(),
            Self::Remote(url) => skillport_github::RepoRef::parse(url)
                .map(|r| r.to_string())
                .unwrap_or_else(|| url.clone()),
            Self::Folder(root) => root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| root.display().to_string()),
        }
    }
}

// ── Skill ────────────────────────────────────────────────────────────────────

/// A parsed skill together with where it is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Directory name of the skill. Not unique on its own.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    /// Manifest body (documentation).
    #[serde(default)]
    pub content: String,
    /// Remaining front matter keys (`license`, `allowed-tools`, ...), written
    /// back unchanged when the manifest is rendered.
    #[serde(skip)]
    pub extra: Mapping,
    /// Relative path from the catalog root to the skill directory's parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub source: SkillSource,
    #[serde(default)]
    pub installed_providers: BTreeSet<Provider>,
    /// On-disk skill directory, when one exists locally.
    #[serde(skip)]
    pub directory: Option<PathBuf>,
}

impl Skill {
    /// Identity used for every cross-catalog match.
    pub fn unique_key(&self) -> String {
        unique_key(&self.id, self.path.as_deref())
    }

    /// `name`, qualified with the nested path when there is one.
    pub fn display_name(&self) -> String {
        match self.path.as_deref() {
            Some(path) if !path.is_empty() => format!("{} ({path})", self.name),
            _ => self.name.clone(),
        }
    }

    pub fn is_installed(&self) -> bool {
        !self.installed_providers.is_empty()
    }

    pub fn is_installed_for(&self, provider: Provider) -> bool {
        self.installed_providers.contains(&provider)
    }

    #[must_use]
    pub fn with_installed_providers(mut self, providers: BTreeSet<Provider>) -> Self {
        self.installed_providers = providers;
        self
    }

    /// Set the nested path; an empty path means the skill sits at the root.
    #[must_use]
    pub fn with_path(mut self, path: Option<String>) -> Self {
        self.path = path
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        self
    }

    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Relative location of the skill directory below a catalog or provider root.
    pub fn relative_dir(&self) -> PathBuf {
        let mut dir = PathBuf::new();
        if let Some(path) = self.path.as_deref() {
            dir.extend(path.split('/').filter(|c| !c.is_empty()));
        }
        dir.push(&self.id);
        dir
    }

    /// Case-insensitive substring match on name or description.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

/// `id`, prefixed by `path/` when the skill is nested.
pub fn unique_key(id: &str, path: Option<&str>) -> String {
    match path.map(|p| p.trim_matches('/')) {
        Some(path) if !path.is_empty() => format!("{path}/{id}"),
        _ => id.to_string(),
    }
}

/// Sort by case-insensitive name, falling back to the key so the order is total.
pub fn sort_skills(skills: &mut [Skill]) {
    skills.sort_by_cached_key(|s| (s.name.to_lowercase(), s.unique_key()));
}

/// Render a relative path with `/` separators regardless of platform.
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
