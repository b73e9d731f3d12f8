/// Config schema types (providers, GitHub access, catalogs).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillportConfig {
    pub providers: ProvidersConfig,
    pub github: GithubConfig,
    pub catalogs: CatalogsConfig,
}

/// Installation root overrides, one per known provider.
///
/// Unset entries fall back to each provider's well-known directory
/// (`~/.claude/skills`, `~/.codex/skills`). `~` is expanded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub claude: Option<String>,
    pub codex: Option<String>,
}

/// GitHub API access used by remote catalogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// API root. Defaults to `https://api.github.com`.
    pub api_url: String,
    /// Personal access token; raises the unauthenticated rate limit.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
    /// Maximum number of manifest downloads in flight per catalog.
    pub concurrency: usize,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".into(),
            token: None,
            concurrency: 8,
        }
    }
}

/// Catalog behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogsConfig {
    /// Mirror remote catalogs with `git clone` instead of reading the API.
    pub mirror: bool,
    /// Extra local folders scanned as read-only catalogs of skill templates.
    pub folders: Vec<String>,
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
