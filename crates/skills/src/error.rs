use std::{
    io,
    path::{Path, PathBuf},
};

use crate::types::Provider;

/// A manifest that cannot be turned into a skill.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("SKILL.md front matter is missing its closing ---")]
    UnterminatedFrontmatter,
    #[error("invalid SKILL.md front matter: {0}")]
    InvalidFrontmatter(String),
    #[error("SKILL.md does not declare a name")]
    MissingName,
}

/// Failure to enumerate a skill source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    #[must_use]
    pub fn from_io(path: &Path, source: &io::Error) -> Self {
        let location = path.display().to_string();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(location),
            io::ErrorKind::PermissionDenied => Self::Permission(location),
            _ => Self::Transport(format!("{location}: {source}")),
        }
    }
}

impl From<skillport_github::Error> for FetchError {
    fn from(e: skillport_github::Error) -> Self {
        match e {
            skillport_github::Error::NotFound { path } => Self::NotFound(path),
            skillport_github::Error::Forbidden { message, .. } => Self::Permission(message),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<skillport_git::Error> for FetchError {
    fn from(e: skillport_git::Error) -> Self {
        match e {
            skillport_git::Error::InvalidUrl(url) => Self::InvalidUrl(url),
            skillport_git::Error::DirectoryNotFound { path } => {
                Self::NotFound(path.display().to_string())
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Failure to copy a skill into, or remove it from, a provider.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("no providers selected")]
    EmptyProviderSet,
    #[error("{provider} skills directory is not available")]
    ProviderRootMissing { provider: Provider },
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },
    #[error("{path} already exists and is not a skill directory")]
    PathConflict { path: PathBuf },
    #[error("unsafe skill location '{0}'")]
    UnsafePath(String),
    #[error("'{key}' is not installed for {provider}")]
    NotInstalled { key: String, provider: Provider },
    #[error("failed to render SKILL.md: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied { path };
        }
        Self::Io { path, source }
    }
}

/// Failure to save an edited skill.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("'{key}' has no local directory to write to")]
    NoLocalPath { key: String },
    #[error("skill directory does not exist: {path}")]
    DirectoryMissing { path: PathBuf },
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },
    #[error("failed to render SKILL.md: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WriteError {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied { path };
        }
        Self::Io { path, source }
    }
}

/// Failure to read or write the persisted catalog registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
