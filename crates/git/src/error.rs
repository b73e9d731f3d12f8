use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("git is not installed or not on PATH")]
    NotInstalled,
    #[error("git clone failed: {0}")]
    CloneFailed(String),
    #[error("git pull failed: {0}")]
    PullFailed(String),
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },
    #[error("failed to execute `{operation}`: {source}")]
    CommandExecution {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    #[must_use]
    pub fn command_execution(operation: &'static str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotInstalled;
        }
        Self::CommandExecution { operation, source }
    }

    #[must_use]
    pub fn directory_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DirectoryNotFound { path: path.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
