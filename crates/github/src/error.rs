#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {path}")]
    NotFound { path: String },
    #[error("access denied (HTTP {status}): {message}")]
    Forbidden { status: u16, message: String },
    #[error("GitHub API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("{path} is a directory, not a file")]
    NotAFile { path: String },
}

impl Error {
    #[must_use]
    pub fn decode(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure means the requested path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
