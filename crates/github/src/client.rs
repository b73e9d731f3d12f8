use {
    async_trait::async_trait,
    base64::Engine,
    reqwest::{Response, StatusCode, header},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("skillport/", env!("CARGO_PKG_VERSION"));

/// Kind of a repository tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl ContentEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Read access to a hosted repository tree.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// List the entries of the directory at `path` (`""` for the root).
    async fn get_contents(&self, owner: &str, repo: &str, path: &str)
    -> Result<Vec<ContentEntry>>;

    /// Read the UTF-8 text of the file at `path`.
    async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<String>;
}

/// Raw `/contents` payload. Directories come back as an array, files as an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentEntry>),
    File(FileContent),
}

#[derive(Deserialize)]
struct FileContent {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: EntryKind,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

/// [`RepositoryClient`] over the GitHub REST contents API.
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<Secret<String>>,
}

impl GithubClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }

    /// Point the client at a different API root (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<Secret<String>>) -> Self {
        self.token = token;
        self
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/repos/{owner}/{repo}/contents", self.api_url)
        } else {
            format!("{}/repos/{owner}/{repo}/contents/{path}", self.api_url)
        }
    }

    async fn get(&self, url: &str, path: &str) -> Result<Response> {
        debug!(%url, "GET");
        let mut request = self
            .http
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => Error::NotFound {
                path: path.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                Error::Forbidden {
                    status: status.as_u16(),
                    message: api_message(&body),
                }
            },
            _ => Error::Http {
                status: status.as_u16(),
                body,
            },
        })
    }

    async fn fetch_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<ContentsResponse> {
        let url = self.contents_url(owner, repo, path);
        let response = self.get(&url, path).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::decode(path, e))
    }
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositoryClient for GithubClient {
    async fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<ContentEntry>> {
        match self.fetch_contents(owner, repo, path).await? {
            ContentsResponse::Listing(entries) => Ok(entries),
            ContentsResponse::File(file) => Ok(vec![ContentEntry {
                name: file.name,
                path: file.path,
                kind: file.kind,
            }]),
        }
    }

    async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<String> {
        let file = match self.fetch_contents(owner, repo, path).await? {
            ContentsResponse::File(file) => file,
            ContentsResponse::Listing(_) => {
                return Err(Error::NotAFile {
                    path: path.to_string(),
                });
            },
        };

        match (file.encoding.as_deref(), file.content) {
            (Some("base64"), Some(content)) => decode_base64(path, &content),
            // Files over 1 MB are returned without inline content.
            _ => match file.download_url {
                Some(download_url) => Ok(self.get(&download_url, path).await?.text().await?),
                None => Err(Error::decode(path, "response carried no file content")),
            },
        }
    }
}

fn decode_base64(path: &str, content: &str) -> Result<String> {
    // GitHub wraps the payload at 60 columns.
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| Error::decode(path, e))?;
    String::from_utf8(bytes).map_err(|e| Error::decode(path, e))
}

/// Pull the `message` field out of a GitHub error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| body.to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, base64::engine::general_purpose::STANDARD};

    fn client_for(server: &mockito::Server) -> GithubClient {
        GithubClient::new().with_api_url(server.url())
    }

    #[test]
    fn builds_contents_urls() {
        let client = GithubClient::new();
        assert_eq!(
            client.contents_url("o", "r", ""),
            "https://api.github.com/repos/o/r/contents"
        );
        assert_eq!(
            client.contents_url("o", "r", "/skills/"),
            "https://api.github.com/repos/o/r/contents/skills"
        );
    }

    #[tokio::test]
    async fn lists_directory_entries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/owner/repo/contents")
            .match_header("accept", "application/vnd.github+json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!([
                    {"name": "skills", "path": "skills", "type": "dir", "sha": "abc"},
                    {"name": "README.md", "path": "README.md", "type": "file", "size": 12},
                    {"name": "vendor", "path": "vendor", "type": "submodule"}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let entries = client_for(&server)
            .get_contents("owner", "repo", "")
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_dir());
        assert_eq!(entries[1].kind, EntryKind::File);
        assert_eq!(entries[2].kind, EntryKind::Submodule);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn decodes_wrapped_base64_file_content() {
        let text = "---\nname: demo\n---\nBody text that is long enough to wrap.\n";
        let encoded = STANDARD.encode(text);
        let wrapped = encoded
            .as_bytes()
            .chunks(60)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/owner/repo/contents/skills/demo/SKILL.md")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "name": "SKILL.md",
                    "path": "skills/demo/SKILL.md",
                    "type": "file",
                    "encoding": "base64",
                    "content": wrapped,
                })
                .to_string(),
            )
            .create_async()
            .await;

        let content = client_for(&server)
            .get_file_content("owner", "repo", "skills/demo/SKILL.md")
            .await
            .unwrap();
        assert_eq!(content, text);
    }

    #[tokio::test]
    async fn maps_404_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/owner/repo/contents/missing/SKILL.md")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .get_file_content("owner", "repo", "missing/SKILL.md")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn maps_rate_limit_to_forbidden_with_api_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/owner/repo/contents")
            .with_status(403)
            .with_body(r#"{"message":"API rate limit exceeded"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .get_contents("owner", "repo", "")
            .await
            .unwrap_err();
        match err {
            Error::Forbidden { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API rate limit exceeded");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn sends_bearer_token_when_configured() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/owner/repo/contents")
            .match_header("authorization", "Bearer secret-token")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let entries = client_for(&server)
            .with_token(Some(Secret::new("secret-token".to_string())))
            .get_contents("owner", "repo", "")
            .await
            .unwrap();
        assert!(entries.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reading_a_directory_as_file_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/owner/repo/contents/skills")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let err = client_for(&server)
            .get_file_content("owner", "repo", "skills")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotAFile { .. }));
    }
}
