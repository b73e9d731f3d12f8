use std::fmt;

/// An `owner/repo` pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parse `owner/repo` from a catalog URL.
    ///
    /// Accepts `owner/repo`, `github.com/owner/repo`, `https://github.com/owner/repo`
    /// and the same with a trailing slash, `.git` suffix, or `/tree/<branch>/...`
    /// tail copied from the browser.
    pub fn parse(url: &str) -> Option<Self> {
        let s = url.trim().trim_end_matches('/');
        let s = s
            .strip_prefix("https://")
            .or_else(|| s.strip_prefix("http://"))
            .unwrap_or(s);

        let mut parts = s.split('/');
        let first = parts.next()?.trim();
        let (owner, repo_part) = if first.eq_ignore_ascii_case("github.com")
            || first.eq_ignore_ascii_case("www.github.com")
        {
            (parts.next()?.trim(), parts.next()?.trim())
        } else if first.contains('.') || first.contains(':') {
            // Some other host.
            return None;
        } else {
            let repo = parts.next()?.trim();
            if parts.next().is_some() {
                return None;
            }
            (first, repo)
        };

        if let Some(extra) = parts.next()
            && extra != "tree"
            && extra != "blob"
        {
            return None;
        }

        let repo = repo_part.strip_suffix(".git").unwrap_or(repo_part);
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.repo)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
