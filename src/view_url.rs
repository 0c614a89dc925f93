//! Links to a bundle version on the repository's hosting provider.

use std::sync::OnceLock;

use regex_lite::Regex;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ViewUrlError {
    #[error("Invalid git SSH URL: {0}")]
    InvalidSourceUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostingProvider {
    GitHub,
    GitLab,
    Bitbucket,
}

impl HostingProvider {
    const ALL: [HostingProvider; 3] = [
        HostingProvider::GitHub,
        HostingProvider::GitLab,
        HostingProvider::Bitbucket,
    ];

    pub fn domain(self) -> &'static str {
        match self {
            HostingProvider::GitHub => "github.com",
            HostingProvider::GitLab => "gitlab.com",
            HostingProvider::Bitbucket => "bitbucket.org",
        }
    }

    /// The provider serving `host`, either directly or through a subdomain.
    pub fn for_host(host: &str) -> Option<HostingProvider> {
        Self::ALL.into_iter().find(|provider| {
            let domain = provider.domain();
            host == domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    pub fn browse_url(self, repository_url: &str, version: &str) -> String {
        match self {
            HostingProvider::GitHub => format!("{repository_url}/tree/{version}"),
            HostingProvider::GitLab => format!("{repository_url}/-/tree/{version}"),
            HostingProvider::Bitbucket => format!("{repository_url}/src/{version}"),
        }
    }
}

/// Builds a browsable link to `version` of the repository at `source_url`.
///
/// There is nothing to link to without a version, or when the host is not a known
/// provider. scp-like SSH addresses are rewritten to https first.
pub fn build_view_url(
    source_url: &str,
    version: Option<&str>,
) -> Result<Option<String>, ViewUrlError> {
    let version = match version {
        Some(version) if !version.is_empty() => version,
        _ => return Ok(None),
    };

    let url = if is_scp_like(source_url) {
        ssh_to_https(source_url)?
    } else {
        source_url.to_owned()
    };

    let provider = Url::parse(&url)
        .ok()
        .and_then(|parsed| parsed.host_str().and_then(HostingProvider::for_host));

    Ok(provider.map(|provider| provider.browse_url(&url, version)))
}

/// `user@host:path`: the user part ends before any `/` or `:`.
fn is_scp_like(url: &str) -> bool {
    if url.contains("://") {
        return false;
    }
    match url.find('@') {
        Some(at) => !url[..at].contains(['/', ':']),
        None => false,
    }
}

/// `git@host:org/repo.git` -> `https://host/org/repo`
pub fn ssh_to_https(url: &str) -> Result<String, ViewUrlError> {
    static SCP_LIKE: OnceLock<Regex> = OnceLock::new();
    let re = SCP_LIKE.get_or_init(|| {
        Regex::new(r"^[^@/:\s]+@(?P<host>[^@/:\s]+):(?P<path>\S+)$").unwrap()
    });

    let captures = re
        .captures(url)
        .ok_or_else(|| ViewUrlError::InvalidSourceUrl(url.to_owned()))?;
    let host = &captures["host"];
    let path = captures["path"].trim_start_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    if path.is_empty() {
        return Err(ViewUrlError::InvalidSourceUrl(url.to_owned()));
    }

    Ok(format!("https://{host}/{path}"))
}
