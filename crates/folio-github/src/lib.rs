#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/kungsiuchun/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! GitHub repository source.
//!
//! Implements [`RepositorySource`] against `GET /users/{owner}/repos`.
//! Requests are unauthenticated, so the API's anonymous rate limit applies
//! and is reported as [`DataError::RateLimited`].
//!
//! # Example
//!
//! ```no_run
//! use folio_core::{CancellationToken, RepositorySource};
//! use folio_github::GithubClient;
//!
//! # async fn example() -> folio_core::Result<()> {
//! let github = GithubClient::new();
//! let repos = github
//!     .fetch_repositories(github.user(), &CancellationToken::new())
//!     .await?;
//! println!("{} repositories", repos.len());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use folio_core::{
    CancellationToken, DataError, FeedProvider, Repository, RepositorySource, Result, cancellable,
};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

/// Public GitHub REST API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Account whose repositories are listed by default.
pub const DEFAULT_USER: &str = "kungsiuchun";

/// The API rejects requests without a User-Agent.
const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

/// Repositories requested per page; only the first page is read.
const PER_PAGE: u32 = 100;

/// GitHub endpoint settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GithubConfig {
    /// API root, without trailing slash.
    pub api_url: String,
    /// Default owner for [`GithubClient::user`].
    pub user: String,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user: DEFAULT_USER.to_string(),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl GithubConfig {
    /// Defaults overridden by `FOLIO_GITHUB_API_URL` and `FOLIO_GITHUB_USER`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("FOLIO_GITHUB_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(user) = env::var("FOLIO_GITHUB_USER") {
            config.user = user;
        }
        config
    }
}

/// Repository source backed by the GitHub REST API.
#[derive(Clone, Debug)]
pub struct GithubClient {
    client: Client,
    config: GithubConfig,
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GithubClient {
    /// Create a client for the public API and the default user.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(Client::new(), GithubConfig::default())
    }

    /// Create a client with a custom HTTP client.
    #[must_use]
    pub const fn with_client(client: Client, config: GithubConfig) -> Self {
        Self { client, config }
    }

    /// Create a client for custom endpoint settings.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Other`] if the HTTP client cannot be built.
    pub fn with_config(config: GithubConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DataError::Other(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Returns the configured default owner.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.config.user
    }

    fn repos_url(&self, owner: &str) -> String {
        format!(
            "{}/users/{}/repos?per_page={}",
            self.config.api_url, owner, PER_PAGE
        )
    }
}

/// Reads `Retry-After` in seconds, when present.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

impl FeedProvider for GithubClient {
    fn name(&self) -> &str {
        "GitHub"
    }

    fn description(&self) -> &str {
        "Public repository metadata from the GitHub REST API"
    }
}

#[async_trait]
impl RepositorySource for GithubClient {
    #[instrument(skip(self, cancel))]
    async fn fetch_repositories(
        &self,
        owner: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Repository>> {
        if owner.is_empty() || owner.contains('/') {
            return Err(DataError::InvalidParameter(format!("Invalid owner: {owner:?}")));
        }

        let url = self.repos_url(owner);
        debug!("GitHub request: {}", url);

        let text = cancellable(cancel, async {
            let response = self
                .client
                .get(&url)
                .header(reqwest::header::USER_AGENT, &self.config.user_agent)
                .header(reqwest::header::ACCEPT, "application/vnd.github+json")
                .send()
                .await
                .map_err(|e| DataError::FetchFailed(e.to_string()))?;

            match response.status() {
                StatusCode::NOT_FOUND => {
                    return Err(DataError::NotFound(format!("User {owner} not found")));
                }
                StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                    return Err(DataError::RateLimited {
                        provider: "GitHub".to_string(),
                        retry_after: retry_after(response.headers()),
                    });
                }
                status if !status.is_success() => {
                    let text = response.text().await.unwrap_or_default();
                    return Err(DataError::FetchFailed(format!("HTTP {status}: {text}")));
                }
                _ => {}
            }

            response
                .text()
                .await
                .map_err(|e| DataError::FetchFailed(e.to_string()))
        })
        .await?;

        let repos: Vec<Repository> = serde_json::from_str(&text)
            .map_err(|e| DataError::ParseFailed(format!("GitHub repositories: {e}")))?;

        debug!(count = repos.len(), "Fetched repositories");
        Ok(repos)
    }
}
