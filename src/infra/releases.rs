//! Release listing
//!
//! Queries the GitHub releases API for the tags of a repository, with retry
//! and exponential backoff on transient failures.

use std::time::Duration;

use serde::Deserialize;

use crate::config::defaults;
use crate::core::release::{filter_releases, ReleaseError};

/// Number of releases requested per page
const PAGE_SIZE: usize = 100;

/// One release as returned by the API
#[derive(Debug, Clone, Deserialize)]
struct ApiRelease {
    tag_name: String,
    #[serde(default)]
    draft: bool,
}

/// Client for listing the releases of one repository
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    /// HTTP client
    client: reqwest::Client,
    /// API base URL (e.g. `https://api.github.com`)
    api_url: String,
    /// Repository owner
    owner: String,
    /// Repository name
    repo: String,
    /// Maximum attempts per page
    max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds)
    base_delay_ms: u64,
}

impl ReleaseClient {
    /// Create a client for `owner/repo` at `api_url`
    pub fn new(api_url: &str, owner: &str, repo: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_url: api_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            max_retries: defaults::MAX_API_RETRIES,
            base_delay_ms: 1000,
        }
    }

    /// Override retry settings
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, base_delay_ms: u64) -> Self {
        self.max_retries = max_retries.max(1);
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// List every published release tag, newest pages first as the API returns them
    pub async fn list_tags(&self) -> Result<Vec<String>, ReleaseError> {
        let mut tags = Vec::new();
        let mut page = 1;

        loop {
            let releases = self.fetch_page(page).await?;
            let count = releases.len();
            tags.extend(
                releases
                    .into_iter()
                    .filter(|r| !r.draft)
                    .map(|r| r.tag_name),
            );

            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        tracing::debug!("Found {} releases for {}/{}", tags.len(), self.owner, self.repo);
        Ok(tags)
    }

    /// List release tags at or above `min_version`, in ascending order
    pub async fn list_releases(&self, min_version: &str) -> Result<Vec<String>, ReleaseError> {
        let tags = self.list_tags().await?;
        filter_releases(&tags, min_version)
    }

    fn page_url(&self, page: usize) -> String {
        format!(
            "{}/repos/{}/{}/releases?per_page={PAGE_SIZE}&page={page}",
            self.api_url, self.owner, self.repo
        )
    }

    async fn fetch_page(&self, page: usize) -> Result<Vec<ApiRelease>, ReleaseError> {
        let url = self.page_url(page);
        let mut attempts = 0;
        let mut delay_ms = self.base_delay_ms;

        loop {
            attempts += 1;
            match self.fetch_page_once(&url).await {
                Ok(releases) => return Ok(releases),
                // Malformed bodies are not retried
                Err(e @ ReleaseError::InvalidResponse { .. }) => return Err(e),
                Err(e) if attempts >= self.max_retries => return Err(e),
                Err(e) => {
                    tracing::warn!("Listing releases failed (attempt {attempts}): {e}");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(30_000);
                }
            }
        }
    }

    async fn fetch_page_once(&self, url: &str) -> Result<Vec<ApiRelease>, ReleaseError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", format!("verforge/{}", env!("CARGO_PKG_VERSION")))
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .map_err(|e| ReleaseError::Network {
                url: url.to_string(),
                error: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ReleaseError::Network {
                url: url.to_string(),
                error: format!("HTTP {}", response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ReleaseError::InvalidResponse {
                url: url.to_string(),
                error: e.to_string(),
            })
    }
}
