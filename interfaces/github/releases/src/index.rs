use reqwest::{Client, StatusCode};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const USER_AGENT: &str = "github-release-history";
pub const PER_PAGE: usize = 100;

pub struct GitHubRestResult {
    pub body: String,
    pub status: StatusCode,
}

/// Holds the HTTP client and credentials shared by every request of a run.
#[derive(Debug, Clone)]
pub struct GitHubRest {
    client: Client,
    base_url: String,
    token: String,
}

impl GitHubRest {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One page (1-based) of `GET /repos/{owner}/{name}/releases`.
    pub async fn fetch_repo_releases(
        &self,
        owner: &str,
        name: &str,
        page: u32,
    ) -> Result<GitHubRestResult, FetchPageError> {
        let url = format!("{}/repos/{owner}/{name}/releases", self.base_url);
        self.get_page(&url, page).await
    }

    /// One page (1-based) of `GET /repos/{owner}/{name}/releases/{release_id}/assets`.
    pub async fn fetch_release_assets(
        &self,
        owner: &str,
        name: &str,
        release_id: u64,
        page: u32,
    ) -> Result<GitHubRestResult, FetchPageError> {
        let url = format!(
            "{}/repos/{owner}/{name}/releases/{release_id}/assets",
            self.base_url
        );
        self.get_page(&url, page).await
    }

    async fn get_page(&self, url: &str, page: u32) -> Result<GitHubRestResult, FetchPageError> {
        let response = self
            .client
            .get(url)
            .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())])
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|source| FetchPageError::RequestSend { source })?;

        let status = response.status();

        let body = response
            .text()
            .await
            .map_err(|source| FetchPageError::ResponseRead { source })?;

        Ok(GitHubRestResult { body, status })
    }
}

#[derive(Debug, Error)]
pub enum FetchPageError {
    #[error("RequestSend: {source}")]
    RequestSend {
        source: reqwest::Error,
    },

    #[error("ResponseRead: {source}")]
    ResponseRead {
        source: reqwest::Error,
    },
}
