use serde::de::DeserializeOwned;
use tracing::debug;

use interfaces_github_releases::index::{GitHubRest, GitHubRestResult, PER_PAGE};
use interfaces_github_releases::models::{AssetResponse, ErrorResponse, ReleaseResponse};

use crate::config::{MonitoredRepo, Settings};
use crate::source::{FetchedAsset, ReleaseInfo, ReleaseSource, SourceError};

/// Release listing backed by the GitHub REST API.
pub struct GitHubReleaseSource {
    api: GitHubRest,
}

impl GitHubReleaseSource {
    pub fn new(settings: &Settings) -> Self {
        Self {
            api: GitHubRest::with_base_url(&settings.api_key, &settings.api_url),
        }
    }

    pub fn from_api(api: GitHubRest) -> Self {
        Self { api }
    }
}

impl ReleaseSource for GitHubReleaseSource {
    async fn list_releases(&self, repo: &MonitoredRepo) -> Result<Vec<ReleaseInfo>, SourceError> {
        let mut releases = Vec::new();
        let mut page = 1;

        loop {
            let result = self
                .api
                .fetch_repo_releases(&repo.user, &repo.repo, page)
                .await?;
            let batch: Vec<ReleaseResponse> = parse_page(
                result,
                || format!("{}/repos/{repo}/releases?page={page}", self.api.base_url()),
            )?;
            let last_page = batch.len() < PER_PAGE;

            releases.extend(batch.into_iter().map(|release| ReleaseInfo {
                id: release.id,
                created_at: release.created_at.naive_utc(),
                title: release.name,
                tag_name: release.tag_name,
            }));

            if last_page {
                break;
            }
            page += 1;
        }

        debug!("Listed {} releases of {} in {} pages", releases.len(), repo, page);
        Ok(releases)
    }

    async fn list_assets(
        &self,
        repo: &MonitoredRepo,
        release_id: u64,
    ) -> Result<Vec<FetchedAsset>, SourceError> {
        let mut assets = Vec::new();
        let mut page = 1;

        loop {
            let result = self
                .api
                .fetch_release_assets(&repo.user, &repo.repo, release_id, page)
                .await?;
            let batch: Vec<AssetResponse> = parse_page(result, || {
                format!(
                    "{}/repos/{repo}/releases/{release_id}/assets?page={page}",
                    self.api.base_url()
                )
            })?;
            let last_page = batch.len() < PER_PAGE;

            assets.extend(batch.into_iter().map(|asset| FetchedAsset {
                id: asset.id,
                name: asset.name,
                download_count: asset.download_count,
            }));

            if last_page {
                break;
            }
            page += 1;
        }

        Ok(assets)
    }
}

fn parse_page<T, U>(result: GitHubRestResult, url: U) -> Result<Vec<T>, SourceError>
where
    T: DeserializeOwned,
    U: FnOnce() -> String,
{
    let GitHubRestResult { body, status } = result;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|err| err.message)
            .unwrap_or(body);
        return Err(SourceError::UnexpectedStatus {
            url: url(),
            status,
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
