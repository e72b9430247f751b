use chrono::NaiveDateTime;
use thiserror::Error;

use crate::config::MonitoredRepo;

/// A release as seen upstream, before its assets are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub id: u64,
    pub created_at: NaiveDateTime,
    pub title: Option<String>,
    pub tag_name: String,
}

impl ReleaseInfo {
    /// The title, or the tag when the title is missing or blank.
    pub fn display_name(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.tag_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub id: u64,
    pub name: String,
    pub download_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRelease {
    pub info: ReleaseInfo,
    pub assets: Vec<FetchedAsset>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("FetchPage: {source}")]
    FetchPage {
        #[from]
        source: interfaces_github_releases::index::FetchPageError,
    },

    #[error("UnexpectedStatus {status} for {url}: {message}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("DeserializeResponseBody: {source}")]
    DeserializeResponseBody {
        #[from]
        source: serde_json::Error,
    },
}

/// Where release download counters come from.
#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
    async fn list_releases(&self, repo: &MonitoredRepo) -> Result<Vec<ReleaseInfo>, SourceError>;

    async fn list_assets(
        &self,
        repo: &MonitoredRepo,
        release_id: u64,
    ) -> Result<Vec<FetchedAsset>, SourceError>;
}

#[derive(Debug, Error)]
pub enum FetchReleasesError {
    #[error("ListReleases {repo}: {source}")]
    ListReleases {
        repo: String,
        source: SourceError,
    },

    #[error("ListAssets {repo} release {release_id}: {source}")]
    ListAssets {
        repo: String,
        release_id: u64,
        source: SourceError,
    },
}

/// Every release of `repo` together with its assets, in upstream order.
pub async fn fetch_releases<S: ReleaseSource>(
    source: &S,
    repo: &MonitoredRepo,
) -> Result<Vec<FetchedRelease>, FetchReleasesError> {
    let releases = source
        .list_releases(repo)
        .await
        .map_err(|source| FetchReleasesError::ListReleases {
            repo: repo.to_string(),
            source,
        })?;

    let mut fetched = Vec::with_capacity(releases.len());
    for info in releases {
        let assets = source.list_assets(repo, info.id).await.map_err(|source| {
            FetchReleasesError::ListAssets {
                repo: repo.to_string(),
                release_id: info.id,
                source,
            }
        })?;
        fetched.push(FetchedRelease { info, assets });
    }

    Ok(fetched)
}
