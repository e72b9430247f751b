use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One entry of `GET /repos/{owner}/{repo}/releases`. Only the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseResponse {
    pub id: u64,
    pub tag_name: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of `GET /repos/{owner}/{repo}/releases/{id}/assets`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetResponse {
    pub id: u64,
    pub name: String,
    pub download_count: u64,
}

/// Error body GitHub returns alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
