use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use interfaces_github_releases::index::DEFAULT_API_URL;

pub const REPOS_FILE: &str = "repos.json";
pub const GIT_HOST: &str = "github.com";

/// Runtime settings, read once from the environment in `main`.
#[derive(Clone)]
pub struct Settings {
    /// Name of the tracking repository the snapshots are committed to.
    pub repo_name: String,
    /// Owner of the tracking repository.
    pub repo_user: String,
    pub api_key: String,
    /// Directory the tracking repository is cloned into.
    pub workdir: PathBuf,
    pub api_url: String,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("MissingVariable: {name} is not set")]
    MissingVariable { name: &'static str },
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(SettingsError::MissingVariable { name })
        };

        Ok(Self {
            repo_name: required("REPO_NAME")?,
            repo_user: required("REPO_USER")?,
            api_key: required("API_KEY")?,
            workdir: lookup("WORKDIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            api_url: lookup("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }

    /// Local path of the tracking repository working copy.
    pub fn tracking_repo_path(&self) -> PathBuf {
        self.workdir.join(&self.repo_name)
    }

    pub fn clone_url(&self) -> String {
        format!("https://{GIT_HOST}/{}/{}.git", self.repo_user, self.repo_name)
    }

    /// Carries the token. Never log it.
    pub fn push_url(&self) -> String {
        format!(
            "https://{}:{}@{GIT_HOST}/{}/{}.git",
            self.repo_user, self.api_key, self.repo_user, self.repo_name
        )
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("repo_name", &self.repo_name)
            .field("repo_user", &self.repo_user)
            .field("api_key", &"<redacted>")
            .field("workdir", &self.workdir)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// One `{ "user": ..., "repo": ... }` entry of `repos.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitoredRepo {
    pub user: String,
    pub repo: String,
}

impl fmt::Display for MonitoredRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user, self.repo)
    }
}

#[derive(Debug, Error)]
pub enum LoadMonitoredReposError {
    #[error("ReadFile {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Deserialize {path}: {source}")]
    Deserialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub async fn load_monitored_repos(root: &Path) -> Result<Vec<MonitoredRepo>, LoadMonitoredReposError> {
    let path = root.join(REPOS_FILE);
    let raw = tokio::fs::read(&path)
        .await
        .map_err(|source| LoadMonitoredReposError::ReadFile {
            path: path.clone(),
            source,
        })?;

    serde_json::from_slice(&raw).map_err(|source| LoadMonitoredReposError::Deserialize { path, source })
}
