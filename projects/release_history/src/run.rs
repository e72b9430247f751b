use std::path::{Path, PathBuf};

use chrono::{Days, Local, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;
use tracing::info;

use crate::config::MonitoredRepo;
use crate::merge::merge;
use crate::snapshot::models::Snapshot;
use crate::snapshot::store::{
    load_snapshot, save_snapshot, snapshot_path, LoadSnapshotError, SaveSnapshotError,
};
use crate::source::{fetch_releases, FetchReleasesError, ReleaseSource};

/// The logical date of a run. Counts observed today are filed under
/// `yesterday`, the last complete day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDate {
    pub today: NaiveDate,
    pub yesterday: NaiveDate,
}

impl RunDate {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            yesterday: today - Days::new(1),
        }
    }

    pub fn local() -> Self {
        Self::new(Local::now().date_naive())
    }
}

/// A merged snapshot waiting to be written.
#[derive(Debug, Clone)]
pub struct RepoUpdate {
    pub repo: MonitoredRepo,
    pub path: PathBuf,
    pub snapshot: Snapshot,
}

#[derive(Debug, Error)]
pub enum UpdateRepoError {
    #[error("LoadSnapshot: {source}")]
    LoadSnapshot {
        #[from]
        source: LoadSnapshotError,
    },

    #[error("FetchReleases: {source}")]
    FetchReleases {
        #[from]
        source: FetchReleasesError,
    },
}

pub async fn update_repo<S: ReleaseSource>(
    source: &S,
    root: &Path,
    repo: &MonitoredRepo,
    day: NaiveDate,
) -> Result<RepoUpdate, UpdateRepoError> {
    info!("Processing {} {}", repo.user, repo.repo);

    let path = snapshot_path(root, &repo.user, &repo.repo);
    let existing = load_snapshot(&path).await?;
    let fetched = fetch_releases(source, repo).await?;
    info!("Fetched {} releases of {}", fetched.len(), repo);

    Ok(RepoUpdate {
        repo: repo.clone(),
        path,
        snapshot: merge(existing, &fetched, day),
    })
}

/// Merges every repository in order. The first failure aborts the batch and
/// nothing is written.
pub async fn update_all<S: ReleaseSource>(
    source: &S,
    root: &Path,
    repos: &[MonitoredRepo],
    day: NaiveDate,
) -> Result<Vec<RepoUpdate>, UpdateRepoError> {
    let mut updates = Vec::with_capacity(repos.len());
    for repo in repos {
        updates.push(update_repo(source, root, repo, day).await?);
    }
    Ok(updates)
}

pub async fn write_updates(updates: &[RepoUpdate]) -> Result<(), SaveSnapshotError> {
    for update in updates {
        save_snapshot(&update.path, &update.snapshot).await?;
    }
    Ok(())
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Seconds, then six digits of microseconds only when there are any.
fn isoformat(at: NaiveDateTime) -> String {
    let micros = at.nanosecond() / 1_000;
    if micros == 0 {
        at.format(TIMESTAMP_FORMAT).to_string()
    } else {
        format!("{}.{micros:06}", at.format(TIMESTAMP_FORMAT))
    }
}

pub fn commit_message(today: NaiveDate, started: NaiveDateTime, finished: NaiveDateTime) -> String {
    format!(
        "Update for {today}\n\nStarted at: {}\nFinished at: {}",
        isoformat(started),
        isoformat(finished),
    )
}
