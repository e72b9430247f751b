use chrono::Utc;
use thiserror::Error;
use tracing::info;

use projects_release_history::config::{
    load_monitored_repos, LoadMonitoredReposError, Settings, SettingsError,
};
use projects_release_history::git::{
    commit_and_push, configure_identity, sync_tracking_repo, PublishError, SyncTrackingRepoError,
};
use projects_release_history::github::GitHubReleaseSource;
use projects_release_history::run::{
    commit_message, update_all, write_updates, RunDate, UpdateRepoError,
};
use projects_release_history::snapshot::store::SaveSnapshotError;

#[derive(Debug, Error)]
pub enum MainError {
    #[error("TracingInit: {source}")]
    TracingInit {
        #[source]
        source: utils_trace::TracingInitError,
    },
    #[error("Settings: {source}")]
    Settings {
        #[source]
        source: SettingsError,
    },
    #[error("SyncTrackingRepo: {source}")]
    SyncTrackingRepo {
        #[source]
        source: SyncTrackingRepoError,
    },
    #[error("LoadMonitoredRepos: {source}")]
    LoadMonitoredRepos {
        #[source]
        source: LoadMonitoredReposError,
    },
    #[error("UpdateRepos: {source}")]
    UpdateRepos {
        #[source]
        source: UpdateRepoError,
    },
    #[error("WriteSnapshots: {source}")]
    WriteSnapshots {
        #[source]
        source: SaveSnapshotError,
    },
    #[error("Publish: {source}")]
    Publish {
        #[source]
        source: PublishError,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), MainError> {
    dotenvy::dotenv().ok();

    utils_trace::init("info")
        .map_err(|source| MainError::TracingInit { source })?;

    let settings = Settings::from_env()
        .map_err(|source| MainError::Settings { source })?;
    let run_date = RunDate::local();

    let git = sync_tracking_repo(&settings.tracking_repo_path(), &settings.clone_url())
        .await
        .map_err(|source| MainError::SyncTrackingRepo { source })?;

    let repos = load_monitored_repos(git.dir())
        .await
        .map_err(|source| MainError::LoadMonitoredRepos { source })?;
    info!("Tracking {} repositories for {}", repos.len(), run_date.yesterday);

    let source = GitHubReleaseSource::new(&settings);

    let started = Utc::now().naive_utc();
    let updates = update_all(&source, git.dir(), &repos, run_date.yesterday)
        .await
        .map_err(|source| MainError::UpdateRepos { source })?;
    write_updates(&updates)
        .await
        .map_err(|source| MainError::WriteSnapshots { source })?;
    let finished = Utc::now().naive_utc();

    configure_identity().await;

    let message = commit_message(run_date.today, started, finished);
    let pushed = commit_and_push(&git, &message, &settings.push_url())
        .await
        .map_err(|source| MainError::Publish { source })?;

    info!("Run for {} finished, pushed: {}", run_date.today, pushed);

    Ok(())
}
