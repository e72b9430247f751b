//! Daily download history for GitHub release assets
//!
//! - `source` / `github`: where release counters come from
//! - `merge`: folds counters into the per-repository snapshot
//! - `snapshot/`: JSON models and on-disk layout under `data/`
//! - `git`: clone/pull/commit/push of the tracking repository
//! - Requires REPO_NAME, REPO_USER and API_KEY env vars

pub mod config;
pub mod git;
pub mod github;
pub mod merge;
pub mod run;
pub mod snapshot;
pub mod source;
