//! Thin client for the GitHub REST release endpoints.
//!
//! - `index` sends one page request and hands back the raw body
//! - `models` holds the response shapes callers deserialize into

pub mod index;
pub mod models;
