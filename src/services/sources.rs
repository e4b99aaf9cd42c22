//! Source traits for the external film catalogs.
//!
//! Implementations catch every transport, status and decode failure at this
//! boundary: callers only ever see "data" or "no data".

use async_trait::async_trait;

use super::omdb::OmdbTitle;
use super::tmdb::{MovieDetails, MovieSearchResult, TvDetails, TvSearchResult};
use crate::models::MediaKind;

/// Failure inside a source client. Never crosses the trait boundary.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{0} API key not configured")]
    Unconfigured(&'static str),

    #[error("request failed: {0}")]
    Http(reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no result: {0}")]
    NotFound(String),
}

// Request URLs carry the API key, so they never reach the error text
impl From<reqwest::Error> for SourceError {
    fn from(error: reqwest::Error) -> Self {
        SourceError::Http(error.without_url())
    }
}

/// The richer catalog: search plus detail with credits, ids and videos
#[async_trait]
pub trait PrimarySource: Send + Sync {
    async fn search_movies(&self, query: &str, year: Option<i32>) -> Vec<MovieSearchResult>;

    async fn search_series(&self, query: &str, year: Option<i32>) -> Vec<TvSearchResult>;

    async fn movie_details(&self, id: i64) -> Option<MovieDetails>;

    async fn series_details(&self, id: i64) -> Option<TvDetails>;
}

/// The simpler catalog: exact title or IMDb id lookup
#[async_trait]
pub trait FallbackSource: Send + Sync {
    async fn lookup_title(
        &self,
        title: &str,
        year: Option<i32>,
        kind: MediaKind,
    ) -> Option<OmdbTitle>;

    async fn lookup_imdb_id(&self, imdb_id: &str) -> Option<OmdbTitle>;
}
