use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::services::{hype, poster_cache};

/// Which kind of title a normalized record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }
}

/// User-supplied hint narrowing which catalogs the resolver searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentHint {
    Movie,
    Series,
    Documentary,
}

impl ContentHint {
    pub fn searches_movies(hint: Option<Self>) -> bool {
        hint != Some(ContentHint::Series)
    }

    pub fn searches_series(hint: Option<Self>) -> bool {
        !matches!(hint, Some(ContentHint::Movie) | Some(ContentHint::Documentary))
    }
}

/// Which external source(s) contributed to a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    #[serde(rename = "primary")]
    Primary,
    #[serde(rename = "fallback")]
    Fallback,
    #[serde(rename = "primary+fallback")]
    PrimaryWithFallback,
    #[default]
    #[serde(rename = "none")]
    None,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Primary => write!(f, "primary"),
            Provenance::Fallback => write!(f, "fallback"),
            Provenance::PrimaryWithFallback => write!(f, "primary+fallback"),
            Provenance::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastCredit {
    pub name: String,
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub order: i32,
}

/// Externally hosted trailer reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trailer {
    pub name: String,
    pub key: String,
    pub site: String,
}

impl Trailer {
    pub fn watch_url(&self) -> Option<String> {
        (self.site == "YouTube").then(|| format!("https://www.youtube.com/watch?v={}", self.key))
    }
}

/// Normalized metadata record produced by the formatters.
///
/// Provider payloads never leave `services::format`; everything downstream
/// (persistence, mood tags, hype score) reads this shape only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogEntry {
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub release_date: String,
    pub runtime: Option<i32>,
    pub genres: Vec<String>,
    pub cast: Vec<CastCredit>,
    /// Role -> names in credit order
    pub crew: BTreeMap<String, Vec<String>>,
    pub imdb_rating: Option<String>,
    pub rt_rating: Option<String>,
    pub metacritic_rating: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub trailers: Vec<Trailer>,
    pub tagline: String,
    pub original_language: String,
    pub media_kind: Option<MediaKind>,
    pub provenance: Provenance,
    pub cached_poster_path: Option<String>,
}

impl CatalogEntry {
    /// Record for a lookup where no source produced anything
    pub fn unmatched() -> Self {
        Self::default()
    }

    pub fn is_matched(&self) -> bool {
        self.provenance != Provenance::None
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }

    pub fn crew_for(&self, role: &str) -> &[String] {
        self.crew.get(role).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchStatus {
    #[default]
    WantToWatch,
    Watching,
    Watched,
    Abandoned,
}

impl WatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::WantToWatch => "want_to_watch",
            WatchStatus::Watching => "watching",
            WatchStatus::Watched => "watched",
            WatchStatus::Abandoned => "abandoned",
        }
    }
}

impl FromStr for WatchStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "want_to_watch" => Ok(WatchStatus::WantToWatch),
            "watching" => Ok(WatchStatus::Watching),
            "watched" => Ok(WatchStatus::Watched),
            "abandoned" => Ok(WatchStatus::Abandoned),
            other => anyhow::bail!("unknown watch status '{}'", other),
        }
    }
}

/// User fields for a catalog item that has not been stored yet
#[derive(Debug, Clone, Default)]
pub struct NewCatalogItem {
    pub title: String,
    pub director: Option<String>,
    pub release_year: Option<i32>,
    pub status: WatchStatus,
    pub user_rating: Option<i32>,
    pub user_notes: String,
    pub mood_tags: BTreeSet<String>,
}

/// Persisted catalog item: user fields plus the embedded metadata record
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub id: i64,
    pub title: String,
    pub director: Option<String>,
    pub release_year: Option<i32>,
    pub status: WatchStatus,
    /// 1-10
    pub user_rating: Option<i32>,
    pub user_notes: String,
    pub mood_tags: BTreeSet<String>,
    pub metadata: CatalogEntry,
    /// Last metadata refresh; `None` until first enrichment
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Relative media path of the cached poster, or empty when nothing is cached.
    /// External poster URLs are never returned here.
    pub fn poster_url(&self) -> String {
        self.metadata
            .cached_poster_path
            .as_deref()
            .map(poster_cache::normalize_media_path)
            .unwrap_or_default()
    }

    pub fn imdb_rating(&self) -> &str {
        self.metadata.imdb_rating.as_deref().unwrap_or("")
    }

    pub fn rt_rating(&self) -> &str {
        self.metadata.rt_rating.as_deref().unwrap_or("")
    }

    pub fn synopsis(&self) -> &str {
        &self.metadata.overview
    }

    pub fn genres(&self) -> &[String] {
        &self.metadata.genres
    }

    pub fn cast(&self) -> &[CastCredit] {
        &self.metadata.cast
    }

    pub fn hype_score(&self) -> f64 {
        hype::item_hype_score(self)
    }

    pub fn needs_metadata_refresh(&self, days: i64, now: DateTime<Utc>) -> bool {
        match self.last_updated {
            Some(last) => last < now - Duration::days(days),
            None => true,
        }
    }

    /// Returns true if the tag was not already present
    pub fn add_mood_tag(&mut self, tag: &str) -> bool {
        self.mood_tags.insert(tag.to_string())
    }

    pub fn remove_mood_tag(&mut self, tag: &str) -> bool {
        self.mood_tags.remove(tag)
    }
}

impl fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(year) = self.release_year {
            write!(f, " ({})", year)?;
        }
        if let Some(ref director) = self.director {
            write!(f, " - {}", director)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_item() -> CatalogItem {
    CatalogItem {
        id: 1,
        title: "The Matrix".to_string(),
        director: Some("The Wachowskis".to_string()),
        release_year: Some(1999),
        status: WatchStatus::Watched,
        user_rating: Some(9),
        user_notes: "Amazing sci-fi movie!".to_string(),
        mood_tags: ["intense", "mind-bending"].iter().map(|t| t.to_string()).collect(),
        metadata: CatalogEntry::default(),
        last_updated: None,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(test_item().to_string(), "The Matrix (1999) - The Wachowskis");
    }

    #[test]
    fn test_poster_url_prefers_cached_path() {
        let mut item = test_item();
        item.metadata.poster_url = Some("https://example.com/poster.jpg".to_string());
        item.metadata.cached_poster_path = Some("/media/cache/matrix.jpg".to_string());
        assert_eq!(item.poster_url(), "cache/matrix.jpg");

        // External poster URLs are not exposed as a local path
        item.metadata.cached_poster_path = None;
        assert_eq!(item.poster_url(), "");
    }

    #[test]
    fn test_needs_metadata_refresh() {
        let now = Utc::now();
        let mut item = test_item();
        assert!(item.needs_metadata_refresh(30, now));

        item.last_updated = Some(now - Duration::days(3));
        assert!(!item.needs_metadata_refresh(30, now));

        item.last_updated = Some(now - Duration::days(31));
        assert!(item.needs_metadata_refresh(30, now));
    }

    #[test]
    fn test_mood_tag_edits() {
        let mut item = test_item();
        assert!(!item.add_mood_tag("intense"));
        assert!(item.add_mood_tag("dark"));
        assert!(item.remove_mood_tag("dark"));
        assert!(!item.remove_mood_tag("dark"));
        assert_eq!(item.mood_tags.len(), 2);
    }

    #[test]
    fn test_provenance_serde_names() {
        let json = serde_json::to_string(&Provenance::PrimaryWithFallback).unwrap();
        assert_eq!(json, "\"primary+fallback\"");
        let parsed: Provenance = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(parsed, Provenance::None);
    }

    #[test]
    fn test_empty_json_is_unmatched_entry() {
        let entry: CatalogEntry = serde_json::from_str("{}").unwrap();
        assert!(!entry.is_matched());
        assert!(entry.genres.is_empty());
    }

    #[test]
    fn test_content_hint_pools() {
        assert!(ContentHint::searches_movies(None));
        assert!(ContentHint::searches_series(None));
        assert!(!ContentHint::searches_movies(Some(ContentHint::Series)));
        assert!(!ContentHint::searches_series(Some(ContentHint::Documentary)));
        assert!(ContentHint::searches_movies(Some(ContentHint::Documentary)));
    }
}
