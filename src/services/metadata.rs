use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::format;
use super::mood::derive_mood_tags;
use super::omdb::{OmdbClient, OmdbTitle};
use super::poster_cache::PosterCache;
use super::resolver::{CandidateResolver, ResolveQuery};
use super::sources::{FallbackSource, PrimarySource};
use super::tmdb::TmdbClient;
use crate::config::AppConfig;
use crate::models::{CatalogEntry, CatalogItem, ContentHint, MediaKind, Provenance};

/// Result of refreshing one catalog item
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichOutcome {
    /// Metadata younger than the refresh interval, nothing fetched
    Fresh,
    /// New metadata stored on the item
    Updated {
        provenance: Provenance,
        poster: Option<String>,
    },
    /// Neither source produced a record; the item is unchanged
    NoMatch,
}

pub struct MetadataService {
    resolver: CandidateResolver,
    fallback: Arc<dyn FallbackSource>,
    posters: PosterCache,
    refresh_days: i64,
}

impl MetadataService {
    pub fn new(
        primary: Arc<dyn PrimarySource>,
        fallback: Arc<dyn FallbackSource>,
        posters: PosterCache,
        refresh_days: i64,
    ) -> Self {
        Self {
            resolver: CandidateResolver::new(primary),
            fallback,
            posters,
            refresh_days,
        }
    }

    /// TMDB primary, OMDb fallback and the poster cache, all from configuration
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let metadata = &config.metadata;
        let lookup_timeout = Duration::from_secs(metadata.lookup_timeout_secs);
        let image_timeout = Duration::from_secs(metadata.image_timeout_secs);

        let tmdb = TmdbClient::new(metadata.tmdb_api_key.clone(), &metadata.tmdb_base_url, lookup_timeout)
            .context("Failed to build TMDB client")?;
        let omdb = OmdbClient::new(metadata.omdb_api_key.clone(), &metadata.omdb_base_url, lookup_timeout)
            .context("Failed to build OMDb client")?;
        let posters = PosterCache::new(
            config.paths.poster_cache_dir(),
            config.paths.media_root.clone(),
            image_timeout,
        )
        .context("Failed to build poster downloader")?;

        Ok(Self::new(
            Arc::new(tmdb),
            Arc::new(omdb),
            posters,
            metadata.refresh_days,
        ))
    }

    pub fn posters(&self) -> &PosterCache {
        &self.posters
    }

    pub fn refresh_days(&self) -> i64 {
        self.refresh_days
    }

    /// Get metadata for a title
    /// Priority: TMDB -> OMDb, then OMDb ratings to fill gaps in a TMDB record
    pub async fn fetch(&self, title: &str, director: Option<&str>, year: Option<i32>) -> CatalogEntry {
        self.fetch_with_hint(title, director, year, None).await
    }

    pub async fn fetch_with_hint(
        &self,
        title: &str,
        director: Option<&str>,
        year: Option<i32>,
        hint: Option<ContentHint>,
    ) -> CatalogEntry {
        tracing::debug!("Fetching metadata for: {} ({:?})", title, year);

        let query = ResolveQuery::new(title)
            .year(year)
            .director(director)
            .hint(hint);

        if let Some(mut entry) = self.resolver.resolve(&query).await {
            entry.provenance = Provenance::Primary;
            tracing::info!(
                "Found TMDB match for '{}': {} (tmdb {:?})",
                title,
                entry.title,
                entry.tmdb_id
            );

            if entry.imdb_rating.is_none() {
                self.supplement_ratings(&mut entry, title, year, hint).await;
            }
            return entry;
        }

        tracing::debug!("No TMDB match for '{}', trying OMDb", title);
        match self
            .lookup_fallback(title, year, None, fallback_kinds(hint))
            .await
        {
            Some(record) => {
                let mut entry = format::from_omdb(record);
                entry.provenance = Provenance::Fallback;
                tracing::info!("Found OMDb match for '{}': {}", title, entry.title);
                entry
            }
            None => {
                tracing::warn!("No metadata found for '{}' in TMDB or OMDb", title);
                CatalogEntry::unmatched()
            }
        }
    }

    /// IMDb id lookup first when known, then title lookups in `kinds` order
    async fn lookup_fallback(
        &self,
        title: &str,
        year: Option<i32>,
        imdb_id: Option<&str>,
        kinds: &[MediaKind],
    ) -> Option<OmdbTitle> {
        if let Some(id) = imdb_id {
            if let Some(record) = self.fallback.lookup_imdb_id(id).await {
                return Some(record);
            }
        }

        for kind in kinds {
            if let Some(record) = self.fallback.lookup_title(title, year, *kind).await {
                return Some(record);
            }
        }

        None
    }

    /// Copy any rating the primary record lacks from the fallback source
    async fn supplement_ratings(
        &self,
        entry: &mut CatalogEntry,
        title: &str,
        year: Option<i32>,
        hint: Option<ContentHint>,
    ) {
        let kinds = match entry.media_kind {
            Some(MediaKind::Series) => fallback_kinds(Some(ContentHint::Series)),
            Some(MediaKind::Movie) => fallback_kinds(Some(ContentHint::Movie)),
            None => fallback_kinds(hint),
        };

        let Some(record) = self
            .lookup_fallback(title, year, entry.imdb_id.as_deref(), kinds)
            .await
        else {
            return;
        };
        let ratings = format::from_omdb(record);

        let mut copied = false;
        for (field, value) in [
            (&mut entry.imdb_rating, ratings.imdb_rating),
            (&mut entry.rt_rating, ratings.rt_rating),
            (&mut entry.metacritic_rating, ratings.metacritic_rating),
        ] {
            if field.is_none() && value.is_some() {
                *field = value;
                copied = true;
            }
        }

        if copied {
            entry.provenance = Provenance::PrimaryWithFallback;
            tracing::info!("Supplemented TMDB record for '{}' with OMDb ratings", title);
        }
    }

    pub async fn update_item(&self, item: &mut CatalogItem, force: bool) -> EnrichOutcome {
        self.update_item_with_hint(item, force, None).await
    }

    /// Refresh an item's metadata when stale (or forced), cache its poster and
    /// merge derived mood tags. The caller persists the item.
    pub async fn update_item_with_hint(
        &self,
        item: &mut CatalogItem,
        force: bool,
        hint: Option<ContentHint>,
    ) -> EnrichOutcome {
        let now = Utc::now();
        if !force && !item.needs_metadata_refresh(self.refresh_days, now) {
            tracing::debug!("Metadata for '{}' is still fresh", item.title);
            return EnrichOutcome::Fresh;
        }

        tracing::info!("Updating metadata for '{}'", item.title);
        let mut entry = self
            .fetch_with_hint(&item.title, item.director.as_deref(), item.release_year, hint)
            .await;

        if !entry.is_matched() {
            return EnrichOutcome::NoMatch;
        }

        if let Some(url) = entry.poster_url.clone() {
            if let Some(path) = self.posters.ensure_cached(&url, &item.title).await {
                entry.cached_poster_path = Some(self.posters.relative_path(&path));
            }
        }

        item.mood_tags.extend(derive_mood_tags(&entry));
        let outcome = EnrichOutcome::Updated {
            provenance: entry.provenance,
            poster: entry.cached_poster_path.clone(),
        };
        item.metadata = entry;
        item.last_updated = Some(now);

        outcome
    }
}

/// Fallback title lookups allowed for a content hint, in order
fn fallback_kinds(hint: Option<ContentHint>) -> &'static [MediaKind] {
    match hint {
        Some(ContentHint::Series) => &[MediaKind::Series],
        Some(ContentHint::Movie) | Some(ContentHint::Documentary) => &[MediaKind::Movie],
        None => &[MediaKind::Movie, MediaKind::Series],
    }
}
