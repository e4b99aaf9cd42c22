//! Candidate resolution against the primary catalog.
//!
//! Search results for a title are run through an ordered chain of
//! [`MatchStrategy`] implementations. The first strategy that makes a
//! decision wins; the rest are never consulted. The default chain is
//!
//! 1. [`ExactTitleMatch`]: normalized title or original title equality,
//!    movies before series.
//! 2. [`CreditedDirectorMatch`]: the supplied director appears in the
//!    credits of one of the first few candidates per pool.
//! 3. [`TokenOverlapMatch`]: best Jaccard token similarity across both pools,
//!    at or above [`MIN_TOKEN_SIMILARITY`].

use async_trait::async_trait;
use std::sync::Arc;

use super::format;
use super::normalize::{normalize_title, token_similarity};
use super::sources::PrimarySource;
use super::tmdb::{MovieDetails, MovieSearchResult, TvDetails, TvSearchResult};
use crate::models::{CatalogEntry, ContentHint, MediaKind};

/// Candidates below this similarity are never selected
pub const MIN_TOKEN_SIMILARITY: f64 = 0.5;

/// How many candidates per pool get a detail fetch for credit matching
pub const CREDIT_LOOKUP_LIMIT: usize = 5;

const DOCUMENTARY_GENRE: &str = "Documentary";

/// A title lookup as entered by the user
#[derive(Debug, Clone, Copy)]
pub struct ResolveQuery<'a> {
    pub title: &'a str,
    pub year: Option<i32>,
    pub director: Option<&'a str>,
    pub hint: Option<ContentHint>,
}

impl<'a> ResolveQuery<'a> {
    pub fn new(title: &'a str) -> Self {
        Self {
            title,
            year: None,
            director: None,
            hint: None,
        }
    }

    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn director(mut self, director: Option<&'a str>) -> Self {
        self.director = director.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn hint(mut self, hint: Option<ContentHint>) -> Self {
        self.hint = hint;
        self
    }
}

/// A search result that has not been confirmed as the match
#[derive(Debug, Clone)]
pub enum Candidate {
    Movie(MovieSearchResult),
    Series(TvSearchResult),
}

impl Candidate {
    pub fn id(&self) -> i64 {
        match self {
            Candidate::Movie(m) => m.id,
            Candidate::Series(s) => s.id,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Candidate::Movie(_) => MediaKind::Movie,
            Candidate::Series(_) => MediaKind::Series,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Candidate::Movie(m) => &m.title,
            Candidate::Series(s) => &s.name,
        }
    }

    /// Normalized title and, when present, normalized original title
    fn normalized_titles(&self) -> Vec<String> {
        let (title, original) = match self {
            Candidate::Movie(m) => (&m.title, m.original_title.as_ref()),
            Candidate::Series(s) => (&s.name, s.original_name.as_ref()),
        };

        std::iter::once(title)
            .chain(original)
            .map(|t| normalize_title(t))
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Full detail for a candidate
#[derive(Debug, Clone)]
pub enum Detail {
    Movie(MovieDetails),
    Series(TvDetails),
}

impl Detail {
    fn credits_name(&self, normalized_name: &str) -> bool {
        let names = match self {
            Detail::Movie(m) => m.credited_names(),
            Detail::Series(s) => s.credited_names(),
        };
        names.iter().any(|n| normalize_title(n) == normalized_name)
    }

    fn into_entry(self) -> CatalogEntry {
        match self {
            Detail::Movie(m) => format::from_tmdb_movie(m),
            Detail::Series(s) => format::from_tmdb_series(s),
        }
    }
}

/// Search results for one query, split by media kind
#[derive(Debug, Clone, Default)]
pub struct CandidatePools {
    pub movies: Vec<Candidate>,
    pub series: Vec<Candidate>,
}

impl CandidatePools {
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty() && self.series.is_empty()
    }
}

/// Input shared by every strategy in the chain
pub struct MatchContext<'a> {
    pub normalized_title: String,
    pub normalized_director: Option<String>,
    pub pools: &'a CandidatePools,
    pub source: &'a dyn PrimarySource,
}

/// A strategy's decision, with detail attached when the strategy already fetched it
#[derive(Debug, Clone)]
pub struct Selection {
    pub candidate: Candidate,
    pub detail: Option<Detail>,
}

impl Selection {
    fn bare(candidate: &Candidate) -> Self {
        Self {
            candidate: candidate.clone(),
            detail: None,
        }
    }
}

/// One tier of the resolution chain. `None` means "no decision".
#[async_trait]
pub trait MatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn select(&self, ctx: &MatchContext<'_>) -> Option<Selection>;
}

pub struct ExactTitleMatch;

#[async_trait]
impl MatchStrategy for ExactTitleMatch {
    fn name(&self) -> &'static str {
        "exact-title"
    }

    async fn select(&self, ctx: &MatchContext<'_>) -> Option<Selection> {
        ctx.pools
            .movies
            .iter()
            .chain(ctx.pools.series.iter())
            .find(|c| c.normalized_titles().contains(&ctx.normalized_title))
            .map(Selection::bare)
    }
}

pub struct CreditedDirectorMatch;

#[async_trait]
impl MatchStrategy for CreditedDirectorMatch {
    fn name(&self) -> &'static str {
        "credited-director"
    }

    async fn select(&self, ctx: &MatchContext<'_>) -> Option<Selection> {
        let director = ctx.normalized_director.as_deref()?;

        let shortlist = ctx
            .pools
            .movies
            .iter()
            .take(CREDIT_LOOKUP_LIMIT)
            .chain(ctx.pools.series.iter().take(CREDIT_LOOKUP_LIMIT));

        for candidate in shortlist {
            let Some(detail) = fetch_detail(ctx.source, candidate).await else {
                continue;
            };
            if detail.credits_name(director) {
                return Some(Selection {
                    candidate: candidate.clone(),
                    detail: Some(detail),
                });
            }
        }

        None
    }
}

pub struct TokenOverlapMatch {
    pub threshold: f64,
}

impl Default for TokenOverlapMatch {
    fn default() -> Self {
        Self {
            threshold: MIN_TOKEN_SIMILARITY,
        }
    }
}

impl TokenOverlapMatch {
    /// Highest scoring candidate of a pool; earlier candidates win ties
    fn best_in<'c>(&self, query: &str, pool: &'c [Candidate]) -> Option<(&'c Candidate, f64)> {
        let mut best: Option<(&Candidate, f64)> = None;
        for candidate in pool {
            let score = candidate
                .normalized_titles()
                .iter()
                .map(|t| token_similarity(query, t))
                .fold(0.0, f64::max);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((candidate, score));
            }
        }
        best.filter(|(_, score)| *score >= self.threshold)
    }
}

#[async_trait]
impl MatchStrategy for TokenOverlapMatch {
    fn name(&self) -> &'static str {
        "token-overlap"
    }

    async fn select(&self, ctx: &MatchContext<'_>) -> Option<Selection> {
        let movie = self.best_in(&ctx.normalized_title, &ctx.pools.movies);
        let series = self.best_in(&ctx.normalized_title, &ctx.pools.series);

        let chosen = match (movie, series) {
            (Some(m), Some(s)) if s.1 > m.1 => s,
            (Some(m), _) => m,
            (None, Some(s)) => s,
            (None, None) => return None,
        };

        tracing::debug!(
            "Token overlap picked '{}' (similarity {:.2})",
            chosen.0.title(),
            chosen.1
        );
        Some(Selection::bare(chosen.0))
    }
}

async fn fetch_detail(source: &dyn PrimarySource, candidate: &Candidate) -> Option<Detail> {
    match candidate {
        Candidate::Movie(m) => source.movie_details(m.id).await.map(Detail::Movie),
        Candidate::Series(s) => source.series_details(s.id).await.map(Detail::Series),
    }
}

/// Picks the single best primary-source match for a user-entered title
pub struct CandidateResolver {
    source: Arc<dyn PrimarySource>,
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl CandidateResolver {
    pub fn new(source: Arc<dyn PrimarySource>) -> Self {
        Self::with_strategies(
            source,
            vec![
                Box::new(ExactTitleMatch),
                Box::new(CreditedDirectorMatch),
                Box::new(TokenOverlapMatch::default()),
            ],
        )
    }

    pub fn with_strategies(
        source: Arc<dyn PrimarySource>,
        strategies: Vec<Box<dyn MatchStrategy>>,
    ) -> Self {
        Self { source, strategies }
    }

    /// Query the primary source for the pools the hint allows
    pub async fn search(&self, query: &ResolveQuery<'_>) -> CandidatePools {
        let mut pools = CandidatePools::default();

        if ContentHint::searches_movies(query.hint) {
            pools.movies = self
                .source
                .search_movies(query.title, query.year)
                .await
                .into_iter()
                .map(Candidate::Movie)
                .collect();
        }

        if ContentHint::searches_series(query.hint) {
            pools.series = self
                .source
                .search_series(query.title, query.year)
                .await
                .into_iter()
                .map(Candidate::Series)
                .collect();
        }

        pools
    }

    /// Run the strategy chain over already-searched pools
    pub async fn select(&self, query: &ResolveQuery<'_>, pools: &CandidatePools) -> Option<Selection> {
        let ctx = MatchContext {
            normalized_title: normalize_title(query.title),
            normalized_director: query
                .director
                .map(normalize_title)
                .filter(|d| !d.is_empty()),
            pools,
            source: self.source.as_ref(),
        };

        for strategy in &self.strategies {
            if let Some(selection) = strategy.select(&ctx).await {
                tracing::debug!(
                    "Resolved '{}' to {} {} '{}' via {}",
                    query.title,
                    selection.candidate.kind().as_str(),
                    selection.candidate.id(),
                    selection.candidate.title(),
                    strategy.name()
                );
                return Some(selection);
            }
        }

        None
    }

    /// Resolve a title to a formatted record, or `None` when nothing matches well enough
    pub async fn resolve(&self, query: &ResolveQuery<'_>) -> Option<CatalogEntry> {
        let pools = self.search(query).await;
        if pools.is_empty() {
            tracing::debug!("Primary source returned no candidates for '{}'", query.title);
            return None;
        }

        let Some(selection) = self.select(query, &pools).await else {
            tracing::debug!(
                "Primary source returned candidates for '{}' but none matched well enough",
                query.title
            );
            return None;
        };

        let detail = match selection.detail {
            Some(detail) => detail,
            None => fetch_detail(self.source.as_ref(), &selection.candidate).await?,
        };

        let entry = detail.into_entry();
        if query.hint == Some(ContentHint::Documentary) && !entry.has_genre(DOCUMENTARY_GENRE) {
            tracing::debug!(
                "Rejecting '{}' for documentary lookup of '{}': no Documentary genre",
                selection.candidate.title(),
                query.title
            );
            return None;
        }

        Some(entry)
    }
}
