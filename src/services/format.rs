//! Mapping from provider records into [`CatalogEntry`].
//!
//! This is the only place that reads TMDB or OMDb shaped data. Provenance
//! is left at `None`; the orchestrator tags the record once it knows which
//! source chain produced it.

use std::collections::BTreeMap;

use super::omdb::OmdbTitle;
use super::tmdb::{self, Credits, ImageSize, MovieDetails, TvDetails, Videos};
use crate::models::{CastCredit, CatalogEntry, MediaKind, Trailer};

const MAX_CAST: usize = 10;
const MAX_TRAILERS: usize = 3;
const MOVIE_CREW_JOBS: [&str; 4] = ["Director", "Writer", "Screenplay", "Producer"];
const SERIES_CREW_JOBS: [&str; 4] = ["Director", "Writer", "Showrunner", "Executive Producer"];
const NOT_AVAILABLE: &str = "N/A";

pub fn from_tmdb_movie(details: MovieDetails) -> CatalogEntry {
    let imdb_id = details.imdb_id().map(str::to_string);
    let crew = crew_by_role(details.credits.as_ref(), &MOVIE_CREW_JOBS);

    CatalogEntry {
        tmdb_id: Some(details.id),
        imdb_id,
        original_title: details.original_title.unwrap_or_else(|| details.title.clone()),
        title: details.title,
        overview: details.overview.unwrap_or_default(),
        release_date: details.release_date.unwrap_or_default(),
        runtime: details.runtime.filter(|r| *r > 0),
        genres: canonical_genres(details.genres.iter().map(|g| g.name.as_str())),
        cast: tmdb_cast(details.credits.as_ref()),
        crew,
        vote_average: details.vote_average,
        vote_count: details.vote_count,
        poster_url: tmdb::image_url(details.poster_path.as_deref(), ImageSize::Poster),
        backdrop_url: tmdb::image_url(details.backdrop_path.as_deref(), ImageSize::Backdrop),
        trailers: youtube_trailers(details.videos.as_ref()),
        tagline: details.tagline.unwrap_or_default(),
        original_language: details.original_language.unwrap_or_default(),
        media_kind: Some(MediaKind::Movie),
        ..CatalogEntry::default()
    }
}

pub fn from_tmdb_series(details: TvDetails) -> CatalogEntry {
    let imdb_id = details.imdb_id().map(str::to_string);

    let mut crew = crew_by_role(details.credits.as_ref(), &SERIES_CREW_JOBS);
    let creators: Vec<String> = details.created_by.iter().map(|c| c.name.clone()).collect();
    if !creators.is_empty() {
        crew.insert("Creator".to_string(), creators);
    }

    CatalogEntry {
        tmdb_id: Some(details.id),
        imdb_id,
        original_title: details.original_name.unwrap_or_else(|| details.name.clone()),
        title: details.name,
        overview: details.overview.unwrap_or_default(),
        release_date: details.first_air_date.unwrap_or_default(),
        runtime: details.episode_run_time.first().copied().filter(|r| *r > 0),
        genres: canonical_genres(details.genres.iter().map(|g| g.name.as_str())),
        cast: tmdb_cast(details.credits.as_ref()),
        crew,
        vote_average: details.vote_average,
        vote_count: details.vote_count,
        poster_url: tmdb::image_url(details.poster_path.as_deref(), ImageSize::Poster),
        backdrop_url: tmdb::image_url(details.backdrop_path.as_deref(), ImageSize::Backdrop),
        trailers: youtube_trailers(details.videos.as_ref()),
        tagline: details.tagline.unwrap_or_default(),
        original_language: details.original_language.unwrap_or_default(),
        media_kind: Some(MediaKind::Series),
        ..CatalogEntry::default()
    }
}

pub fn from_omdb(record: OmdbTitle) -> CatalogEntry {
    let mut imdb_rating = None;
    let mut rt_rating = None;
    let mut metacritic_rating = None;

    for rating in &record.ratings {
        if rating.source.contains("Internet Movie Database") {
            imdb_rating = available(rating.value.trim_end_matches("/10"));
        } else if rating.source.contains("Rotten Tomatoes") {
            rt_rating = available(&rating.value);
        } else if rating.source.contains("Metacritic") {
            metacritic_rating = available(rating.value.trim_end_matches("/100"));
        }
    }

    let imdb_rating = imdb_rating.or_else(|| available(&record.imdb_rating));
    let metacritic_rating = metacritic_rating.or_else(|| available(&record.metascore));

    let mut crew = BTreeMap::new();
    for (role, names) in [("Director", &record.director), ("Writer", &record.writer)] {
        let names = split_people(names);
        if !names.is_empty() {
            crew.insert(role.to_string(), names);
        }
    }

    let cast = split_people(&record.actors)
        .into_iter()
        .enumerate()
        .map(|(i, name)| CastCredit {
            name,
            character: String::new(),
            order: i as i32,
        })
        .collect();

    let media_kind = if record.kind.eq_ignore_ascii_case("series") {
        MediaKind::Series
    } else {
        MediaKind::Movie
    };

    CatalogEntry {
        imdb_id: available(&record.imdb_id),
        original_title: record.title.clone(),
        title: record.title,
        overview: available(&record.plot).unwrap_or_default(),
        release_date: available(&record.released).unwrap_or_default(),
        runtime: parse_runtime(&record.runtime),
        genres: canonical_genres(record.genre.split(',')),
        cast,
        crew,
        imdb_rating,
        rt_rating,
        metacritic_rating,
        poster_url: available(&record.poster),
        original_language: available(&record.language).unwrap_or_default(),
        media_kind: Some(media_kind),
        ..CatalogEntry::default()
    }
}

/// Ordered, deduplicated genre names in the vocabulary the mood table uses.
///
/// TMDB spells some genres differently from OMDb and bundles TV genres
/// ("Sci-Fi & Fantasy"), so both are folded into one list.
pub fn canonical_genres<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();

    for name in names {
        for part in name.split('&') {
            let part = part.trim();
            if part.is_empty() || part == NOT_AVAILABLE {
                continue;
            }
            let canonical = match part {
                "Science Fiction" | "Sci Fi" => "Sci-Fi",
                "Music" => "Musical",
                "Kids" => "Family",
                other => other,
            };
            if !genres.iter().any(|g| g == canonical) {
                genres.push(canonical.to_string());
            }
        }
    }

    genres
}

fn tmdb_cast(credits: Option<&Credits>) -> Vec<CastCredit> {
    let Some(credits) = credits else {
        return Vec::new();
    };

    let mut cast: Vec<CastCredit> = credits
        .cast
        .iter()
        .enumerate()
        .map(|(i, member)| CastCredit {
            name: member.name.clone(),
            character: member.character.clone().unwrap_or_default(),
            order: member.order.unwrap_or(i as i32),
        })
        .collect();

    cast.sort_by_key(|c| c.order);
    cast.truncate(MAX_CAST);
    cast
}

fn crew_by_role(credits: Option<&Credits>, jobs: &[&str]) -> BTreeMap<String, Vec<String>> {
    let mut crew: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for member in credits.iter().flat_map(|c| c.crew.iter()) {
        let Some(job) = member.job.as_deref().filter(|j| jobs.contains(j)) else {
            continue;
        };
        let names = crew.entry(job.to_string()).or_default();
        if !names.contains(&member.name) {
            names.push(member.name.clone());
        }
    }

    crew
}

fn youtube_trailers(videos: Option<&Videos>) -> Vec<Trailer> {
    videos
        .iter()
        .flat_map(|v| v.results.iter())
        .filter(|v| v.video_type == "Trailer" && v.site == "YouTube")
        .take(MAX_TRAILERS)
        .map(|v| Trailer {
            name: v.name.clone(),
            key: v.key.clone(),
            site: v.site.clone(),
        })
        .collect()
}

fn available(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != NOT_AVAILABLE).then(|| value.to_string())
}

/// Splits a comma separated credit list, dropping "(screenplay)" style notes
fn split_people(value: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for part in value.split(',') {
        let name = part.split(" (").next().unwrap_or(part).trim();
        if name.is_empty() || name == NOT_AVAILABLE || names.iter().any(|n| n == name) {
            continue;
        }
        names.push(name.to_string());
    }
    names
}

fn parse_runtime(value: &str) -> Option<i32> {
    value
        .trim()
        .trim_end_matches("min")
        .trim()
        .parse()
        .ok()
        .filter(|r: &i32| *r > 0)
}
