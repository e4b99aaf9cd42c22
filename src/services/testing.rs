// Hand-written source fakes for service tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::omdb::{OmdbRating, OmdbTitle};
use super::sources::{FallbackSource, PrimarySource};
use super::tmdb::{Creator, Genre, MovieDetails, MovieSearchResult, TvDetails, TvSearchResult};
use crate::models::MediaKind;

/// Local HTTP server answering every request with the same response.
/// Returns the base URL (`http://127.0.0.1:port`) and a request counter.
pub async fn serve_fixed(
    status: &'static str,
    content_type: &'static str,
    body: &'static [u8],
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let header = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                content_type,
                body.len()
            );
            let _ = socket.write_all(header.as_bytes()).await;
            let _ = socket.write_all(body).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), hits)
}

/// Local server that accepts connections and never answers
pub async fn serve_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    format!("http://{}", addr)
}

/// Base URL nothing listens on
pub const UNREACHABLE_BASE: &str = "http://127.0.0.1:9";

pub fn movie(id: i64, title: &str) -> MovieSearchResult {
    MovieSearchResult {
        id,
        title: title.to_string(),
        ..Default::default()
    }
}

pub fn series(id: i64, name: &str) -> TvSearchResult {
    TvSearchResult {
        id,
        name: name.to_string(),
        ..Default::default()
    }
}

fn genres(names: &[&str]) -> Vec<Genre> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Genre {
            id: i as i64,
            name: name.to_string(),
        })
        .collect()
}

pub fn movie_details(id: i64, title: &str, genre_names: &[&str]) -> MovieDetails {
    MovieDetails {
        id,
        title: title.to_string(),
        genres: genres(genre_names),
        ..Default::default()
    }
}

pub fn series_details(id: i64, name: &str, genre_names: &[&str], creators: &[&str]) -> TvDetails {
    TvDetails {
        id,
        name: name.to_string(),
        genres: genres(genre_names),
        created_by: creators
            .iter()
            .map(|c| Creator {
                id: 0,
                name: c.to_string(),
            })
            .collect(),
        ..Default::default()
    }
}

/// OMDb record with IMDb and Rotten Tomatoes ratings
pub fn omdb_title(title: &str, imdb: &str, rt: Option<&str>) -> OmdbTitle {
    let mut ratings = vec![OmdbRating {
        source: "Internet Movie Database".to_string(),
        value: format!("{}/10", imdb),
    }];
    if let Some(rt) = rt {
        ratings.push(OmdbRating {
            source: "Rotten Tomatoes".to_string(),
            value: rt.to_string(),
        });
    }

    OmdbTitle {
        title: title.to_string(),
        imdb_rating: imdb.to_string(),
        ratings,
        response: "True".to_string(),
        ..Default::default()
    }
}

/// Scripted primary source that records every call
#[derive(Default)]
pub struct FakePrimary {
    pub movies: Vec<MovieSearchResult>,
    pub series: Vec<TvSearchResult>,
    pub movie_details: HashMap<i64, MovieDetails>,
    pub series_details: HashMap<i64, TvDetails>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakePrimary {
    pub fn add_movie_details(&mut self, details: MovieDetails) {
        self.movie_details.insert(details.id, details);
    }

    pub fn add_series_details(&mut self, details: TvDetails) {
        self.series_details.insert(details.id, details);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.contains("_details:"))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PrimarySource for FakePrimary {
    async fn search_movies(&self, query: &str, _year: Option<i32>) -> Vec<MovieSearchResult> {
        self.record(format!("search_movies:{}", query));
        self.movies.clone()
    }

    async fn search_series(&self, query: &str, _year: Option<i32>) -> Vec<TvSearchResult> {
        self.record(format!("search_series:{}", query));
        self.series.clone()
    }

    async fn movie_details(&self, id: i64) -> Option<MovieDetails> {
        self.record(format!("movie_details:{}", id));
        self.movie_details.get(&id).cloned()
    }

    async fn series_details(&self, id: i64) -> Option<TvDetails> {
        self.record(format!("series_details:{}", id));
        self.series_details.get(&id).cloned()
    }
}

/// Scripted fallback source keyed by title and kind, or by IMDb id
#[derive(Default)]
pub struct FakeFallback {
    pub titles: HashMap<(String, MediaKind), OmdbTitle>,
    pub by_imdb_id: HashMap<String, OmdbTitle>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeFallback {
    pub fn add_title(&mut self, title: &str, kind: MediaKind, record: OmdbTitle) {
        self.titles.insert((title.to_string(), kind), record);
    }

    pub fn add_imdb_id(&mut self, imdb_id: &str, record: OmdbTitle) {
        self.by_imdb_id.insert(imdb_id.to_string(), record);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FallbackSource for FakeFallback {
    async fn lookup_title(
        &self,
        title: &str,
        _year: Option<i32>,
        kind: MediaKind,
    ) -> Option<OmdbTitle> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("lookup_title:{}:{}", kind.as_str(), title));
        self.titles.get(&(title.to_string(), kind)).cloned()
    }

    async fn lookup_imdb_id(&self, imdb_id: &str) -> Option<OmdbTitle> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("lookup_imdb_id:{}", imdb_id));
        self.by_imdb_id.get(imdb_id).cloned()
    }
}
