// TMDB metadata provider service (primary source)
// API Documentation: https://developer.themoviedb.org/reference/intro/getting-started

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::sources::{PrimarySource, SourceError};

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const DETAIL_APPEND: &str = "credits,external_ids,videos";

/// Crew jobs that count as attribution for a movie
const MOVIE_CREDIT_JOBS: [&str; 4] = ["Director", "Writer", "Screenplay", "Producer"];

/// Crew jobs that count as attribution for a series, besides `created_by`
const SERIES_CREDIT_JOBS: [&str; 3] = ["Creator", "Showrunner", "Executive Producer"];

/// TMDB API client
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResults<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovieSearchResult {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TvSearchResult {
    pub id: i64,
    pub name: String,
    pub original_name: Option<String>,
    pub first_air_date: Option<String>,
    pub popularity: Option<f64>,
}

/// Detailed movie info with credits, external ids and videos appended
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovieDetails {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub genres: Vec<Genre>,
    pub imdb_id: Option<String>,
    pub tagline: Option<String>,
    pub original_language: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub credits: Option<Credits>,
    pub external_ids: Option<ExternalIds>,
    pub videos: Option<Videos>,
}

/// Detailed TV show info with credits, external ids and videos appended
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TvDetails {
    pub id: i64,
    pub name: String,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    pub episode_run_time: Vec<i32>,
    pub genres: Vec<Genre>,
    pub created_by: Vec<Creator>,
    pub tagline: Option<String>,
    pub original_language: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub credits: Option<Credits>,
    pub external_ids: Option<ExternalIds>,
    pub videos: Option<Videos>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Creator {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExternalIds {
    pub imdb_id: Option<String>,
}

/// Credits response (cast and crew)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credits {
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub job: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Videos {
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Video {
    pub name: String,
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

/// Image sizes for different purposes
#[derive(Debug, Clone, Copy)]
pub enum ImageSize {
    /// w500 - poster
    Poster,
    /// w1280 - backdrop
    Backdrop,
}

impl ImageSize {
    fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Poster => "w500",
            ImageSize::Backdrop => "w1280",
        }
    }
}

/// Absolute image URL for a TMDB image path, `None` for missing or empty paths
pub fn image_url(path: Option<&str>, size: ImageSize) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{}/{}{}", TMDB_IMAGE_BASE, size.as_str(), p))
}

impl MovieDetails {
    /// Directors, writers and producers in credit order
    pub fn credited_names(&self) -> Vec<&str> {
        credited_crew(self.credits.as_ref(), &MOVIE_CREDIT_JOBS).collect()
    }

    pub fn imdb_id(&self) -> Option<&str> {
        self.imdb_id
            .as_deref()
            .or_else(|| self.external_ids.as_ref()?.imdb_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

impl TvDetails {
    /// Creators, showrunners and executive producers in credit order
    pub fn credited_names(&self) -> Vec<&str> {
        self.created_by
            .iter()
            .map(|c| c.name.as_str())
            .chain(credited_crew(self.credits.as_ref(), &SERIES_CREDIT_JOBS))
            .collect()
    }

    pub fn imdb_id(&self) -> Option<&str> {
        self.external_ids
            .as_ref()?
            .imdb_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

fn credited_crew<'a>(
    credits: Option<&'a Credits>,
    jobs: &'a [&'a str],
) -> impl Iterator<Item = &'a str> + 'a {
    credits
        .into_iter()
        .flat_map(|c| c.crew.iter())
        .filter(move |member| {
            member
                .job
                .as_deref()
                .is_some_and(|job| jobs.contains(&job))
        })
        .map(|member| member.name.as_str())
}

impl TmdbClient {
    /// Create a new TMDB client. Without an API key the client is inert.
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("TMDB API key not configured, primary metadata source disabled");
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, params: &str) -> Result<T, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::Unconfigured("TMDB"))?;

        let url = format!(
            "{}/{}?api_key={}&language=en-US{}",
            self.base_url, endpoint, api_key, params
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Search for movies by title
    pub async fn fetch_movie_search(
        &self,
        query: &str,
        year: Option<i32>,
    ) -> Result<Vec<MovieSearchResult>, SourceError> {
        let mut params = format!("&query={}&include_adult=false", urlencoding::encode(query));
        if let Some(y) = year {
            params.push_str(&format!("&year={}", y));
        }

        let response: SearchResults<MovieSearchResult> =
            self.get_json("search/movie", &params).await?;
        Ok(response.results)
    }

    /// Search for TV shows by name
    pub async fn fetch_tv_search(
        &self,
        query: &str,
        year: Option<i32>,
    ) -> Result<Vec<TvSearchResult>, SourceError> {
        let mut params = format!("&query={}&include_adult=false", urlencoding::encode(query));
        if let Some(y) = year {
            params.push_str(&format!("&first_air_date_year={}", y));
        }

        let response: SearchResults<TvSearchResult> = self.get_json("search/tv", &params).await?;
        Ok(response.results)
    }

    pub async fn fetch_movie_details(&self, tmdb_id: i64) -> Result<MovieDetails, SourceError> {
        let params = format!("&append_to_response={}", DETAIL_APPEND);
        self.get_json(&format!("movie/{}", tmdb_id), &params).await
    }

    pub async fn fetch_tv_details(&self, tmdb_id: i64) -> Result<TvDetails, SourceError> {
        let params = format!("&append_to_response={}", DETAIL_APPEND);
        self.get_json(&format!("tv/{}", tmdb_id), &params).await
    }

    fn log_failure(&self, operation: &str, subject: &str, error: &SourceError) {
        match error {
            SourceError::Unconfigured(_) => {
                tracing::debug!("Skipping TMDB {} for {}: {}", operation, subject, error)
            }
            _ => tracing::warn!("TMDB {} failed for {}: {}", operation, subject, error),
        }
    }
}

#[async_trait]
impl PrimarySource for TmdbClient {
    async fn search_movies(&self, query: &str, year: Option<i32>) -> Vec<MovieSearchResult> {
        self.fetch_movie_search(query, year)
            .await
            .unwrap_or_else(|e| {
                self.log_failure("movie search", query, &e);
                Vec::new()
            })
    }

    async fn search_series(&self, query: &str, year: Option<i32>) -> Vec<TvSearchResult> {
        self.fetch_tv_search(query, year).await.unwrap_or_else(|e| {
            self.log_failure("TV search", query, &e);
            Vec::new()
        })
    }

    async fn movie_details(&self, id: i64) -> Option<MovieDetails> {
        match self.fetch_movie_details(id).await {
            Ok(details) => Some(details),
            Err(e) => {
                self.log_failure("movie details", &format!("movie/{}", id), &e);
                None
            }
        }
    }

    async fn series_details(&self, id: i64) -> Option<TvDetails> {
        match self.fetch_tv_details(id).await {
            Ok(details) => Some(details),
            Err(e) => {
                self.log_failure("TV details", &format!("tv/{}", id), &e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{serve_fixed, serve_silent, UNREACHABLE_BASE};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url(Some("/abc.jpg"), ImageSize::Poster).as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
        assert_eq!(
            image_url(Some("/abc.jpg"), ImageSize::Backdrop).as_deref(),
            Some("https://image.tmdb.org/t/p/w1280/abc.jpg")
        );
        assert_eq!(image_url(Some(""), ImageSize::Poster), None);
        assert_eq!(image_url(None, ImageSize::Poster), None);
    }

    #[test]
    fn test_parse_movie_details() {
        let json = r#"{
            "id": 603,
            "title": "The Matrix",
            "original_title": "The Matrix",
            "runtime": 136,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "external_ids": {"imdb_id": "tt0133093"},
            "credits": {
                "cast": [{"id": 6384, "name": "Keanu Reeves", "character": "Neo", "order": 0}],
                "crew": [
                    {"id": 9340, "name": "Lana Wachowski", "job": "Director"},
                    {"id": 1, "name": "Bill Pope", "job": "Director of Photography"},
                    {"id": 9339, "name": "Lilly Wachowski", "job": "Writer"}
                ]
            },
            "videos": {"results": [{"name": "Trailer", "key": "abc", "site": "YouTube", "type": "Trailer"}]}
        }"#;
        let details: MovieDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.id, 603);
        assert_eq!(details.imdb_id(), Some("tt0133093"));
        assert_eq!(
            details.credited_names(),
            vec!["Lana Wachowski", "Lilly Wachowski"]
        );
        assert_eq!(details.videos.unwrap().results[0].video_type, "Trailer");
    }

    #[test]
    fn test_tv_credited_names_include_creators() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "created_by": [{"id": 66633, "name": "Vince Gilligan"}],
            "credits": {"crew": [
                {"id": 2, "name": "Mark Johnson", "job": "Executive Producer"},
                {"id": 3, "name": "Someone Else", "job": "Editor"}
            ]}
        }"#;
        let details: TvDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.credited_names(), vec!["Vince Gilligan", "Mark Johnson"]);
        assert_eq!(details.imdb_id(), None);
    }

    #[tokio::test]
    async fn test_unconfigured_client_is_inert() {
        let client = TmdbClient::new(None, TMDB_API_BASE, Duration::from_secs(1)).unwrap();
        assert!(client.search_movies("The Matrix", Some(1999)).await.is_empty());
        assert!(client.search_series("The Matrix", None).await.is_empty());
        assert!(client.movie_details(603).await.is_none());
        assert!(matches!(
            client.fetch_movie_details(603).await,
            Err(SourceError::Unconfigured("TMDB"))
        ));
    }

    fn client_for(base_url: &str) -> TmdbClient {
        TmdbClient::new(Some("tmdb-secret-key".to_string()), base_url, Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_search_against_stub() {
        let body: &[u8] = br#"{"page": 1, "results": [{"id": 603, "title": "The Matrix", "popularity": 80.1}]}"#;
        let (base, hits) = serve_fixed("200 OK", "application/json", body).await;

        let results = client_for(&format!("{}/", base)).search_movies("The Matrix", Some(1999)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 603);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_no_data() {
        let (base, _) = serve_fixed("500 Internal Server Error", "text/plain", b"boom").await;
        let client = client_for(&base);

        assert!(matches!(
            client.fetch_movie_search("The Matrix", None).await,
            Err(SourceError::Status(status)) if status.as_u16() == 500
        ));
        assert!(client.search_movies("The Matrix", None).await.is_empty());
        assert!(client.series_details(1396).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_no_data() {
        let (base, _) = serve_fixed("200 OK", "application/json", b"not json").await;
        let client = client_for(&base);

        assert!(matches!(
            client.fetch_movie_details(603).await,
            Err(SourceError::Decode(_))
        ));
        assert!(client.search_movies("The Matrix", None).await.is_empty());
        assert!(client.movie_details(603).await.is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_no_data() {
        let base = serve_silent().await;
        let client = client_for(&base);

        assert!(matches!(
            client.fetch_tv_search("Breaking Bad", None).await,
            Err(SourceError::Http(_))
        ));
        assert!(client.search_series("Breaking Bad", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let error = client_for(UNREACHABLE_BASE)
            .fetch_movie_search("The Matrix", None)
            .await
            .unwrap_err();

        assert!(matches!(error, SourceError::Http(_)));
        assert!(!error.to_string().contains("tmdb-secret-key"));
        assert!(!format!("{:?}", error).contains("tmdb-secret-key"));
    }
}
