// OMDb metadata provider service (fallback source)
// API Documentation: https://www.omdbapi.com/

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::sources::{FallbackSource, SourceError};
use crate::models::MediaKind;

pub const OMDB_API_BASE: &str = "https://www.omdbapi.com";

/// OMDb API client
pub struct OmdbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Title record as returned by `?t=` and `?i=` lookups.
///
/// OMDb reports "no result" in-band with `"Response": "False"` and fills
/// unknown fields with `"N/A"`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OmdbTitle {
    pub title: String,
    pub year: String,
    pub rated: String,
    pub released: String,
    pub runtime: String,
    pub genre: String,
    pub director: String,
    pub writer: String,
    pub actors: String,
    pub plot: String,
    pub language: String,
    pub country: String,
    pub awards: String,
    pub poster: String,
    pub ratings: Vec<OmdbRating>,
    pub metascore: String,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: String,
    #[serde(rename = "imdbVotes")]
    pub imdb_votes: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub response: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OmdbRating {
    pub source: String,
    pub value: String,
}

impl OmdbTitle {
    fn is_result(&self) -> bool {
        !self.response.eq_ignore_ascii_case("false")
    }
}

impl OmdbClient {
    /// Create a new OMDb client. Without an API key the client is inert.
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("OMDb API key not configured, fallback metadata source disabled");
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn request(&self, params: &str) -> Result<OmdbTitle, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::Unconfigured("OMDb"))?;

        let url = format!("{}/?apikey={}&r=json{}", self.base_url, api_key, params);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body = response.text().await?;
        let title: OmdbTitle = serde_json::from_str(&body)?;
        if !title.is_result() {
            return Err(SourceError::NotFound(
                title.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        Ok(title)
    }

    /// Exact title lookup, restricted to movies or series
    pub async fn fetch_by_title(
        &self,
        title: &str,
        year: Option<i32>,
        kind: MediaKind,
    ) -> Result<OmdbTitle, SourceError> {
        let mut params = format!(
            "&t={}&type={}&plot=full",
            urlencoding::encode(title),
            kind.as_str()
        );
        if let Some(y) = year {
            params.push_str(&format!("&y={}", y));
        }

        self.request(&params).await
    }

    pub async fn fetch_by_imdb_id(&self, imdb_id: &str) -> Result<OmdbTitle, SourceError> {
        let params = format!("&i={}&plot=full", urlencoding::encode(imdb_id));
        self.request(&params).await
    }

    fn log_failure(&self, subject: &str, error: &SourceError) {
        match error {
            SourceError::Unconfigured(_) | SourceError::NotFound(_) => {
                tracing::debug!("OMDb lookup for {}: {}", subject, error)
            }
            _ => tracing::warn!("OMDb lookup failed for {}: {}", subject, error),
        }
    }
}

#[async_trait]
impl FallbackSource for OmdbClient {
    async fn lookup_title(
        &self,
        title: &str,
        year: Option<i32>,
        kind: MediaKind,
    ) -> Option<OmdbTitle> {
        match self.fetch_by_title(title, year, kind).await {
            Ok(record) => Some(record),
            Err(e) => {
                self.log_failure(&format!("{} '{}'", kind.as_str(), title), &e);
                None
            }
        }
    }

    async fn lookup_imdb_id(&self, imdb_id: &str) -> Option<OmdbTitle> {
        match self.fetch_by_imdb_id(imdb_id).await {
            Ok(record) => Some(record),
            Err(e) => {
                self.log_failure(imdb_id, &e);
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
    fn test_parse_title_record() {
        let json = r#"{
            "Title": "The Matrix",
            "Year": "1999",
            "Runtime": "136 min",
            "Genre": "Action, Sci-Fi",
            "Ratings": [
                {"Source": "Internet Movie Database", "Value": "8.7/10"},
                {"Source": "Rotten Tomatoes", "Value": "83%"}
            ],
            "imdbRating": "8.7",
            "imdbID": "tt0133093",
            "Type": "movie",
            "Response": "True"
        }"#;
        let record: OmdbTitle = serde_json::from_str(json).unwrap();
        assert!(record.is_result());
        assert_eq!(record.imdb_id, "tt0133093");
        assert_eq!(record.kind, "movie");
        assert_eq!(record.ratings.len(), 2);
        assert_eq!(record.ratings[1].value, "83%");
    }

    #[test]
    fn test_response_false_is_not_a_result() {
        let json = r#"{"Response": "False", "Error": "Movie not found!"}"#;
        let record: OmdbTitle = serde_json::from_str(json).unwrap();
        assert!(!record.is_result());
        assert_eq!(record.error.as_deref(), Some("Movie not found!"));
    }

    #[tokio::test]
    async fn test_unconfigured_client_is_inert() {
        let client = OmdbClient::new(Some("  ".to_string()), OMDB_API_BASE, Duration::from_secs(1)).unwrap();
        assert!(client
            .lookup_title("The Matrix", Some(1999), MediaKind::Movie)
            .await
            .is_none());
        assert!(client.lookup_imdb_id("tt0133093").await.is_none());
    }

    fn client_for(base_url: &str) -> OmdbClient {
        OmdbClient::new(Some("omdb-secret-key".to_string()), base_url, Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_against_stub() {
        let body: &[u8] = br#"{"Title": "The Matrix", "imdbRating": "8.7", "imdbID": "tt0133093", "Type": "movie", "Response": "True"}"#;
        let (base, hits) = serve_fixed("200 OK", "application/json", body).await;

        let record = client_for(&base)
            .lookup_title("The Matrix", Some(1999), MediaKind::Movie)
            .await
            .unwrap();
        assert_eq!(record.imdb_id, "tt0133093");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_response_false_is_not_found() {
        let body: &[u8] = br#"{"Response": "False", "Error": "Movie not found!"}"#;
        let (base, _) = serve_fixed("200 OK", "application/json", body).await;
        let client = client_for(&base);

        assert!(matches!(
            client.fetch_by_imdb_id("tt0000000").await,
            Err(SourceError::NotFound(message)) if message == "Movie not found!"
        ));
        assert!(client.lookup_imdb_id("tt0000000").await.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_no_data() {
        let (base, _) = serve_fixed("500 Internal Server Error", "text/plain", b"boom").await;
        let client = client_for(&base);

        assert!(matches!(
            client.fetch_by_title("The Matrix", None, MediaKind::Movie).await,
            Err(SourceError::Status(status)) if status.as_u16() == 500
        ));
        assert!(client
            .lookup_title("The Matrix", None, MediaKind::Movie)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_no_data() {
        let (base, _) = serve_fixed("200 OK", "application/json", b"not json").await;
        let client = client_for(&base);

        assert!(matches!(
            client.fetch_by_title("The Matrix", None, MediaKind::Series).await,
            Err(SourceError::Decode(_))
        ));
        assert!(client
            .lookup_title("The Matrix", None, MediaKind::Series)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_no_data() {
        let base = serve_silent().await;
        assert!(client_for(&base).lookup_imdb_id("tt0133093").await.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let error = client_for(UNREACHABLE_BASE)
            .fetch_by_imdb_id("tt0133093")
            .await
            .unwrap_err();

        assert!(matches!(error, SourceError::Http(_)));
        assert!(!error.to_string().contains("omdb-secret-key"));
        assert!(!format!("{:?}", error).contains("omdb-secret-key"));
    }
}
