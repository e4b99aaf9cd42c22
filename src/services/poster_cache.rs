// Poster image cache under the media root
//
// Files are named `{sanitized_name}_{md5_of_url}{ext}`. The hash alone identifies
// the image; the name prefix only makes the cache directory readable.

use futures::StreamExt;
use reqwest::{Client, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Extensions tried, in order, before downloading
pub const KNOWN_EXTENSIONS: [&str; 3] = [".jpg", ".png", ".jpeg"];

const DEFAULT_EXTENSION: &str = ".jpg";
const MAX_NAME_CHARS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum PosterError {
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("cache write failed: {0}")]
    Io(#[from] std::io::Error),
}

pub struct PosterCache {
    client: Client,
    cache_dir: PathBuf,
    media_root: PathBuf,
}

/// MD5 hex digest of the artwork URL
pub fn cache_key(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}

/// Filename-safe prefix: alphanumerics, space, `-` and `_`, spaces turned into `_`
pub fn sanitize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();

    kept.trim_end()
        .replace(' ', "_")
        .chars()
        .take(MAX_NAME_CHARS)
        .collect()
}

/// Extension of the URL path including the dot, `.jpg` when there is none
fn url_extension(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .and_then(|e| e.to_str())
                .filter(|e| !e.is_empty())
                .map(|e| format!(".{}", e))
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Forward-slash path without a leading `/` or `media/`, ready to join onto a media base URL
pub fn normalize_media_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = path.trim_start_matches('/');
    path.strip_prefix("media/").unwrap_or(path).to_string()
}

fn is_placeholder(url: &str) -> bool {
    let url = url.trim();
    url.is_empty() || url.eq_ignore_ascii_case("N/A")
}

impl PosterCache {
    pub fn new(cache_dir: PathBuf, media_root: PathBuf, timeout: Duration) -> Result<Self, PosterError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            cache_dir,
            media_root,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Absolute location of a stored relative media path
    pub fn media_path(&self, relative: &str) -> PathBuf {
        self.media_root.join(normalize_media_path(relative))
    }

    /// Path relative to the media root, in the form stored on catalog items
    pub fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.media_root).unwrap_or(path);
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        normalize_media_path(&joined)
    }

    /// Existing cache file for this URL, without touching the network.
    ///
    /// Files named for `display_name` are preferred; otherwise any file cached
    /// for the same URL under another name is reused.
    pub async fn cached_path(&self, url: &str, display_name: &str) -> Option<PathBuf> {
        if is_placeholder(url) {
            return None;
        }

        let hash = cache_key(url);
        let name = sanitize_name(display_name);

        for ext in KNOWN_EXTENSIONS {
            let candidate = self.cache_dir.join(format!("{}_{}{}", name, hash, ext));
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }

        self.find_by_hash(&hash).await
    }

    async fn find_by_hash(&self, hash: &str) -> Option<PathBuf> {
        let mut entries = tokio::fs::read_dir(&self.cache_dir).await.ok()?;
        let suffixes: Vec<String> = KNOWN_EXTENSIONS
            .iter()
            .map(|ext| format!("_{}{}", hash, ext))
            .collect();

        while let Ok(Some(entry)) = entries.next_entry().await {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if suffixes.iter().any(|s| file_name.ends_with(s.as_str())) {
                return Some(entry.path());
            }
        }

        None
    }

    /// Local poster for `url`, downloading it at most once.
    ///
    /// Placeholder URLs and every download or write failure yield `None`.
    pub async fn ensure_cached(&self, url: &str, display_name: &str) -> Option<PathBuf> {
        if is_placeholder(url) {
            return None;
        }

        if let Some(existing) = self.cached_path(url, display_name).await {
            tracing::debug!("Poster already cached: {}", existing.display());
            return Some(existing);
        }

        let file_name = format!(
            "{}_{}{}",
            sanitize_name(display_name),
            cache_key(url),
            url_extension(url)
        );
        let target = self.cache_dir.join(file_name);

        tracing::info!("Downloading poster from: {}", url);
        match self.download(url, &target).await {
            Ok(()) => {
                tracing::info!("Poster cached: {}", target.display());
                Some(target)
            }
            Err(e) => {
                tracing::warn!("Failed to cache poster for '{}': {}", display_name, e);
                None
            }
        }
    }

    async fn download(&self, url: &str, target: &Path) -> Result<(), PosterError> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(PosterError::Status(response.status()));
        }

        let mut partial = target.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let written = Self::write_stream(response, &partial).await;
        if written.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
            return written;
        }

        // Same URL means same bytes, so replacing a concurrent writer's file is fine
        tokio::fs::rename(&partial, target).await?;
        Ok(())
    }

    async fn write_stream(response: reqwest::Response, path: &Path) -> Result<(), PosterError> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }
}
