// Configuration module for filmshelf
// Handles XDG-compliant directory paths and TOML configuration file

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::services::omdb::OMDB_API_BASE;
use crate::services::tmdb::TMDB_API_BASE;

const APP_NAME: &str = "filmshelf";
const CONFIG_FILENAME: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Directory paths (overrides XDG defaults)
    pub paths: PathsConfig,

    /// Metadata source configuration
    pub metadata: MetadataConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Override data directory (database location)
    pub data_dir: Option<PathBuf>,

    /// Override media root (poster cache lives in `{media_root}/cache`)
    pub media_root: Option<PathBuf>,

    /// Override config directory
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// TMDB API key (primary source, disabled when missing)
    pub tmdb_api_key: Option<String>,

    /// OMDb API key (fallback source, disabled when missing)
    pub omdb_api_key: Option<String>,

    /// Days before stored metadata is considered stale (default: 30)
    pub refresh_days: i64,

    /// Per-request timeout for TMDB and OMDb lookups (default: 10)
    pub lookup_timeout_secs: u64,

    /// Per-request timeout for poster downloads (default: 30)
    pub image_timeout_secs: u64,

    /// TMDB API root (default: https://api.themoviedb.org/3)
    pub tmdb_base_url: String,

    /// OMDb API root (default: https://www.omdbapi.com)
    pub omdb_base_url: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            omdb_api_key: None,
            refresh_days: 30,
            lookup_timeout_secs: 10,
            image_timeout_secs: 30,
            tmdb_base_url: TMDB_API_BASE.to_string(),
            omdb_base_url: OMDB_API_BASE.to_string(),
        }
    }
}

/// Application paths following XDG Base Directory Specification on Unix
/// On other platforms, falls back to the current directory or platform-specific locations
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for configuration files (config.toml)
    /// XDG: $XDG_CONFIG_HOME/filmshelf or ~/.config/filmshelf
    pub config_dir: PathBuf,

    /// Directory for persistent data (database)
    /// XDG: $XDG_DATA_HOME/filmshelf or ~/.local/share/filmshelf
    pub data_dir: PathBuf,

    /// Root that stored poster paths are relative to
    /// Default: `{data_dir}/media`
    pub media_root: PathBuf,
}

impl AppPaths {
    /// Create application paths using XDG directories (or fallbacks)
    ///
    /// Priority order:
    /// 1. Environment variables (FILMSHELF_CONFIG_DIR, FILMSHELF_DATA_DIR, FILMSHELF_MEDIA_ROOT)
    /// 2. Config file overrides
    /// 3. XDG/platform directories
    /// 4. Current directory fallback
    pub fn new(config_overrides: &PathsConfig) -> Self {
        let config_dir = resolve_dir(
            "FILMSHELF_CONFIG_DIR",
            &config_overrides.config_dir,
            dirs::config_dir(),
        );
        let data_dir = resolve_dir(
            "FILMSHELF_DATA_DIR",
            &config_overrides.data_dir,
            dirs::data_dir(),
        );
        let media_root = std::env::var("FILMSHELF_MEDIA_ROOT")
            .map(PathBuf::from)
            .ok()
            .or_else(|| config_overrides.media_root.clone())
            .unwrap_or_else(|| data_dir.join("media"));

        Self {
            config_dir,
            data_dir,
            media_root,
        }
    }

    /// Create application paths using current directory (portable mode)
    pub fn current_dir() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            config_dir: cwd.clone(),
            data_dir: cwd.clone(),
            media_root: cwd.join("media"),
        }
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("filmshelf.db")
    }

    /// Get the database URL for SQLite
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database_path().display())
    }

    /// Get the poster cache directory
    pub fn poster_cache_dir(&self) -> PathBuf {
        self.media_root.join("cache")
    }

    /// Get the config file path
    pub fn config_file_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILENAME)
    }

    /// Ensure all directories exist
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.config_dir).await?;
        tokio::fs::create_dir_all(&self.data_dir).await?;
        tokio::fs::create_dir_all(self.poster_cache_dir()).await?;
        Ok(())
    }

    /// Log the configured paths
    pub fn log_paths(&self) {
        tracing::info!("Configuration directory: {}", self.config_dir.display());
        tracing::debug!("Config file: {}", self.config_file_path().display());
        tracing::info!("Data directory: {}", self.data_dir.display());
        tracing::info!("Media root: {}", self.media_root.display());
        tracing::debug!("Database path: {}", self.database_path().display());
    }
}

/// env > config file > platform dir joined with the app name > current directory
fn resolve_dir(env_var: &str, config_override: &Option<PathBuf>, platform: Option<PathBuf>) -> PathBuf {
    if let Ok(path) = std::env::var(env_var) {
        return PathBuf::from(path);
    }

    if let Some(ref path) = config_override {
        return path.clone();
    }

    if let Some(dir) = platform {
        return dir.join(APP_NAME);
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Application configuration - combines TOML file with environment overrides
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application paths
    pub paths: AppPaths,

    /// Metadata sources, refresh interval and timeouts
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Load configuration from TOML file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. TOML config file
    /// 3. Default values
    pub fn load() -> Self {
        let portable_mode = std::env::var("FILMSHELF_PORTABLE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if portable_mode {
            tracing::info!("Running in portable mode (using current directory)");
            return Self::portable();
        }

        let config_dir = Self::find_config_dir();
        let config_file = Self::load_config_file(&config_dir);

        Self::build(config_file)
    }

    /// Create a portable configuration (current directory for everything)
    fn portable() -> Self {
        Self {
            paths: AppPaths::current_dir(),
            metadata: Self::apply_env(MetadataConfig::default()),
        }
    }

    /// Find the config directory (for locating config.toml)
    fn find_config_dir() -> PathBuf {
        if let Ok(path) = std::env::var("FILMSHELF_CONFIG_DIR") {
            return PathBuf::from(path);
        }

        if let Some(dir) = dirs::config_dir() {
            return dir.join(APP_NAME);
        }

        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Load and parse the TOML config file
    fn load_config_file(config_dir: &Path) -> ConfigFile {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_path.exists() {
            tracing::debug!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
            return ConfigFile::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    ConfigFile::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
                ConfigFile::default()
            }
        }
    }

    /// Build configuration from config file with environment overrides
    fn build(config_file: ConfigFile) -> Self {
        Self {
            paths: AppPaths::new(&config_file.paths),
            metadata: Self::apply_env(config_file.metadata),
        }
    }

    /// API keys and refresh interval: env > config
    fn apply_env(mut metadata: MetadataConfig) -> MetadataConfig {
        if let Ok(key) = std::env::var("TMDB_API_KEY") {
            metadata.tmdb_api_key = Some(key);
        }

        if let Ok(key) = std::env::var("OMDB_API_KEY") {
            metadata.omdb_api_key = Some(key);
        }

        if let Some(days) = std::env::var("METADATA_REFRESH_DAYS")
            .ok()
            .and_then(|d| d.parse().ok())
        {
            metadata.refresh_days = days;
        }

        metadata
    }

    /// Get the database URL, with override from DATABASE_URL env var
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.paths.database_url())
    }

    /// Log configuration status
    pub fn log_config(&self) {
        self.paths.log_paths();

        match (&self.metadata.tmdb_api_key, &self.metadata.omdb_api_key) {
            (Some(_), Some(_)) => tracing::info!("Metadata sources: TMDB + OMDb"),
            (Some(_), None) => tracing::info!("Metadata sources: TMDB only"),
            (None, Some(_)) => tracing::info!("Metadata sources: OMDb only"),
            (None, None) => {
                tracing::warn!("No metadata sources configured");
                tracing::info!(
                    "Hint: Add tmdb_api_key/omdb_api_key to config.toml or set TMDB_API_KEY/OMDB_API_KEY"
                );
            }
        }

        tracing::debug!(
            "Metadata refresh interval: {} days",
            self.metadata.refresh_days
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_dir_paths() {
        let paths = AppPaths::current_dir();
        assert!(paths.config_dir.is_absolute() || paths.config_dir == PathBuf::from("."));
        assert!(paths.media_root.ends_with("media"));
        assert!(paths.poster_cache_dir().ends_with("media/cache"));
    }

    #[test]
    fn test_database_url_format() {
        let paths = AppPaths::current_dir();
        let url = paths.database_url();
        assert!(url.starts_with("sqlite:"));
        assert!(url.ends_with("filmshelf.db?mode=rwc"));
    }

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();
        assert_eq!(config.metadata.refresh_days, 30);
        assert_eq!(config.metadata.lookup_timeout_secs, 10);
        assert_eq!(config.metadata.image_timeout_secs, 30);
        assert!(config.metadata.tmdb_api_key.is_none());
        assert!(config.metadata.omdb_api_key.is_none());
        assert_eq!(config.metadata.tmdb_base_url, "https://api.themoviedb.org/3");
        assert_eq!(config.metadata.omdb_base_url, "https://www.omdbapi.com");
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[metadata]
tmdb_api_key = "tmdb_key"
omdb_api_key = "omdb_key"
refresh_days = 7

[paths]
data_dir = "/custom/data"
media_root = "/srv/media"
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.metadata.tmdb_api_key, Some("tmdb_key".to_string()));
        assert_eq!(config.metadata.omdb_api_key, Some("omdb_key".to_string()));
        assert_eq!(config.metadata.refresh_days, 7);
        assert_eq!(config.paths.data_dir, Some(PathBuf::from("/custom/data")));
        assert_eq!(config.paths.media_root, Some(PathBuf::from("/srv/media")));
    }

    #[test]
    fn test_partial_config_toml() {
        // Only specify what you need
        let toml_str = r#"
[metadata]
refresh_days = 14
tmdb_base_url = "http://localhost:8080/3"
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.metadata.refresh_days, 14);
        assert_eq!(config.metadata.tmdb_base_url, "http://localhost:8080/3");
        assert_eq!(config.metadata.omdb_base_url, OMDB_API_BASE);
        assert_eq!(config.metadata.image_timeout_secs, 30); // default
    }

    #[test]
    fn test_config_override_used_for_paths() {
        let overrides = PathsConfig {
            data_dir: Some(PathBuf::from("/custom/data")),
            media_root: None,
            config_dir: Some(PathBuf::from("/custom/config")),
        };
        let paths = AppPaths::new(&overrides);
        if std::env::var("FILMSHELF_DATA_DIR").is_err() {
            assert_eq!(paths.data_dir, PathBuf::from("/custom/data"));
            if std::env::var("FILMSHELF_MEDIA_ROOT").is_err() {
                assert_eq!(paths.media_root, PathBuf::from("/custom/data/media"));
            }
        }
        if std::env::var("FILMSHELF_CONFIG_DIR").is_err() {
            assert_eq!(paths.config_file_path(), PathBuf::from("/custom/config/config.toml"));
        }
    }
}
