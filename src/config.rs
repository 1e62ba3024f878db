//! Configuration types for tvdesk

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Catalog service settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// GraphQL endpoint (default: "https://graph.telewebion.com/graphql")
    #[serde(default = "default_catalog_endpoint")]
    pub endpoint: String,

    /// Value sent as `Referer` (default: "https://telewebion.com/")
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Item-count hint passed as `$NumOfItems` (None = let the service decide)
    #[serde(default)]
    pub item_count: Option<u32>,

    /// Request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: default_catalog_endpoint(),
            referer: default_referer(),
            item_count: None,
            timeout: default_request_timeout(),
        }
    }
}

/// Icon download settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Asset host base URL (default: "https://static.telewebion.com")
    ///
    /// Icons are fetched from `<base_url>/channelsLogo/<image_name>/default`.
    #[serde(default = "default_asset_base_url")]
    pub base_url: String,

    /// Maximum icon downloads in flight at once (default: 8)
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Per-download timeout, covering connect and body (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_url: default_asset_base_url(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            timeout: default_request_timeout(),
        }
    }
}

/// Launcher rendering settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Media player command (default: "/usr/bin/vlc")
    #[serde(default = "default_player_command")]
    pub player_command: String,

    /// Streaming host base URL (default: "https://ncdn.telewebion.com")
    ///
    /// Streams are played from `<stream_base_url>/<descriptor>/live/playlist.m3u8`.
    #[serde(default = "default_stream_base_url")]
    pub stream_base_url: String,

    /// Substring replaced once in the English name (default: "channel")
    #[serde(default = "default_name_pattern")]
    pub name_pattern: String,

    /// Replacement for `name_pattern` (default: "tv")
    #[serde(default = "default_name_replacement")]
    pub name_replacement: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            player_command: default_player_command(),
            stream_base_url: default_stream_base_url(),
            name_pattern: default_name_pattern(),
            name_replacement: default_name_replacement(),
        }
    }
}

/// Retry behavior for network operations
///
/// Disabled by default (`max_attempts = 0`): a failed request is reported as-is.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 0)
    #[serde(default)]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for a pipeline run
///
/// Every field has a default, so an empty TOML file (or `Config::default()`)
/// reproduces the stock Telewebion setup writing into `./tmp`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory receiving launcher files and icons (default: "./tmp")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Catalog service settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Icon download settings
    #[serde(default)]
    pub assets: AssetConfig,

    /// Launcher rendering settings
    #[serde(default)]
    pub launcher: LauncherConfig,

    /// Retry behavior
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            catalog: CatalogConfig::default(),
            assets: AssetConfig::default(),
            launcher: LauncherConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|e| Error::Config {
            message: format!("cannot parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every run fail or hang
    pub fn validate(&self) -> Result<()> {
        require_http_url(&self.catalog.endpoint, "catalog.endpoint")?;
        require_http_url(&self.assets.base_url, "assets.base_url")?;
        require_http_url(&self.launcher.stream_base_url, "launcher.stream_base_url")?;

        if self.assets.max_concurrent_downloads == 0 {
            return Err(config_error(
                "must be at least 1",
                "assets.max_concurrent_downloads",
            ));
        }
        if self.catalog.timeout.is_zero() {
            return Err(config_error("must be greater than zero", "catalog.timeout"));
        }
        if self.assets.timeout.is_zero() {
            return Err(config_error("must be greater than zero", "assets.timeout"));
        }
        if self.launcher.player_command.trim().is_empty() {
            return Err(config_error("must not be empty", "launcher.player_command"));
        }
        if self.launcher.name_pattern.is_empty() {
            return Err(config_error("must not be empty", "launcher.name_pattern"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(config_error(
                "must be at least 1.0",
                "retry.backoff_multiplier",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: format!("{}: {}", key, message),
        key: Some(key.to_string()),
    }
}

fn require_http_url(value: &str, key: &str) -> Result<()> {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(config_error(
            &format!("unsupported scheme {:?}", url.scheme()),
            key,
        )),
        Err(e) => Err(config_error(&format!("invalid URL: {}", e), key)),
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./tmp")
}

fn default_catalog_endpoint() -> String {
    "https://graph.telewebion.com/graphql".to_string()
}

fn default_referer() -> String {
    "https://telewebion.com/".to_string()
}

fn default_asset_base_url() -> String {
    "https://static.telewebion.com".to_string()
}

fn default_stream_base_url() -> String {
    "https://ncdn.telewebion.com".to_string()
}

fn default_player_command() -> String {
    "/usr/bin/vlc".to_string()
}

fn default_name_pattern() -> String {
    "channel".to_string()
}

fn default_name_replacement() -> String {
    "tv".to_string()
}

fn default_max_concurrent_downloads() -> usize {
    8
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
