//! Icon asset downloads
//!
//! Icons are streamed chunk by chunk into a `.part` sibling of the destination
//! and renamed into place once the body is complete, so a failed transfer
//! never replaces a good icon from a previous run with a truncated one.

use crate::config::{AssetConfig, RetryConfig};
use crate::error::{Error, NetworkError, Result};
use crate::layout::partial_path;
use crate::retry::with_retry;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Icon URL for an image name: `<base>/channelsLogo/<image_name>/default`
///
/// The image name is percent-encoded as a single path segment.
///
/// ```
/// use tvdesk::assets::icon_url;
///
/// assert_eq!(
///     icon_url("https://static.telewebion.com", "irinn_logo"),
///     "https://static.telewebion.com/channelsLogo/irinn_logo/default"
/// );
/// ```
#[must_use]
pub fn icon_url(base_url: &str, image_name: &str) -> String {
    format!(
        "{}/channelsLogo/{}/default",
        base_url.trim_end_matches('/'),
        urlencoding::encode(image_name)
    )
}

/// Streaming HTTP downloader for channel icons
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct AssetDownloader {
    http_client: reqwest::Client,
    retry: RetryConfig,
}

impl AssetDownloader {
    /// Create a downloader with the configured per-request timeout
    ///
    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be created
    pub fn new(config: &AssetConfig, retry: RetryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("tvdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http_client("assets", e))?;

        Ok(Self { http_client, retry })
    }

    /// Download `url` to `dest`, replacing any existing file
    ///
    /// Returns the number of bytes written.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let bytes = self.fetch(url, dest).await?;
        commit(dest).await?;
        Ok(bytes)
    }

    /// Download `url` into the `.part` sibling of `dest`, leaving `dest` untouched
    ///
    /// The partial file is removed when the transfer fails. Pair with
    /// [`commit`] to move it into place.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        with_retry(&self.retry, || self.fetch_once(url, dest)).await
    }

    async fn fetch_once(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let part = partial_path(dest);
        match stream_to_file(response, url, &part).await {
            Ok(bytes) => {
                tracing::debug!(url = %url, path = %part.display(), bytes, "icon fetched");
                Ok(bytes)
            }
            Err(e) => {
                // Best effort: the partial file is garbage either way
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}

/// Move a completed [`AssetDownloader::fetch`] from its `.part` file to `dest`
pub async fn commit(dest: &Path) -> Result<()> {
    tokio::fs::rename(partial_path(dest), dest)
        .await
        .map_err(|e| Error::file_write(dest, e))
}

async fn stream_to_file(response: reqwest::Response, url: &str, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| Error::file_write(path, e))?;

    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::transport(url, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::file_write(path, e))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| Error::file_write(path, e))?;
    Ok(written)
}
