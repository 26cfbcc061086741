//! HTTP client wrapper for streaming downloads.
//!
//! This module provides the `HttpClient` struct which handles streaming
//! GET requests with proper timeout configuration and error handling.
//! Bodies stream to disk through a fixed-size buffer so peak memory stays
//! bounded regardless of file size.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::error::DownloadError;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Write-buffer size for streaming bodies to disk (8 KiB).
const STREAM_BUFFER_BYTES: usize = 8 * 1024;

/// User-Agent sent with every request.
const USER_AGENT: &str = concat!("docharvest/", env!("CARGO_PKG_VERSION"));

/// HTTP client for downloading files with streaming support.
///
/// This client is designed to be created once and reused for multiple
/// downloads. The underlying connection pool does not change observable
/// behavior: each logical fetch stands alone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Streams a resource to the given destination path.
    ///
    /// Only a 200 response counts as success; any other status is an
    /// [`DownloadError::HttpStatus`]. A partial file left behind by a
    /// failed stream is removed best-effort so a later retry starts clean.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns a non-200 status
    /// - Writing to disk fails
    #[instrument(skip(self), fields(url = %url, destination = %destination.display()))]
    pub async fn fetch_to_path(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<(), DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        debug!("starting fetch");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let file = File::create(destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        let stream_result = stream_to_file(file, response, url, destination).await;
        if stream_result.is_err() {
            debug!("cleaning up partial file after error");
            let _ = tokio::fs::remove_file(destination).await;
        }
        let bytes_written = stream_result?;

        debug!(bytes = bytes_written, "fetch complete");
        Ok(())
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Streams the response body to the file, returning bytes written.
///
/// This is extracted to enable cleanup on error in the caller.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    destination: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::with_capacity(STREAM_BUFFER_BYTES, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        bytes_written += chunk.len() as u64;
    }

    // Ensure all data is flushed to disk
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(destination, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_defaults() {
        let client = HttpClient::new();
        assert!(format!("{client:?}").contains("Client"));
    }

    #[test]
    fn test_client_builds_with_explicit_timeouts() {
        let _client = HttpClient::new_with_timeouts(5, 10);
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_any_request() {
        let client = HttpClient::new();
        let dir = tempfile::TempDir::new().unwrap();
        let result = client
            .fetch_to_path("not a url", &dir.path().join("out.bin"))
            .await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }
}
