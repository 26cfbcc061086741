//! File-fetch protocol: streamed GET with a `www.`-prefix DNS fallback.
//!
//! When the original host is unresolvable and does not already start with
//! `www.`, the fetch is retried exactly once against the `www.`-prefixed
//! URL. Every permanently-failed URL is appended to the error log under its
//! original form; the log is diagnostic only and never read back.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument, warn};
use url::Url;

use super::client::HttpClient;
use super::error::{DownloadError, is_dns_failure};

/// Result of a fetch, after the fallback retry has been exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The resource body was fully streamed to the destination path.
    Success,
    /// The fetch (and any fallback retry) failed; the URL was appended to
    /// the error log.
    Failure,
}

impl FetchOutcome {
    /// True for [`FetchOutcome::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, FetchOutcome::Success)
    }
}

/// Fetches resources to disk and records permanent failures.
#[derive(Debug)]
pub struct FileFetcher {
    client: HttpClient,
    error_log: PathBuf,
}

impl FileFetcher {
    /// Creates a fetcher writing permanent failures to `error_log`.
    pub fn new(client: HttpClient, error_log: impl Into<PathBuf>) -> Self {
        Self {
            client,
            error_log: error_log.into(),
        }
    }

    /// Returns the error-log path.
    #[must_use]
    pub fn error_log_path(&self) -> &Path {
        &self.error_log
    }

    /// Fetches `url` to `destination`, retrying once with a `www.`-prefixed
    /// host when the original host fails DNS resolution.
    ///
    /// Failures are terminal for this link only: the URL is appended to the
    /// error log and [`FetchOutcome::Failure`] is returned, never an error.
    #[instrument(skip(self), fields(url = %url, destination = %destination.display()))]
    pub async fn fetch(&self, url: &str, destination: &Path) -> FetchOutcome {
        let first_error = match self.client.fetch_to_path(url, destination).await {
            Ok(()) => return FetchOutcome::Success,
            Err(e) => e,
        };

        if is_dns_failure(&first_error) && !host_has_www_prefix(url) {
            if let Some(www_url) = add_www_to_url(url) {
                info!(retry_url = %www_url, "host unresolvable, retrying with www prefix");
                match self.client.fetch_to_path(&www_url, destination).await {
                    Ok(()) => return FetchOutcome::Success,
                    Err(retry_error) => {
                        error!(
                            error = %retry_error,
                            "download failed both with and without www prefix"
                        );
                    }
                }
            } else {
                error!(error = %first_error, "host unresolvable and URL cannot be rewritten");
            }
        } else {
            error!(error = %first_error, "download failed");
        }

        self.append_error(url).await;
        FetchOutcome::Failure
    }

    /// Appends the original URL to the error log, one URL per line.
    ///
    /// Logging the failure must never fail the fetch path, so write errors
    /// are only warned about.
    async fn append_error(&self, url: &str) {
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.error_log)
                .await?;
            file.write_all(url.as_bytes()).await?;
            file.write_all(b"\n").await?;
            file.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!(path = %self.error_log.display(), error = %e, "failed to append to error log");
        }
    }
}

/// True when the URL's host already starts with `www.`.
pub(crate) fn host_has_www_prefix(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.starts_with("www.")))
        .unwrap_or(false)
}

/// Rewrites the URL with `www.` prepended to its host.
///
/// Returns `None` when the URL does not parse, has no host, or rejects the
/// rewritten host.
pub(crate) fn add_www_to_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_string();
    if host.starts_with("www.") {
        return Some(parsed.into());
    }
    parsed.set_host(Some(&format!("www.{host}"))).ok()?;
    Some(parsed.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_host_has_www_prefix() {
        assert!(host_has_www_prefix("https://www.example.com/a.pdf"));
        assert!(!host_has_www_prefix("https://example.com/a.pdf"));
        assert!(!host_has_www_prefix("https://sub.example.com/a.pdf"));
        assert!(!host_has_www_prefix("not a url"));
    }

    #[test]
    fn test_add_www_to_url_prepends_host() {
        assert_eq!(
            add_www_to_url("https://example.com/a.pdf").as_deref(),
            Some("https://www.example.com/a.pdf")
        );
        assert_eq!(
            add_www_to_url("http://files.example.com/b?x=1").as_deref(),
            Some("http://www.files.example.com/b?x=1")
        );
    }

    #[test]
    fn test_add_www_to_url_keeps_existing_prefix() {
        assert_eq!(
            add_www_to_url("https://www.example.com/a.pdf").as_deref(),
            Some("https://www.example.com/a.pdf")
        );
    }

    #[test]
    fn test_add_www_to_url_preserves_port_and_path() {
        assert_eq!(
            add_www_to_url("http://example.com:8080/deep/path.pdf").as_deref(),
            Some("http://www.example.com:8080/deep/path.pdf")
        );
    }

    #[test]
    fn test_add_www_to_url_rejects_unparseable_input() {
        assert_eq!(add_www_to_url("not a url"), None);
    }
}
