//! Crawl engine: page fetching, link discovery, and frontier management.
//!
//! The engine drives the per-page handler and stays policy-free: it fetches
//! HTML pages, extracts `(tag_type, raw_url)` pairs in document order, and
//! exposes an enqueue operation gated by an exclusion pattern set. What gets
//! downloaded or followed is decided entirely by the handler.
//!
//! # Concurrency Model
//!
//! - Each page is processed in its own Tokio task
//! - A semaphore permit is acquired before starting each page
//! - Page starts are additionally paced by a fixed per-minute ceiling
//! - Permits are released automatically when page tasks complete (RAII)

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::pacing::Pacer;
use crate::filter::BannedPatternSet;

/// Minimum allowed page concurrency.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed page concurrency.
const MAX_CONCURRENCY: usize = 100;

/// Default page concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default ceiling on page-processing starts per minute.
pub const DEFAULT_STARTS_PER_MINUTE: u32 = 60;

/// Default per-page request ceiling (5 minutes); an expired page is
/// abandoned, not fatal to the run.
pub const PAGE_TIMEOUT_SECS: u64 = 300;

/// Error type for crawl engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Building the HTTP client failed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// The markup element a candidate link came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// An `<a href>` reference; eligible for further crawling.
    Anchor,
    /// An `<img src>` reference; embed-only, never followed as a page.
    Image,
}

/// One candidate link extracted from a page, with its raw (unresolved)
/// href/src value.
#[derive(Debug, Clone)]
pub struct PageLink {
    /// Element the link came from.
    pub kind: LinkKind,
    /// Raw attribute value, before resolution against the page URL.
    pub href: String,
}

/// A fetched and parsed page handed to the [`PageHandler`].
#[derive(Debug, Clone)]
pub struct Page {
    /// The page's own URL (after redirects).
    pub url: Url,
    /// Candidate links in document order.
    pub links: Vec<PageLink>,
}

/// Per-page callback invoked by the engine.
#[async_trait]
pub trait PageHandler: Send + Sync {
    /// Processes one visited page. Links worth visiting later go back to the
    /// engine through [`Frontier::enqueue`].
    async fn handle_page(&self, page: &Page, frontier: &Frontier);
}

/// The engine's visit queue plus the set of URLs ever enqueued.
///
/// Shared between the engine loop and concurrent page handlers; the lock is
/// only held for queue manipulation, never across I/O.
#[derive(Debug, Default)]
pub struct Frontier {
    state: std::sync::Mutex<FrontierState>,
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<String>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the frontier with the start URL, bypassing exclusion checks.
    pub fn seed(&self, url: &Url) {
        let mut state = self.lock();
        let key = without_fragment(url);
        if state.seen.insert(key.clone()) {
            state.queue.push_back(key);
        }
    }

    /// Offers a URL for future visiting.
    ///
    /// Dropped when the scheme is not http(s), when the URL matches any
    /// exclusion pattern, or when it was already enqueued during this run.
    /// Returns whether the URL was accepted.
    pub fn enqueue(&self, url: &Url, exclude: &BannedPatternSet) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        let key = without_fragment(url);
        if exclude.matches(&key) {
            debug!(url = %key, "excluded from enqueue by banned pattern");
            return false;
        }

        let mut state = self.lock();
        if !state.seen.insert(key.clone()) {
            return false;
        }
        state.queue.push_back(key);
        true
    }

    /// Number of URLs waiting to be visited.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    fn next(&self) -> Option<String> {
        self.lock().queue.pop_front()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FrontierState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Frontier keys are fragment-free: `page#a` and `page#b` are one visit.
fn without_fragment(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

/// Statistics from a crawl run.
///
/// Uses atomic counters for thread-safe updates from concurrent page tasks.
#[derive(Debug, Default)]
pub struct CrawlStats {
    visited: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl CrawlStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages fetched, parsed, and handed to the handler.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.visited.load(Ordering::SeqCst)
    }

    /// Pages skipped because the response was not HTML.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Pages abandoned after a fetch failure or timeout.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    fn increment_visited(&self) {
        self.visited.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Crawl engine driving per-page handlers with bounded concurrency.
#[derive(Debug)]
pub struct CrawlEngine {
    client: Client,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    pacer: Pacer,
    page_timeout: Duration,
}

impl CrawlEngine {
    /// Creates a new engine.
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Maximum concurrent page handlers (1-100)
    /// * `starts_per_minute` - Page-start ceiling (0 disables pacing)
    /// * `page_timeout` - Per-page request ceiling
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range, or [`EngineError::Client`] if the HTTP client fails
    /// to build.
    #[instrument(level = "debug")]
    pub fn new(
        concurrency: usize,
        starts_per_minute: u32,
        page_timeout: Duration,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        let client = Client::builder()
            .user_agent(concat!("docharvest/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()?;

        debug!(
            concurrency,
            starts_per_minute,
            page_timeout_secs = page_timeout.as_secs(),
            "creating crawl engine"
        );

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            pacer: Pacer::per_minute(starts_per_minute),
            page_timeout,
        })
    }

    /// Returns the configured page concurrency.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs a crawl from `start_url` until the frontier is exhausted.
    ///
    /// Individual page failures never error this method; they are logged,
    /// counted, and the crawl moves on.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    #[instrument(skip(self, handler), fields(start_url = %start_url))]
    pub async fn run<H>(&self, start_url: &Url, handler: Arc<H>) -> Result<CrawlStats, EngineError>
    where
        H: PageHandler + 'static,
    {
        let frontier = Arc::new(Frontier::new());
        frontier.seed(start_url);

        let stats = Arc::new(CrawlStats::new());
        let mut tasks: JoinSet<()> = JoinSet::new();

        info!("starting crawl");

        loop {
            let Some(url) = frontier.next() else {
                // Nothing queued right now; an in-flight page may still
                // enqueue more. Wait for one to finish, then re-check.
                match tasks.join_next().await {
                    Some(Ok(())) => continue,
                    Some(Err(e)) => {
                        warn!(error = %e, "page task panicked");
                        continue;
                    }
                    None => break,
                }
            };

            // Acquire semaphore permit (blocks if at concurrency limit),
            // then wait out the per-minute ceiling.
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;
            self.pacer.acquire().await;

            let client = self.client.clone();
            let frontier = Arc::clone(&frontier);
            let handler = Arc::clone(&handler);
            let stats = Arc::clone(&stats);
            let page_timeout = self.page_timeout;

            tasks.spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;

                match fetch_page(&client, &url, page_timeout).await {
                    PageFetch::Parsed(page) => {
                        handler.handle_page(&page, &frontier).await;
                        stats.increment_visited();
                    }
                    PageFetch::Skipped => stats.increment_skipped(),
                    PageFetch::Failed => stats.increment_failed(),
                }
            });
        }

        let visited = stats.visited();
        let skipped = stats.skipped();
        let failed = stats.failed();
        info!(visited, skipped, failed, "crawl complete");

        match Arc::try_unwrap(stats) {
            Ok(stats) => Ok(stats),
            Err(arc_stats) => {
                // All tasks are joined, so sole ownership is expected; fall
                // back to copying the atomic values if not.
                let new_stats = CrawlStats::new();
                new_stats.visited.store(arc_stats.visited(), Ordering::SeqCst);
                new_stats.skipped.store(arc_stats.skipped(), Ordering::SeqCst);
                new_stats.failed.store(arc_stats.failed(), Ordering::SeqCst);
                Ok(new_stats)
            }
        }
    }
}

/// Outcome of fetching one page.
enum PageFetch {
    /// HTML fetched and parsed.
    Parsed(Page),
    /// Response was not an HTML page.
    Skipped,
    /// Transport error, timeout, or non-success status.
    Failed,
}

/// Fetches and parses a single page. Failures are logged here and reported
/// through the return value; they never propagate.
async fn fetch_page(client: &Client, url: &str, timeout: Duration) -> PageFetch {
    debug!(url, "processing page");

    let response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(url, error = %e, "page request failed");
            return PageFetch::Failed;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(url, status = status.as_u16(), "page returned error status");
        return PageFetch::Failed;
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.contains("text/html") {
        debug!(url, content_type, "not an HTML page, skipping");
        return PageFetch::Skipped;
    }

    let final_url = response.url().clone();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!(url, error = %e, "failed to read page body");
            return PageFetch::Failed;
        }
    };

    let links = parse_links(&body);
    debug!(url, links = links.len(), "parsed page");
    PageFetch::Parsed(Page {
        url: final_url,
        links,
    })
}

/// Extracts `a[href]` and `img[src]` references in document order.
///
/// Values are returned raw; resolution against the page URL is the
/// handler's concern.
pub(crate) fn parse_links(html: &str) -> Vec<PageLink> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href], img[src]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let value = element.value();
        let (kind, attribute) = match value.name() {
            "a" => (LinkKind::Anchor, "href"),
            _ => (LinkKind::Image, "src"),
        };
        if let Some(raw) = value.attr(attribute) {
            let raw = raw.trim();
            if !raw.is_empty() {
                links.push(PageLink {
                    kind,
                    href: raw.to_string(),
                });
            }
        }
    }
    links
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_new_valid_concurrency() {
        let engine =
            CrawlEngine::new(1, DEFAULT_STARTS_PER_MINUTE, Duration::from_secs(300)).unwrap();
        assert_eq!(engine.concurrency(), 1);

        let engine =
            CrawlEngine::new(100, DEFAULT_STARTS_PER_MINUTE, Duration::from_secs(300)).unwrap();
        assert_eq!(engine.concurrency(), 100);
    }

    #[test]
    fn test_engine_new_invalid_concurrency() {
        let result = CrawlEngine::new(0, DEFAULT_STARTS_PER_MINUTE, Duration::from_secs(300));
        assert!(matches!(
            result,
            Err(EngineError::InvalidConcurrency { value: 0 })
        ));

        let result = CrawlEngine::new(101, DEFAULT_STARTS_PER_MINUTE, Duration::from_secs(300));
        assert!(matches!(
            result,
            Err(EngineError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_parse_links_in_document_order() {
        let html = r#"
            <html><body>
                <a href="a.pdf">doc</a>
                <img src="b.jpg">
                <a href="/page">page</a>
            </body></html>
        "#;
        let links = parse_links(html);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].kind, LinkKind::Anchor);
        assert_eq!(links[0].href, "a.pdf");
        assert_eq!(links[1].kind, LinkKind::Image);
        assert_eq!(links[1].href, "b.jpg");
        assert_eq!(links[2].kind, LinkKind::Anchor);
        assert_eq!(links[2].href, "/page");
    }

    #[test]
    fn test_parse_links_ignores_missing_and_empty_attributes() {
        let html = r#"<body><a>no href</a><a href="">blank</a><img alt="x"></body>"#;
        assert!(parse_links(html).is_empty());
    }

    #[test]
    fn test_frontier_dedupes_urls() {
        let frontier = Frontier::new();
        let url = Url::parse("https://example.com/page").unwrap();
        let none = BannedPatternSet::default();

        assert!(frontier.enqueue(&url, &none));
        assert!(!frontier.enqueue(&url, &none));
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn test_frontier_ignores_fragments() {
        let frontier = Frontier::new();
        let none = BannedPatternSet::default();

        let a = Url::parse("https://example.com/page#intro").unwrap();
        let b = Url::parse("https://example.com/page#details").unwrap();
        assert!(frontier.enqueue(&a, &none));
        assert!(!frontier.enqueue(&b, &none));
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn test_frontier_rejects_non_http_schemes() {
        let frontier = Frontier::new();
        let none = BannedPatternSet::default();

        let mailto = Url::parse("mailto:someone@example.com").unwrap();
        assert!(!frontier.enqueue(&mailto, &none));

        let ftp = Url::parse("ftp://example.com/file").unwrap();
        assert!(!frontier.enqueue(&ftp, &none));
        assert_eq!(frontier.pending(), 0);
    }

    #[test]
    fn test_frontier_applies_exclusion_patterns() {
        let frontier = Frontier::new();
        let banned = BannedPatternSet::parse("*/private/*\n");

        let blocked = Url::parse("https://example.com/private/page").unwrap();
        assert!(!frontier.enqueue(&blocked, &banned));

        let open = Url::parse("https://example.com/public/page").unwrap();
        assert!(frontier.enqueue(&open, &banned));
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn test_frontier_seed_bypasses_exclusions() {
        let frontier = Frontier::new();
        let url = Url::parse("https://example.com/").unwrap();
        frontier.seed(&url);
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn test_frontier_next_is_fifo() {
        let frontier = Frontier::new();
        let none = BannedPatternSet::default();
        frontier.enqueue(&Url::parse("https://example.com/1").unwrap(), &none);
        frontier.enqueue(&Url::parse("https://example.com/2").unwrap(), &none);

        assert_eq!(frontier.next().as_deref(), Some("https://example.com/1"));
        assert_eq!(frontier.next().as_deref(), Some("https://example.com/2"));
        assert_eq!(frontier.next(), None);
    }
}
