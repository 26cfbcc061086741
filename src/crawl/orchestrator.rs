//! Per-page download orchestration: classify, dedup, fetch, filter.
//!
//! The orchestrator is the engine's page handler. It decides what to
//! download and what to hand back for further visiting, but never mutates
//! crawl scheduling itself. File links flow through the history store and
//! file fetcher; non-file anchor links flow through the banned-pattern
//! filter to the engine's enqueue.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument};
use url::Url;

use super::engine::{Frontier, LinkKind, Page, PageHandler, PageLink};
use crate::classify::{self, Category};
use crate::download::{FileFetcher, derive_filename, destination_path};
use crate::filter::LinkFilter;
use crate::history::HistoryStore;

/// Routes each candidate link on a visited page to download or enqueue.
#[derive(Debug)]
pub struct Orchestrator {
    history: Arc<HistoryStore>,
    filter: LinkFilter,
    fetcher: FileFetcher,
    base_dir: PathBuf,
}

impl Orchestrator {
    /// Creates an orchestrator saving files under `base_dir/<category>/`.
    pub fn new(
        history: Arc<HistoryStore>,
        filter: LinkFilter,
        fetcher: FileFetcher,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            history,
            filter,
            fetcher,
            base_dir: base_dir.into(),
        }
    }

    /// Processes one candidate link from the page.
    async fn process_link(&self, page: &Page, link: &PageLink, frontier: &Frontier) {
        let Ok(absolute) = page.url.join(&link.href) else {
            debug!(href = %link.href, "unresolvable link, skipping");
            return;
        };

        // Decode for extension inspection and filename derivation; the
        // resolved form stays the fetch target and dedup key.
        let decoded = match urlencoding::decode(absolute.as_str()) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => absolute.to_string(),
        };

        match classify::classify(&decoded) {
            Some(category) => {
                self.process_file_link(absolute.as_str(), &decoded, category)
                    .await;
            }
            None => self.process_page_link(&absolute, link.kind, frontier).await,
        }
    }

    /// Downloads a previously-unseen file link and settles the history
    /// record according to the fetch outcome.
    #[instrument(skip(self, decoded), fields(url = %url, category = %category))]
    async fn process_file_link(&self, url: &str, decoded: &str, category: Category) {
        // Re-read per link: another page handler may have gotten here first.
        let mut history = self.history.load().await;
        if history.contains(url) {
            debug!("already downloaded, skipping");
            return;
        }
        history.insert(url.to_string());

        let extension = classify::extension(decoded).unwrap_or_default();
        let filename = derive_filename(decoded, &extension, history.len());
        let destination = destination_path(&self.base_dir, category.dir_name(), &filename);

        info!(filename = %filename, "downloading file");
        if self.fetcher.fetch(url, &destination).await.is_success() {
            info!(filename = %filename, "downloaded");
            if let Err(e) = self.history.record(url).await {
                error!(error = %e, "failed to persist download history");
            }
        } else {
            error!(filename = %filename, "download failed");
            // Settle the speculative add so a later run may retry this URL.
            if let Err(e) = self.history.retract(url).await {
                error!(error = %e, "failed to persist download history");
            }
        }
    }

    /// Offers a non-file anchor link back to the engine unless banned.
    async fn process_page_link(&self, url: &Url, kind: LinkKind, frontier: &Frontier) {
        if kind != LinkKind::Anchor {
            return;
        }

        // One pattern load per link covers both the explicit skip and the
        // enqueue exclusion, keeping the two in sync.
        let patterns = self.filter.current_patterns().await;
        if patterns.matches(url.as_str()) {
            info!(url = %url, "skipping banned link");
            return;
        }
        frontier.enqueue(url, &patterns);
    }
}

#[async_trait]
impl PageHandler for Orchestrator {
    async fn handle_page(&self, page: &Page, frontier: &Frontier) {
        info!(url = %page.url, links = page.links.len(), "processing page");
        for link in &page.links {
            self.process_link(page, link, frontier).await;
        }
    }
}
