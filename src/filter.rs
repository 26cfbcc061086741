//! Banned-link filtering with glob patterns reloaded per check.
//!
//! Patterns live in a plain-text file, one glob per non-blank line, and the
//! file may be edited externally while a crawl runs. The filter therefore
//! re-reads its backing source on every check instead of caching a set for
//! the whole run; pattern files are tiny, so the per-check read is cheap.
//! Malformed lines are skipped silently and never abort loading.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, instrument, warn};

/// An ordered sequence of compiled glob patterns.
///
/// Matching is existential: a URL is banned iff at least one pattern
/// matches, and the first match short-circuits.
#[derive(Debug, Clone, Default)]
pub struct BannedPatternSet {
    patterns: Vec<Pattern>,
}

impl BannedPatternSet {
    /// Parses newline-delimited glob patterns.
    ///
    /// Blank lines and lines that fail to compile as a glob are skipped;
    /// parsing never fails.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut patterns = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match Pattern::new(trimmed) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => {
                    debug!(line = trimmed, error = %e, "skipping malformed banned pattern");
                }
            }
        }
        Self { patterns }
    }

    /// True when no patterns are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Number of loaded patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True iff the URL matches at least one pattern.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(url))
    }
}

/// Decides whether candidate URLs are excluded from further crawling.
///
/// Owns the path to the banned-pattern file; every check loads the current
/// file contents so a pattern added mid-run takes effect on the next link.
#[derive(Debug)]
pub struct LinkFilter {
    path: PathBuf,
}

impl LinkFilter {
    /// Creates a filter backed by the given pattern file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the pattern set as of right now.
    ///
    /// An unreadable file yields an empty set; like history, the pattern
    /// source is never a hard dependency.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub async fn current_patterns(&self) -> BannedPatternSet {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => BannedPatternSet::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BannedPatternSet::default(),
            Err(e) => {
                warn!(error = %e, "failed to read banned patterns, treating as empty");
                BannedPatternSet::default()
            }
        }
    }

    /// True iff the URL matches a currently-loaded banned pattern.
    pub async fn is_banned(&self, url: &str) -> bool {
        self.current_patterns().await.matches(url)
    }
}
