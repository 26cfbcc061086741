//! Docharvest Core Library
//!
//! This library implements a website crawler that discovers hyperlinks and
//! embedded resources, classifies them by file type, and downloads
//! previously-unseen document/media files into a type-partitioned directory
//! tree, persisting a dedup history across runs.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`classify`] - Extension-based file-type classification
//! - [`crawl`] - Crawl engine, pacing, and per-page orchestration
//! - [`download`] - Streaming file fetcher with www-prefix DNS fallback
//! - [`filter`] - Banned-link glob filtering, reloaded per check
//! - [`history`] - Persistent download-history set
//! - [`project`] - Workspace layout, bootstrap, start-URL validation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod crawl;
pub mod download;
pub mod filter;
pub mod history;
pub mod project;

// Re-export commonly used types
pub use classify::{Category, classify};
pub use crawl::{
    CrawlEngine, CrawlStats, EngineError, Frontier, LinkKind, Orchestrator, Page, PageHandler,
    PageLink,
};
pub use download::{DownloadError, FetchOutcome, FileFetcher, HttpClient};
pub use filter::{BannedPatternSet, LinkFilter};
pub use history::{HistoryError, HistoryStore};
pub use project::{PLACEHOLDER_START_URL, Workspace, validate_start_url};
