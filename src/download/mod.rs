//! HTTP download engine for streaming files to disk.
//!
//! This module implements the file-fetch protocol: a streamed GET written
//! to disk in fixed-size buffered chunks, a single automatic retry against
//! a `www.`-prefixed host when the original host is unresolvable, and an
//! append-only error log of permanently-failed URLs.
//!
//! # Example
//!
//! ```no_run
//! use docharvest_core::download::{FileFetcher, HttpClient};
//! use std::path::Path;
//!
//! # async fn example() {
//! let fetcher = FileFetcher::new(HttpClient::new(), "conf/error_links.txt");
//! let outcome = fetcher
//!     .fetch("https://example.com/paper.pdf", Path::new("downloaded_files/documents/paper.pdf"))
//!     .await;
//! println!("success: {}", outcome.is_success());
//! # }
//! ```

mod client;
mod error;
mod fetcher;
mod filename;

pub use client::{CONNECT_TIMEOUT_SECS, HttpClient, READ_TIMEOUT_SECS};
pub use error::{DownloadError, is_dns_failure};
pub use fetcher::{FetchOutcome, FileFetcher};
pub use filename::{destination_path, derive_filename};
