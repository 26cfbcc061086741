//! Crawl module: page fetching, link discovery, and download orchestration.
//!
//! The engine drives page visits and owns the frontier; the orchestrator is
//! the per-page handler that routes file links to the download stack and
//! non-banned anchor links back to the engine.

mod engine;
mod orchestrator;
mod pacing;

pub use engine::{
    CrawlEngine, CrawlStats, DEFAULT_CONCURRENCY, DEFAULT_STARTS_PER_MINUTE, EngineError,
    Frontier, LinkKind, PAGE_TIMEOUT_SECS, Page, PageHandler, PageLink,
};
pub use orchestrator::Orchestrator;
pub use pacing::Pacer;
