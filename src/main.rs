//! CLI entry point for the docharvest crawler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use docharvest_core::{
    CrawlEngine, FileFetcher, HistoryStore, HttpClient, LinkFilter, Orchestrator,
    PLACEHOLDER_START_URL, Workspace, validate_start_url,
};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Docharvest starting");

    // A .env file may carry INITIAL_URL; absence is fine.
    let _ = dotenvy::dotenv();

    let start_input = args
        .start_url
        .or_else(|| std::env::var("INITIAL_URL").ok())
        .unwrap_or_else(|| PLACEHOLDER_START_URL.to_string());
    let start_url = validate_start_url(&start_input)?;
    info!(start_url = %start_url, "resolved start URL");

    let workspace = Workspace::new(&args.base_dir, &args.conf_dir);
    workspace.bootstrap()?;

    let history = Arc::new(HistoryStore::new(workspace.history_path()));
    let initial_count = history.len().await;
    info!(previously_downloaded = initial_count, "loaded download history");

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&history),
        LinkFilter::new(workspace.banned_path()),
        FileFetcher::new(HttpClient::new(), workspace.error_log_path()),
        workspace.base_dir(),
    ));

    let engine = CrawlEngine::new(
        usize::from(args.concurrency),
        args.starts_per_minute,
        Duration::from_secs(args.page_timeout),
    )?;

    let stats = engine.run(&start_url, orchestrator).await?;

    let final_count = history.len().await;
    info!(
        pages_visited = stats.visited(),
        pages_skipped = stats.skipped(),
        pages_failed = stats.failed(),
        "crawl session completed"
    );
    info!(
        previously_downloaded = initial_count,
        new_downloads = final_count.saturating_sub(initial_count),
        total_unique_files = final_count,
        "download summary"
    );

    Ok(())
}
