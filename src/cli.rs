//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use docharvest_core::crawl::{DEFAULT_CONCURRENCY, DEFAULT_STARTS_PER_MINUTE, PAGE_TIMEOUT_SECS};
use docharvest_core::project::{DEFAULT_BASE_DIR, DEFAULT_CONF_DIR};

/// Crawl a website and organize downloadable documents by type.
///
/// Docharvest follows links from a start URL, downloads previously-unseen
/// document and media files into a type-partitioned directory tree, and
/// remembers what it already fetched across runs.
#[derive(Parser, Debug)]
#[command(name = "docharvest")]
#[command(author, version, about)]
pub struct Args {
    /// Start URL for the crawl (falls back to the INITIAL_URL environment
    /// variable, then a placeholder)
    pub start_url: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory downloaded files are organized under
    #[arg(long, default_value = DEFAULT_BASE_DIR)]
    pub base_dir: PathBuf,

    /// Directory holding history, banned patterns, and the error log
    #[arg(long, default_value = DEFAULT_CONF_DIR)]
    pub conf_dir: PathBuf,

    /// Maximum concurrent page handlers (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Maximum page-processing starts per minute (0 disables pacing, max 600)
    #[arg(long, default_value_t = DEFAULT_STARTS_PER_MINUTE, value_parser = clap::value_parser!(u32).range(0..=600))]
    pub starts_per_minute: u32,

    /// Seconds before an unresponsive page is abandoned
    #[arg(long, default_value_t = PAGE_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub page_timeout: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["docharvest"]).unwrap();
        assert_eq!(args.start_url, None);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.concurrency, 10); // DEFAULT_CONCURRENCY
        assert_eq!(args.starts_per_minute, 60); // DEFAULT_STARTS_PER_MINUTE
        assert_eq!(args.page_timeout, 300); // PAGE_TIMEOUT_SECS
        assert_eq!(args.base_dir, PathBuf::from("downloaded_files"));
        assert_eq!(args.conf_dir, PathBuf::from("conf"));
    }

    #[test]
    fn test_cli_positional_start_url() {
        let args = Args::try_parse_from(["docharvest", "https://example.com"]).unwrap();
        assert_eq!(args.start_url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["docharvest", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["docharvest", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["docharvest", "-q"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = Args::try_parse_from(["docharvest", "-c", "1"]).unwrap();
        assert_eq!(args.concurrency, 1);

        let args = Args::try_parse_from(["docharvest", "-c", "100"]).unwrap();
        assert_eq!(args.concurrency, 100);

        let result = Args::try_parse_from(["docharvest", "-c", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );

        let result = Args::try_parse_from(["docharvest", "-c", "101"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_starts_per_minute_zero_disables_pacing() {
        let args = Args::try_parse_from(["docharvest", "--starts-per-minute", "0"]).unwrap();
        assert_eq!(args.starts_per_minute, 0);
    }

    #[test]
    fn test_cli_starts_per_minute_over_max_rejected() {
        let result = Args::try_parse_from(["docharvest", "--starts-per-minute", "601"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_page_timeout_zero_rejected() {
        let result = Args::try_parse_from(["docharvest", "--page-timeout", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_directory_overrides() {
        let args = Args::try_parse_from([
            "docharvest",
            "--base-dir",
            "/tmp/files",
            "--conf-dir",
            "/tmp/conf",
        ])
        .unwrap();
        assert_eq!(args.base_dir, PathBuf::from("/tmp/files"));
        assert_eq!(args.conf_dir, PathBuf::from("/tmp/conf"));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["docharvest", "--help"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["docharvest", "--invalid-flag"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::UnknownArgument
        );
    }
}
