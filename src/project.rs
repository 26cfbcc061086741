//! Workspace layout and bootstrap for crawl runs.
//!
//! A run works against two directory roots: the download base directory,
//! partitioned into one subdirectory per category, and the conf directory
//! holding the history file, the banned-pattern file, and the error log.
//! Bootstrap creates whatever is missing and never touches existing files.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::classify::Category;

/// Default download base directory.
pub const DEFAULT_BASE_DIR: &str = "downloaded_files";

/// Default configuration directory.
pub const DEFAULT_CONF_DIR: &str = "conf";

/// Start URL used when neither the CLI nor the environment provides one.
pub const PLACEHOLDER_START_URL: &str = "https://example.com";

const HISTORY_FILE: &str = "download_history.json";
const BANNED_FILE: &str = "banned.txt";
const ERROR_LOG_FILE: &str = "error_links.txt";

/// Directory roots for one crawl run.
#[derive(Debug, Clone)]
pub struct Workspace {
    base_dir: PathBuf,
    conf_dir: PathBuf,
}

impl Workspace {
    /// Creates a workspace over the given roots.
    pub fn new(base_dir: impl Into<PathBuf>, conf_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            conf_dir: conf_dir.into(),
        }
    }

    /// The download base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The directory a category's files are saved under.
    #[must_use]
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.base_dir.join(category.dir_name())
    }

    /// Path of the persisted history file.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.conf_dir.join(HISTORY_FILE)
    }

    /// Path of the banned-pattern file.
    #[must_use]
    pub fn banned_path(&self) -> PathBuf {
        self.conf_dir.join(BANNED_FILE)
    }

    /// Path of the error log.
    #[must_use]
    pub fn error_log_path(&self) -> PathBuf {
        self.conf_dir.join(ERROR_LOG_FILE)
    }

    /// Creates the base directory, every category directory, the conf
    /// directory, and each default conf file that is missing.
    ///
    /// Existing files are left untouched, so history and banned patterns
    /// survive across runs.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if a directory or file cannot be
    /// created.
    pub fn bootstrap(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        for category in Category::ALL {
            std::fs::create_dir_all(self.category_dir(category))?;
        }
        std::fs::create_dir_all(&self.conf_dir)?;

        // Empty JSON list for history; empty files for patterns and errors.
        write_if_missing(&self.history_path(), b"[]")?;
        write_if_missing(&self.banned_path(), b"")?;
        write_if_missing(&self.error_log_path(), b"")?;

        debug!(
            base_dir = %self.base_dir.display(),
            conf_dir = %self.conf_dir.display(),
            "workspace ready"
        );
        Ok(())
    }
}

fn write_if_missing(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    std::fs::write(path, content)
}

/// Errors from start-URL validation.
#[derive(Debug, Error)]
pub enum StartUrlError {
    /// The URL could not be parsed at all.
    #[error("invalid start URL {input:?}: {source}")]
    Parse {
        /// The offending input.
        input: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// Parsed, but the scheme is not http or https.
    #[error("start URL must use http or https, got {scheme:?}")]
    UnsupportedScheme {
        /// The rejected scheme.
        scheme: String,
    },
}

/// Validates a start URL, defaulting the scheme to `http` when missing.
///
/// Accepts bare hosts like `example.com/docs`; rejects non-HTTP schemes.
///
/// # Errors
///
/// Returns [`StartUrlError`] when the input cannot be parsed as an HTTP(S)
/// URL even after prepending a scheme.
pub fn validate_start_url(input: &str) -> Result<Url, StartUrlError> {
    let trimmed = input.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let parsed = Url::parse(&candidate).map_err(|source| StartUrlError::Parse {
        input: input.to_string(),
        source,
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(StartUrlError::UnsupportedScheme {
            scheme: scheme.to_string(),
        }),
    }
}
