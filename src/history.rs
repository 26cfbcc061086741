//! Persistent download history backed by a JSON file.
//!
//! The history is the durable set of URLs already downloaded across all
//! runs, stored as a JSON array of strings and rewritten wholesale on each
//! update. Loading is best-effort: a missing or malformed file yields an
//! empty set, because losing history only causes re-downloads, never data
//! loss. Mutations go through [`HistoryStore::record`] and
//! [`HistoryStore::retract`], which serialize the load-modify-persist cycle
//! behind an internal lock so concurrent page handlers cannot lose updates
//! within one run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Errors that can occur while persisting history.
///
/// Loading never errors; unreadable or malformed history degrades to an
/// empty set instead.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// File system error while writing the history file.
    #[error("IO error writing history to {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization of the set failed.
    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
}

impl HistoryError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Store for the persisted set of already-downloaded URLs.
///
/// Owns the backing file exclusively; callers never touch the file directly.
/// Membership is plain string equality on full URLs - no normalization is
/// performed, so two URLs differing only in decoration are distinct.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    /// Serializes every load-modify-persist cycle (single-writer discipline).
    writer: Mutex<()>,
}

impl HistoryStore {
    /// Creates a store backed by the given file path. The file itself is
    /// only touched on first persist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted set from storage.
    ///
    /// A missing file or malformed content yields an empty set; history is
    /// never a hard dependency for the current run.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> HashSet<String> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no history file yet, starting empty");
                return HashSet::new();
            }
            Err(e) => {
                warn!(error = %e, "failed to read history file, treating as empty");
                return HashSet::new();
            }
        };

        match serde_json::from_slice::<Vec<String>>(&bytes) {
            Ok(urls) => urls.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "malformed history file, treating as empty");
                HashSet::new()
            }
        }
    }

    /// Atomically overwrites the persisted representation with the full
    /// given set.
    ///
    /// This is a full-rewrite, not an append: callers supply the complete
    /// up-to-date set each time. The containing directory is created if
    /// missing, and the write goes to a temporary sibling that is renamed
    /// into place.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] if the directory cannot be created, the
    /// temporary file cannot be written, or the rename fails.
    #[instrument(level = "debug", skip(self, set), fields(path = %self.path.display(), entries = set.len()))]
    pub async fn persist(&self, set: &HashSet<String>) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| HistoryError::io(parent, e))?;
            }
        }

        let urls: Vec<&String> = set.iter().collect();
        let encoded = serde_json::to_vec(&urls)?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &encoded)
            .await
            .map_err(|e| HistoryError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| HistoryError::io(&self.path, e))?;

        Ok(())
    }

    /// Adds a URL to the persisted set (locked load-modify-persist).
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] if persisting the updated set fails.
    pub async fn record(&self, url: &str) -> Result<(), HistoryError> {
        let _writer = self.writer.lock().await;
        let mut set = self.load().await;
        set.insert(url.to_string());
        self.persist(&set).await
    }

    /// Removes a URL from the persisted set (locked load-modify-persist),
    /// so a failed attempt does not block a future retry on a later run.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] if persisting the updated set fails.
    pub async fn retract(&self, url: &str) -> Result<(), HistoryError> {
        let _writer = self.writer.lock().await;
        let mut set = self.load().await;
        set.remove(url);
        self.persist(&set).await
    }

    /// Membership test against the current persisted set.
    pub async fn contains(&self, url: &str) -> bool {
        self.load().await.contains(url)
    }

    /// Number of URLs in the current persisted set.
    pub async fn len(&self) -> usize {
        self.load().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("download_history.json"))
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed_file_returns_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), b"{not json at all").unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut set = HashSet::new();
        set.insert("https://example.com/a.pdf".to_string());
        set.insert("https://example.com/b.jpg".to_string());
        store.persist(&set).await.unwrap();

        assert_eq!(store.load().await, set);
    }

    #[tokio::test]
    async fn test_persist_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("conf/nested/history.json"));
        store.persist(&HashSet::new()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_record_adds_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.record("https://example.com/a.pdf").await.unwrap();

        assert!(store.contains("https://example.com/a.pdf").await);
        assert_eq!(store.len().await, 1);
        // The file itself holds the record, not just memory.
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("https://example.com/a.pdf"));
    }

    #[tokio::test]
    async fn test_record_same_url_twice_keeps_one_entry() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.record("https://example.com/a.pdf").await.unwrap();
        store.record("https://example.com/a.pdf").await.unwrap();

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_retract_removes_from_persisted_set() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.record("https://example.com/a.pdf").await.unwrap();
        store.retract("https://example.com/a.pdf").await.unwrap();

        assert!(!store.contains("https://example.com/a.pdf").await);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_urls_differing_in_decoration_are_distinct() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.record("https://example.com/a.pdf").await.unwrap();
        assert!(!store.contains("https://example.com/a.pdf/").await);
        assert!(!store.contains("https://example.com/a.pdf?v=1").await);
    }

    #[tokio::test]
    async fn test_record_preserves_existing_entries() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.record("https://example.com/a.pdf").await.unwrap();
        store.record("https://example.com/b.jpg").await.unwrap();

        assert!(store.contains("https://example.com/a.pdf").await);
        assert!(store.contains("https://example.com/b.jpg").await);
        assert_eq!(store.len().await, 2);
    }
}
