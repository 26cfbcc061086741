//! Fixed-ceiling pacing of page-processing starts.
//!
//! The crawl respects target-site load with a hard ceiling on how many page
//! handlers may start per minute. Pacing is global, not per-domain: the
//! ceiling governs overall throughput of the single crawl.

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep};
use tracing::debug;

/// Paces starts so that at most a fixed number happen per minute.
///
/// Designed to be shared across spawned tasks; [`Pacer::acquire`] holds an
/// internal lock across its sleep so concurrent callers are spaced out one
/// after another rather than released in a burst.
#[derive(Debug)]
pub struct Pacer {
    /// Minimum interval between two starts.
    min_interval: Duration,
    /// Whether pacing is disabled (ceiling of 0).
    disabled: bool,
    /// Time of the last permitted start.
    last_start: Mutex<Option<Instant>>,
}

impl Pacer {
    /// Creates a pacer allowing at most `starts` per minute.
    ///
    /// A ceiling of 0 disables pacing entirely.
    #[must_use]
    pub fn per_minute(starts: u32) -> Self {
        if starts == 0 {
            return Self::disabled();
        }
        Self {
            min_interval: Duration::from_secs_f64(60.0 / f64::from(starts)),
            disabled: false,
            last_start: Mutex::new(None),
        }
    }

    /// Creates a pacer that never delays.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            min_interval: Duration::ZERO,
            disabled: true,
            last_start: Mutex::new(None),
        }
    }

    /// Returns the minimum interval between starts.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// True when pacing is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Waits until the next start is allowed, then claims it.
    pub async fn acquire(&self) {
        if self.disabled {
            return;
        }

        let mut last_start = self.last_start.lock().await;
        if let Some(last) = *last_start {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis(), "pacing page start");
                sleep(wait).await;
            }
        }
        *last_start = Some(Instant::now());
    }
}
