// Worker constants (no magic values inline)
use std::time::Duration;

/// Polling interval while the queue is empty
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pause after a queue access failure before the next attempt
pub const BACKOFF_AFTER_ERROR: Duration = Duration::from_secs(1);

/// Default worker pool parallelism
pub const DEFAULT_WORKER_CONCURRENCY: usize = 4;

/// Default recovery window for in-flight messages orphaned by a crash
/// (5 minutes)
pub const DEFAULT_RECOVERY_WINDOW_MS: i64 = 5 * 60 * 1000;
