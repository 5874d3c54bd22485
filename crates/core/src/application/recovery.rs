// Crash recovery
//
// On daemon startup, in-flight queue messages older than the recovery
// window belong to workers that died before acking. Returning them to
// delivery is what makes the at-least-once contract hold across crashes;
// the state machine's sentinel CAS makes the redelivery harmless.

use crate::application::worker::constants::DEFAULT_RECOVERY_WINDOW_MS;
use crate::port::{TimeProvider, WorkQueue};
use std::sync::Arc;
use tracing::info;

pub struct RecoveryService {
    queue: Arc<dyn WorkQueue>,
    time_provider: Arc<dyn TimeProvider>,
    recovery_window_ms: i64,
}

impl RecoveryService {
    /// `recovery_window_ms` defaults to 5 minutes when None.
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        time_provider: Arc<dyn TimeProvider>,
        recovery_window_ms: Option<i64>,
    ) -> Self {
        Self {
            queue,
            time_provider,
            recovery_window_ms: recovery_window_ms.unwrap_or(DEFAULT_RECOVERY_WINDOW_MS),
        }
    }

    /// Requeue messages claimed before `now - recovery_window`.
    /// Returns the number of messages returned to delivery.
    pub async fn recover_orphaned_messages(&self) -> crate::error::Result<u64> {
        let now = self.time_provider.now_millis();
        let cutoff = now - self.recovery_window_ms;

        info!(
            cutoff_time = %cutoff,
            recovery_window_ms = %self.recovery_window_ms,
            "Starting orphaned message recovery"
        );

        let recovered = self.queue.requeue_stale(cutoff).await?;

        info!(recovered_count = %recovered, "Orphaned message recovery complete");
        Ok(recovered)
    }
}
