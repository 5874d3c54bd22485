// Phase Handlers
//
// One module per queue kind. Each handler: load its row, run its agent,
// persist outputs with a terminal status, re-enqueue the supervisor.
// Handlers translate errors into state instead of propagating them; the
// supervisor coordinates retries through the state machine.

pub mod aggregate;
pub mod contradict;
pub mod enrich;
pub mod final_critique;
pub mod hypothesize;
pub mod plan;
pub mod research;
pub mod review;
pub mod score;

use serde::{Deserialize, Serialize};

/// Payload shared by the per-task handlers.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskPayload {
    pub task_id: String,
}
