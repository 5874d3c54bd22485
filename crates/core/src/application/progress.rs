// Progress Projector
//
// Derives (progress_percent, phase) from persisted status counts. Pure
// function; the API layer calls it on every status read.

use crate::domain::{JobStatus, TaskStatus};
use serde::{Deserialize, Serialize};

/// Client-visible pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Queued,
    Enriching,
    Planning,
    Researching,
    Reporting,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Queued => write!(f, "queued"),
            Phase::Enriching => write!(f, "enriching"),
            Phase::Planning => write!(f, "planning"),
            Phase::Researching => write!(f, "researching"),
            Phase::Reporting => write!(f, "reporting"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub phase: Phase,
}

/// Project job status + task statuses into a progress snapshot.
///
/// `percent` is 100 iff the job completed and 0 iff it is pending or
/// failed; everything in between clamps to 99.
pub fn project(status: JobStatus, tasks: &[TaskStatus]) -> Progress {
    match status {
        JobStatus::Completed => Progress {
            percent: 100,
            phase: Phase::Reporting,
        },
        JobStatus::Failed => Progress {
            percent: 0,
            phase: Phase::Failed,
        },
        JobStatus::Pending => Progress {
            percent: 0,
            phase: Phase::Enriching,
        },
        JobStatus::Processing | JobStatus::Generating => {
            if tasks.is_empty() {
                return Progress {
                    percent: 10,
                    phase: Phase::Planning,
                };
            }
            let total = tasks.len();
            let settled = tasks.iter().filter(|s| s.is_settled()).count();
            if settled == total {
                // All tasks settled: aggregation/critique territory.
                return Progress {
                    percent: 90,
                    phase: Phase::Reporting,
                };
            }
            let percent = 20 + ((settled * 70) / total) as u8;
            Progress {
                percent: percent.min(99),
                phase: Phase::Researching,
            }
        }
    }
}
