// Domain Layer - Entities and state machines

pub mod agent_log;
pub mod chunk;
pub mod error;
pub mod job;
pub mod outputs;
pub mod task;

pub use agent_log::{AgentLog, LogRole};
pub use chunk::{cosine_distance, Chunk, EMBEDDING_DIM};
pub use error::DomainError;
pub use job::{JobId, JobStatus, ResearchJob};
pub use outputs::{
    ContradictionDetail, ContradictionReport, CriticVerdict, EvidenceRating, FinalCritique,
    Hypothesis, HypothesisSet, ReportDraft,
};
pub use task::{ResearchTask, TaskId, TaskStatus};
