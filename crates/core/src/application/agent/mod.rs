// Agent subsystem - value-typed agent specs, a turn-loop runner, and the
// two tools agents may call.

pub mod personas;
pub mod runner;
pub mod tools;

pub use personas::AgentSpec;
pub use runner::{run_agent, RunContext, MAX_AGENT_TURNS, MAX_TURNS_SENTINEL};
