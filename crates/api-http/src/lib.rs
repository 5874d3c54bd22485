//! HTTP API Layer
//!
//! REST surface of the Scribe Research Engine: job creation, status,
//! retrieval, liveness/readiness. Handlers perform only short storage
//! writes and queue enqueues; all heavy work happens in the workers.

pub mod auth;
pub mod error;
pub mod handler;
mod rate_limiter;
pub mod server;
pub mod types;

pub use server::{build_router, ApiServer, ApiServerConfig, ApiState};
