// Worker - queue consumption loop and handler dispatch
//
// A Worker claims one message at a time and routes it to its phase
// handler; WorkerPool spawns N of them over the shared queue and owns the
// cooperative stop channel.

pub mod constants;

use crate::application::pipeline::{kind, PipelineDeps};
use crate::application::{handlers, supervisor};
use crate::error::Result;
use crate::port::QueueMessage;
use constants::*;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// A worker draws messages from the shared durable queue and dispatches
/// them to phase handlers. Workers are identical; parallelism comes from
/// the pool.
pub struct Worker {
    deps: PipelineDeps,
}

impl Worker {
    pub fn new(deps: PipelineDeps) -> Self {
        Self { deps }
    }

    /// Consume messages until the pool signals stop.
    ///
    /// After a processed message the loop immediately tries again; an
    /// empty queue or a queue failure pauses before the next poll, and the
    /// pause doubles as the stop-signal wait point.
    pub async fn run(&self, index: usize, mut stop: watch::Receiver<bool>) {
        info!(worker = index, "Worker online");

        while !*stop.borrow() {
            let pause = match self.process_next_message().await {
                // More work may already be queued behind this message.
                Ok(true) => None,
                Ok(false) => Some(POLL_INTERVAL),
                Err(e) => {
                    error!(worker = index, error = %e, "Queue access failed");
                    Some(BACKOFF_AFTER_ERROR)
                }
            };

            if let Some(pause) = pause {
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = sleep(pause) => {}
                }
            }
        }

        info!(worker = index, "Worker offline");
    }

    /// Claim and process one message. Returns true if a message was
    /// processed.
    ///
    /// Handlers run inside a spawned task so a panic cannot kill the
    /// worker loop. The message is acked either way: handlers encode their
    /// own recovery as state transitions, and a worker crash before the
    /// ack is what the stale-message requeue covers.
    pub async fn process_next_message(&self) -> Result<bool> {
        let message = match self.deps.queue.dequeue().await? {
            Some(message) => message,
            None => return Ok(false),
        };

        let message_id = message.id;
        let message_kind = message.kind.clone();
        debug!(kind = %message_kind, message_id = message_id, "Processing message");

        let deps = self.deps.clone();
        let handle = tokio::task::spawn(async move { dispatch(&deps, message).await });

        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(kind = %message_kind, message_id = message_id, error = %e, "Handler failed");
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    error!(kind = %message_kind, message_id = message_id, "Handler panicked: {:?}", join_err);
                } else {
                    error!(kind = %message_kind, message_id = message_id, "Handler cancelled: {:?}", join_err);
                }
            }
        }

        self.deps.queue.ack(message_id).await?;
        Ok(true)
    }
}

/// A running set of workers plus the handle to stop them.
pub struct WorkerPool {
    stop_tx: watch::Sender<bool>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers over the shared queue.
    pub fn spawn(deps: PipelineDeps, count: usize) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handles = (0..count)
            .map(|index| {
                let worker = Worker::new(deps.clone());
                let stop = stop_rx.clone();
                tokio::spawn(async move { worker.run(index, stop).await })
            })
            .collect();
        Self { stop_tx, handles }
    }

    /// Signal stop, then wait up to `grace` for each worker to finish its
    /// current message.
    pub async fn shutdown(self, grace: Duration) {
        let _ = self.stop_tx.send(true);
        for handle in self.handles {
            let _ = tokio::time::timeout(grace, handle).await;
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupervisorPayload {
    job_id: String,
}

/// Route a message to its handler by kind.
pub async fn dispatch(deps: &PipelineDeps, message: QueueMessage) -> Result<()> {
    match message.kind.as_str() {
        kind::ENRICH_IDEA => {
            handlers::enrich::run(deps, serde_json::from_value(message.payload)?).await
        }
        kind::PLAN_RESEARCH => {
            handlers::plan::run(deps, serde_json::from_value(message.payload)?).await
        }
        kind::GENERATE_HYPOTHESES => {
            handlers::hypothesize::run(deps, serde_json::from_value(message.payload)?).await
        }
        kind::PERFORM_RESEARCH => {
            handlers::research::run(deps, serde_json::from_value(message.payload)?).await
        }
        kind::SCORE_EVIDENCE => {
            handlers::score::run(deps, serde_json::from_value(message.payload)?).await
        }
        kind::FIND_CONTRADICTIONS => {
            handlers::contradict::run(deps, serde_json::from_value(message.payload)?).await
        }
        kind::REVIEW_TASK => {
            handlers::review::run(deps, serde_json::from_value(message.payload)?).await
        }
        kind::AGGREGATE_REPORT => {
            handlers::aggregate::run(deps, serde_json::from_value(message.payload)?).await
        }
        kind::FINAL_CRITIQUE => {
            handlers::final_critique::run(deps, serde_json::from_value(message.payload)?).await
        }
        kind::RUN_SUPERVISOR => {
            let payload: SupervisorPayload = serde_json::from_value(message.payload)?;
            supervisor::run_supervisor(deps, &payload.job_id).await
        }
        other => {
            warn!(kind = %other, "Unknown message kind, dropping");
            Ok(())
        }
    }
}
