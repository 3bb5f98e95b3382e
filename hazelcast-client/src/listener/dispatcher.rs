//! Event dispatch off the connection reader.
//!
//! Readers only enqueue; a single worker task runs handlers in arrival order,
//! so slow handlers never stall socket reads. When the queue is full the
//! event is dropped and counted.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use hazelcast_core::ClientMessage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::handler::HandlerSet;
use super::ListenerStats;

struct EventJob {
    handlers: HandlerSet,
    message: ClientMessage,
}

/// Handle for enqueueing events onto the dispatch worker.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: mpsc::Sender<EventJob>,
    stats: Arc<ListenerStats>,
}

impl EventDispatcher {
    /// Spawns the worker with a queue of `capacity` events. The worker stops
    /// when `shutdown` is cancelled.
    pub fn start(capacity: usize, shutdown: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(ListenerStats::new());
        tokio::spawn(run_worker(receiver, Arc::clone(&stats), shutdown));
        Self { sender, stats }
    }

    /// Enqueues `message` for `handlers` without waiting. Returns `false` if
    /// the event was dropped.
    pub fn dispatch(&self, handlers: HandlerSet, message: ClientMessage) -> bool {
        match self.sender.try_send(EventJob { handlers, message }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.stats.record_dropped();
                tracing::warn!(
                    correlation_id = ?job.message.correlation_id(),
                    "event queue full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.stats.record_dropped();
                tracing::debug!("event worker stopped, dropping event");
                false
            }
        }
    }

    /// Returns dispatch counters.
    pub fn stats(&self) -> &ListenerStats {
        &self.stats
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<EventJob>,
    stats: Arc<ListenerStats>,
    shutdown: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            _ = shutdown.cancelled() => break,
            job = receiver.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        for handler in job.handlers.iter() {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(&job.message))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    stats.record_error();
                    tracing::warn!(error = %e, handler = ?handler, "event handler failed");
                }
                Err(_) => {
                    stats.record_error();
                    tracing::error!(handler = ?handler, "event handler panicked");
                }
            }
        }
        stats.record_message();
    }
    tracing::debug!("event worker stopped");
}
