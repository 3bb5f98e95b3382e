//! Invocation service: sends requests and drives them to a terminal state.

use std::sync::Arc;
use std::time::Duration;

use hazelcast_core::{ClientMessage, HazelcastError, Result};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{InvocationState, InvocationTarget};
use crate::backoff::Backoff;
use crate::cluster::LifecycleService;
use crate::config::{InvocationConfig, ReconnectMode};
use crate::connection::{into_response, Connection, ConnectionManager};
use crate::listener::{ClientState, HandlerSet};

/// Multiplier applied to the pause between invocation retries.
const RETRY_PAUSE_MULTIPLIER: f64 = 2.0;

/// Bookkeeping for one invocation while it is in flight.
#[derive(Debug)]
struct Invocation {
    target: InvocationTarget,
    state: InvocationState,
    attempts: u32,
    started: Instant,
}

impl Invocation {
    fn new(target: InvocationTarget) -> Self {
        Self {
            target,
            state: InvocationState::Created,
            attempts: 0,
            started: Instant::now(),
        }
    }

    fn transition(&mut self, to: InvocationState) {
        tracing::trace!(
            route = %self.target,
            from = %self.state,
            to = %to,
            attempt = self.attempts,
            "invocation state changed"
        );
        self.state = to;
    }

    fn finish<T>(&mut self, state: InvocationState, result: Result<T>) -> Result<T> {
        self.transition(state);
        if let Err(e) = &result {
            tracing::debug!(
                route = %self.target,
                attempts = self.attempts,
                elapsed = ?self.started.elapsed(),
                error = %e,
                "invocation {}",
                state
            );
        }
        result
    }
}

/// Removes the correlation entry, and the event handler if one was added,
/// when an attempt ends without a successful response.
struct AttemptGuard<'a> {
    connection: &'a Connection,
    correlation_id: i64,
    has_handler: bool,
    completed: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.connection.forget_call(self.correlation_id);
        if self.has_handler && !self.completed {
            self.connection.remove_event_handler(self.correlation_id);
        }
    }
}

/// Sends requests to the cluster and retries them until they complete,
/// fail with a non-retryable error or run out of time.
///
/// Every attempt takes a fresh correlation id on whatever connection the
/// target resolves to at that moment. Attempts end when the response
/// arrives, the connection closes, the invocation deadline passes or the
/// caller cancels; in every case the correlation entry is removed.
#[derive(Debug)]
pub struct InvocationService {
    connections: Arc<ConnectionManager>,
    lifecycle: Arc<LifecycleService>,
    config: InvocationConfig,
    redo_operation: bool,
    reconnect_mode: ReconnectMode,
}

impl InvocationService {
    /// Creates an invocation service sending over `connections`.
    pub fn new(connections: Arc<ConnectionManager>, lifecycle: Arc<LifecycleService>) -> Self {
        let config = connections.config().invocation().clone();
        let redo_operation = connections.config().network().redo_operation();
        let reconnect_mode = connections.config().network().reconnect_mode();
        Self {
            connections,
            lifecycle,
            config,
            redo_operation,
            reconnect_mode,
        }
    }

    /// Sends `message` to `target` and waits for the response.
    #[instrument(
        name = "invocation.invoke",
        skip(self, message),
        fields(message_type = ?message.message_type(), route = %target)
    )]
    pub async fn invoke(&self, message: ClientMessage, target: InvocationTarget) -> Result<ClientMessage> {
        self.run(message, target, None).await
    }

    /// Like [`invoke`](Self::invoke), but gives up with
    /// [`HazelcastError::Cancelled`] as soon as `cancel` fires. A response
    /// arriving after cancellation is discarded.
    #[instrument(
        name = "invocation.invoke",
        skip(self, message, cancel),
        fields(message_type = ?message.message_type(), route = %target)
    )]
    pub async fn invoke_with_cancellation(
        &self,
        message: ClientMessage,
        target: InvocationTarget,
        cancel: CancellationToken,
    ) -> Result<ClientMessage> {
        self.run(message, target, Some(&cancel)).await
    }

    /// Sends `message` on `connection` exactly once.
    ///
    /// With `handlers`, event messages carrying this request's correlation
    /// id are routed to them for as long as the connection lives. Returns
    /// the response with the correlation id it was sent under.
    pub async fn invoke_on_connection(
        &self,
        message: ClientMessage,
        connection: &Arc<Connection>,
        handlers: Option<HandlerSet>,
    ) -> Result<(ClientMessage, i64)> {
        if self.connections.is_shutting_down() {
            return Err(not_active());
        }
        let deadline = Instant::now() + self.config.invocation_timeout();
        let mut invocation = Invocation::new(InvocationTarget::Connection(connection.id()));
        invocation.attempts = 1;

        match self
            .attempt(&mut invocation, connection, message, handlers, deadline, None)
            .await
        {
            Ok(response) => invocation.finish(InvocationState::Completed, Ok(response)),
            Err(e) if self.connections.is_shutting_down() => {
                tracing::trace!(error = %e, "invocation interrupted by shutdown");
                invocation.finish(InvocationState::Failed, Err(not_active()))
            }
            Err(e) if e.is_timeout() => invocation.finish(InvocationState::TimedOut, Err(e)),
            Err(e) => invocation.finish(InvocationState::Failed, Err(e)),
        }
    }

    async fn run(
        &self,
        mut message: ClientMessage,
        target: InvocationTarget,
        cancel: Option<&CancellationToken>,
    ) -> Result<ClientMessage> {
        if let InvocationTarget::Partition(partition_id) = target {
            message.set_partition_id(partition_id);
        }
        let timeout = self.config.invocation_timeout();
        let deadline = Instant::now() + timeout;
        let retryable = message.is_retryable() || self.redo_operation;
        let mut pause = Backoff::new(
            self.config.retry_pause(),
            self.config.max_retry_pause(),
            RETRY_PAUSE_MULTIPLIER,
            0.0,
        );
        let mut invocation = Invocation::new(target);

        loop {
            if self.connections.is_shutting_down() {
                return invocation.finish(InvocationState::Failed, Err(not_active()));
            }
            if Instant::now() >= deadline {
                return invocation.finish(InvocationState::TimedOut, Err(timed_out(&target, timeout)));
            }

            invocation.attempts += 1;
            let result = match self.connections.select_connection(&target) {
                Some(connection) => self
                    .attempt(&mut invocation, &connection, message.clone(), None, deadline, cancel)
                    .await
                    .map(|(response, _)| response),
                None if self.fails_fast_while_disconnected() => {
                    return invocation.finish(
                        InvocationState::Failed,
                        Err(HazelcastError::ClientNotActive(
                            "client is disconnected from the cluster".to_string(),
                        )),
                    );
                }
                None => Err(HazelcastError::Connection(format!(
                    "no connection available for {}",
                    target
                ))),
            };

            let error = match result {
                Ok(response) => return invocation.finish(InvocationState::Completed, Ok(response)),
                Err(e) => e,
            };

            if self.connections.is_shutting_down() {
                tracing::trace!(error = %error, "invocation interrupted by shutdown");
                return invocation.finish(InvocationState::Failed, Err(not_active()));
            }
            if error.is_timeout() {
                return invocation.finish(InvocationState::TimedOut, Err(error));
            }
            if !should_retry(&target, &error, retryable) {
                return invocation.finish(InvocationState::Failed, Err(error));
            }
            if invocation.attempts >= self.config.max_attempts() {
                return invocation.finish(InvocationState::Failed, Err(error));
            }

            let now = Instant::now();
            if now >= deadline {
                return invocation.finish(InvocationState::TimedOut, Err(timed_out(&target, timeout)));
            }

            invocation.transition(InvocationState::Retrying);
            let delay = pause.next_delay().min(deadline - now);
            tracing::debug!(
                route = %target,
                attempt = invocation.attempts,
                delay = ?delay,
                error = %error,
                "retrying invocation"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.connections.connection_established() => {}
                _ = cancelled(cancel) => {
                    return invocation.finish(InvocationState::Failed, Err(cancelled_error()));
                }
            }
        }
    }

    async fn attempt(
        &self,
        invocation: &mut Invocation,
        connection: &Arc<Connection>,
        mut message: ClientMessage,
        handlers: Option<HandlerSet>,
        deadline: Instant,
        cancel: Option<&CancellationToken>,
    ) -> Result<(ClientMessage, i64)> {
        let correlation_id = self.connections.correlation_ids().next_id();
        message.set_correlation_id(correlation_id);

        let receiver = connection.register_call(correlation_id)?;
        let mut guard = AttemptGuard {
            connection: connection.as_ref(),
            correlation_id,
            has_handler: handlers.is_some(),
            completed: false,
        };
        if let Some(handlers) = handlers {
            connection.add_event_handler(correlation_id, handlers);
        }

        let sent = tokio::select! {
            sent = tokio::time::timeout_at(deadline, connection.send(message)) => sent,
            _ = cancelled(cancel) => return Err(cancelled_error()),
        };
        match sent {
            Ok(result) => result?,
            Err(_) => return Err(timed_out(&invocation.target, invocation.started.elapsed())),
        }
        invocation.transition(InvocationState::Sent);

        let outcome = tokio::select! {
            outcome = tokio::time::timeout_at(deadline, receiver) => outcome,
            _ = cancelled(cancel) => return Err(cancelled_error()),
        };
        let response = match outcome {
            Ok(Ok(outcome)) => into_response(outcome?)?,
            Ok(Err(_)) => {
                return Err(HazelcastError::TargetDisconnected(format!(
                    "{} closed before responding",
                    connection.id()
                )))
            }
            Err(_) => return Err(timed_out(&invocation.target, invocation.started.elapsed())),
        };

        guard.completed = true;
        Ok((response, correlation_id))
    }

    fn fails_fast_while_disconnected(&self) -> bool {
        self.reconnect_mode == ReconnectMode::Async
            && matches!(
                self.lifecycle.state(),
                ClientState::Disconnected | ClientState::Reconnecting
            )
    }
}

/// Connection-pinned invocations are never re-routed. Everything else is
/// retried on errors that are safe to retry, and on a lost connection only
/// if the operation may run twice.
fn should_retry(target: &InvocationTarget, error: &HazelcastError, retryable: bool) -> bool {
    match error {
        HazelcastError::ClientNotActive(_)
        | HazelcastError::Timeout(_)
        | HazelcastError::Cancelled(_) => false,
        _ if matches!(target, InvocationTarget::Connection(_)) => false,
        other => other.is_retryable_for(retryable),
    }
}

async fn cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

fn not_active() -> HazelcastError {
    HazelcastError::ClientNotActive("client is shutting down".to_string())
}

fn cancelled_error() -> HazelcastError {
    HazelcastError::Cancelled("invocation cancelled".to_string())
}

fn timed_out(target: &InvocationTarget, after: Duration) -> HazelcastError {
    HazelcastError::Timeout(format!("invocation on {} timed out after {:?}", target, after))
}
