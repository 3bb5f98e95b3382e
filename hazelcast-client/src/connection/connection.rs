//! Single connection to a Hazelcast cluster member.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use hazelcast_core::protocol::codecs;
use hazelcast_core::protocol::{ClientMessageCodec, CLIENT_BINARY_PROTOCOL};
use hazelcast_core::{ClientMessage, HazelcastError, Result};
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::connector::BoxedStream;
use super::correlation::{CallOutcome, CorrelationRegistry};
use crate::listener::{EventDispatcher, HandlerSet, Member};

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generates a new unique connection ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Notification sent to the owner when a connection closes.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionClosed {
    pub id: ConnectionId,
    pub reason: String,
}

/// What a connection needs from its owner.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionOptions {
    pub max_frame_size: usize,
    pub dispatcher: EventDispatcher,
    pub closed_tx: mpsc::UnboundedSender<ConnectionClosed>,
}

type MessageWriter = FramedWrite<WriteHalf<BoxedStream>, ClientMessageCodec>;
type MessageReader = FramedRead<ReadHalf<BoxedStream>, ClientMessageCodec>;

/// A connection to a single Hazelcast cluster member.
///
/// One reader task owns the inbound half: it reassembles messages, completes
/// pending calls by correlation id and hands event messages to the
/// dispatcher. Writes are serialized through a lock so frames of different
/// messages never interleave.
pub struct Connection {
    id: ConnectionId,
    address: SocketAddr,
    member: OnceLock<Member>,
    writer: tokio::sync::Mutex<MessageWriter>,
    registry: CorrelationRegistry,
    event_handlers: Mutex<HashMap<i64, HandlerSet>>,
    dispatcher: EventDispatcher,
    closed_tx: mpsc::UnboundedSender<ConnectionClosed>,
    closed: AtomicBool,
    close_token: CancellationToken,
    close_reason: Mutex<Option<String>>,
    created_at: Instant,
    last_read_ms: AtomicU64,
    last_write_ms: AtomicU64,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("member", &self.member_uuid())
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl Connection {
    /// Writes the protocol preamble on `stream` and starts the reader task.
    pub(crate) async fn establish(
        mut stream: BoxedStream,
        address: SocketAddr,
        options: ConnectionOptions,
    ) -> Result<Arc<Self>> {
        stream.write_all(CLIENT_BINARY_PROTOCOL).await.map_err(|e| {
            HazelcastError::Connection(format!("failed to write preamble to {}: {}", address, e))
        })?;

        let (read_half, write_half) = tokio::io::split(stream);
        let reader = FramedRead::new(
            read_half,
            ClientMessageCodec::with_max_frame_size(options.max_frame_size),
        );
        let writer = FramedWrite::new(
            write_half,
            ClientMessageCodec::with_max_frame_size(options.max_frame_size),
        );

        let connection = Arc::new(Self {
            id: ConnectionId::new(),
            address,
            member: OnceLock::new(),
            writer: tokio::sync::Mutex::new(writer),
            registry: CorrelationRegistry::new(),
            event_handlers: Mutex::new(HashMap::new()),
            dispatcher: options.dispatcher,
            closed_tx: options.closed_tx,
            closed: AtomicBool::new(false),
            close_token: CancellationToken::new(),
            close_reason: Mutex::new(None),
            created_at: Instant::now(),
            last_read_ms: AtomicU64::new(0),
            last_write_ms: AtomicU64::new(0),
        });

        tokio::spawn(Self::read_loop(Arc::clone(&connection), reader));
        tracing::debug!(id = %connection.id, address = %address, "established connection");
        Ok(connection)
    }

    /// Returns the connection's unique identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the remote address of this connection.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Returns the member on the other end, once authenticated.
    pub fn member(&self) -> Option<&Member> {
        self.member.get()
    }

    /// Returns the UUID of the member on the other end, once authenticated.
    pub fn member_uuid(&self) -> Option<Uuid> {
        self.member.get().map(Member::uuid)
    }

    pub(crate) fn set_member(&self, member: Member) {
        let _ = self.member.set(member);
    }

    /// Returns when this connection was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns how long ago data was last read from this connection.
    pub fn last_read_elapsed(&self) -> Duration {
        self.elapsed_since(&self.last_read_ms)
    }

    /// Returns how long ago data was last written to this connection.
    pub fn last_write_elapsed(&self) -> Duration {
        self.elapsed_since(&self.last_write_ms)
    }

    /// Returns `false` once the connection has been closed.
    pub fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Returns why the connection was closed.
    pub fn close_reason(&self) -> Option<String> {
        lock(&self.close_reason).clone()
    }

    /// Returns the number of calls awaiting a response.
    pub fn pending_calls(&self) -> usize {
        self.registry.len()
    }

    /// Returns the number of event registrations routed to this connection.
    pub fn event_handler_count(&self) -> usize {
        lock(&self.event_handlers).len()
    }

    pub(crate) fn register_call(&self, correlation_id: i64) -> Result<oneshot::Receiver<CallOutcome>> {
        self.registry.register(correlation_id)
    }

    pub(crate) fn forget_call(&self, correlation_id: i64) -> bool {
        self.registry.remove(correlation_id)
    }

    pub(crate) fn add_event_handler(&self, correlation_id: i64, handlers: HandlerSet) {
        lock(&self.event_handlers).insert(correlation_id, handlers);
    }

    pub(crate) fn remove_event_handler(&self, correlation_id: i64) -> bool {
        lock(&self.event_handlers).remove(&correlation_id).is_some()
    }

    /// Writes one message. A failed write closes the connection; closing the
    /// connection abandons a write stuck on a peer that stopped reading.
    pub async fn send(&self, message: ClientMessage) -> Result<()> {
        if !self.is_alive() {
            return Err(HazelcastError::Connection(format!("{} is closed", self.id)));
        }

        let write = async {
            let mut writer = self.writer.lock().await;
            writer.send(message).await
        };
        let result = tokio::select! {
            result = write => result,
            _ = self.close_token.cancelled() => {
                return Err(HazelcastError::TargetDisconnected(format!(
                    "{} to {} closed while writing",
                    self.id, self.address
                )));
            }
        };

        match result {
            Ok(()) => {
                self.touch(&self.last_write_ms);
                Ok(())
            }
            Err(HazelcastError::Protocol(message)) => Err(HazelcastError::Protocol(message)),
            Err(e) => {
                let reason = format!("write to {} failed: {}", self.address, e);
                self.close(reason.clone()).await;
                Err(HazelcastError::Connection(reason))
            }
        }
    }

    /// Sends `message` under `correlation_id` and waits up to `timeout` for
    /// the response. Error responses become [`HazelcastError::Server`].
    pub async fn call(
        &self,
        mut message: ClientMessage,
        correlation_id: i64,
        timeout: Duration,
    ) -> Result<ClientMessage> {
        message.set_correlation_id(correlation_id);
        let receiver = self.registry.register(correlation_id)?;
        if let Err(e) = self.send(message).await {
            self.registry.remove(correlation_id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(outcome)) => into_response(outcome?),
            Ok(Err(_)) => Err(HazelcastError::TargetDisconnected(format!(
                "{} closed before responding",
                self.id
            ))),
            Err(_) => {
                self.registry.remove(correlation_id);
                Err(HazelcastError::Timeout(format!(
                    "no response from {} within {:?}",
                    self.address, timeout
                )))
            }
        }
    }

    /// Closes the connection. Every pending call fails with
    /// [`HazelcastError::TargetDisconnected`] and every event registration
    /// on it is dropped. Closing twice is a no-op.
    pub async fn close(&self, reason: impl Into<String>) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let reason = reason.into();
        *lock(&self.close_reason) = Some(reason.clone());
        self.close_token.cancel();

        let pending = self.registry.drain();
        let pending_count = pending.len();
        for call in pending {
            call.complete(Err(HazelcastError::TargetDisconnected(format!(
                "{} to {} closed: {}",
                self.id, self.address, reason
            ))));
        }
        lock(&self.event_handlers).clear();

        let _ = self.closed_tx.send(ConnectionClosed {
            id: self.id,
            reason: reason.clone(),
        });

        // Unflushed bytes are discarded: flushing could block on a peer that
        // stopped reading.
        if let Ok(mut writer) = self.writer.try_lock() {
            let _ = writer.get_mut().shutdown().await;
        }

        tracing::debug!(
            id = %self.id,
            address = %self.address,
            reason = %reason,
            pending = pending_count,
            "connection closed"
        );
    }

    async fn read_loop(connection: Arc<Self>, mut reader: MessageReader) {
        let reason = loop {
            tokio::select! {
                _ = connection.close_token.cancelled() => return,
                next = reader.next() => match next {
                    Some(Ok(message)) => {
                        connection.touch(&connection.last_read_ms);
                        connection.handle_message(message);
                    }
                    Some(Err(e)) => break format!("read failed: {}", e),
                    None => break "connection closed by peer".to_string(),
                },
            }
        };
        connection.close(reason).await;
    }

    fn handle_message(&self, message: ClientMessage) {
        let Some(correlation_id) = message.correlation_id() else {
            tracing::warn!(id = %self.id, "dropping message without header");
            return;
        };

        if message.is_event() {
            let handlers = lock(&self.event_handlers).get(&correlation_id).cloned();
            match handlers {
                Some(handlers) => {
                    self.dispatcher.dispatch(handlers, message);
                }
                None => tracing::debug!(
                    id = %self.id,
                    correlation_id,
                    "dropping event for unknown registration"
                ),
            }
            return;
        }

        match self.registry.resolve(correlation_id) {
            Some(call) => {
                call.complete(Ok(message));
            }
            None => tracing::debug!(
                id = %self.id,
                correlation_id,
                "dropping response for unknown correlation id"
            ),
        }
    }

    fn touch(&self, slot: &AtomicU64) {
        let millis = u64::try_from(self.created_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        slot.store(millis, Ordering::Relaxed);
    }

    fn elapsed_since(&self, slot: &AtomicU64) -> Duration {
        let at = Duration::from_millis(slot.load(Ordering::Relaxed));
        self.created_at.elapsed().saturating_sub(at)
    }
}

/// Turns an error response into [`HazelcastError::Server`].
pub(crate) fn into_response(message: ClientMessage) -> Result<ClientMessage> {
    if message.is_error() {
        return Err(codecs::error::decode(&message)?.into());
    }
    Ok(message)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
