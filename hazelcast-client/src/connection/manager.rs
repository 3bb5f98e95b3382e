//! Connection registry, cluster connection and reconnection handling.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use hazelcast_core::protocol::codecs::client_authentication::{
    self, AuthenticationRequest, AuthenticationResponse, AuthenticationStatus, CLIENT_TYPE,
};
use hazelcast_core::protocol::codecs::{client_ping, Address};
use hazelcast_core::protocol::SERIALIZATION_VERSION;
use hazelcast_core::{HazelcastError, Result};
use tokio::sync::futures::Notified;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use super::connection::{Connection, ConnectionClosed, ConnectionId, ConnectionOptions};
use super::connector::Connector;
use super::correlation::CorrelationIdGenerator;
use super::load_balancer::{default_load_balancer, LoadBalancer};
use crate::backoff::Backoff;
use crate::cluster::{ClusterService, LifecycleService, PartitionService};
use crate::config::{ClientConfig, ReconnectMode};
use crate::invocation::InvocationTarget;
use crate::listener::{ClientState, EventDispatcher, LifecycleEvent, Member};

/// Events emitted during connection lifecycle.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// An authenticated connection to a member was added.
    Connected {
        /// The connection identifier.
        id: ConnectionId,
        /// The address of the connected member.
        address: SocketAddr,
    },
    /// A connection to a member was closed.
    Disconnected {
        /// The connection identifier.
        id: ConnectionId,
        /// The address of the disconnected member.
        address: SocketAddr,
        /// Why the connection closed, if known.
        error: Option<String>,
    },
    /// A round of cluster connection attempts failed and another follows.
    ReconnectAttempt {
        /// The number of the round that failed.
        attempt: u32,
        /// The delay before the next round.
        next_delay: Duration,
    },
    /// The client gave up connecting to the cluster.
    ReconnectFailed {
        /// The error from the last attempt.
        error: String,
    },
}

/// Observer of connections being added to and removed from the registry.
///
/// Callbacks run on the task that added or removed the connection. A new
/// connection is already registered, and may serve invocations, while its
/// `connection_added` callbacks run; invocations waiting for a connection
/// are woken only after every callback returned.
#[async_trait]
pub trait ConnectionListener: Send + Sync {
    /// Called after an authenticated connection was registered.
    async fn connection_added(&self, connection: &Arc<Connection>);

    /// Called after a connection was closed and unregistered.
    async fn connection_removed(&self, connection: &Arc<Connection>);
}

enum Admission {
    Added { first: bool, changed_cluster: bool },
    Duplicate(Arc<Connection>),
    Rejected(HazelcastError),
}

/// Manages connections to Hazelcast cluster members.
///
/// Connections are keyed by member UUID once authenticated. The manager
/// owns the reconnect loop, the heartbeat task and the task that reacts to
/// connections closing.
pub struct ConnectionManager {
    config: Arc<ClientConfig>,
    connector: Arc<dyn Connector>,
    load_balancer: Arc<dyn LoadBalancer>,
    client_uuid: Uuid,
    cluster: Arc<ClusterService>,
    partitions: Arc<PartitionService>,
    lifecycle: Arc<LifecycleService>,
    dispatcher: EventDispatcher,
    correlation_ids: Arc<CorrelationIdGenerator>,
    connections: RwLock<HashMap<Uuid, Arc<Connection>>>,
    connecting: Mutex<HashSet<Uuid>>,
    cluster_id: Mutex<Option<Uuid>>,
    listeners: RwLock<Vec<Weak<dyn ConnectionListener>>>,
    event_sender: broadcast::Sender<ConnectionEvent>,
    connection_established: Notify,
    closed_tx: mpsc::UnboundedSender<ConnectionClosed>,
    closed_rx: Mutex<Option<mpsc::UnboundedReceiver<ConnectionClosed>>>,
    reconnecting: AtomicBool,
    shutdown: CancellationToken,
    weak_self: Weak<ConnectionManager>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("cluster", &self.config.cluster_name())
            .field("client_uuid", &self.client_uuid)
            .field("connections", &self.connection_count())
            .field("state", &self.lifecycle.state())
            .finish()
    }
}

impl ConnectionManager {
    /// Creates a connection manager. Must be called within a Tokio runtime:
    /// the event dispatch worker is spawned here.
    pub fn new(
        config: Arc<ClientConfig>,
        connector: Arc<dyn Connector>,
        cluster: Arc<ClusterService>,
        partitions: Arc<PartitionService>,
        lifecycle: Arc<LifecycleService>,
    ) -> Arc<Self> {
        let (event_sender, _) = broadcast::channel(64);
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let dispatcher = EventDispatcher::start(config.event_queue_capacity(), shutdown.child_token());
        let client_uuid = cluster.local_client().uuid();

        Arc::new_cyclic(|weak_self| Self {
            config,
            connector,
            load_balancer: default_load_balancer(),
            client_uuid,
            cluster,
            partitions,
            lifecycle,
            dispatcher,
            correlation_ids: Arc::new(CorrelationIdGenerator::new()),
            connections: RwLock::new(HashMap::new()),
            connecting: Mutex::new(HashSet::new()),
            cluster_id: Mutex::new(None),
            listeners: RwLock::new(Vec::new()),
            event_sender,
            connection_established: Notify::new(),
            closed_tx,
            closed_rx: Mutex::new(Some(closed_rx)),
            reconnecting: AtomicBool::new(false),
            shutdown,
            weak_self: weak_self.clone(),
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the correlation id generator shared by every connection.
    pub fn correlation_ids(&self) -> &Arc<CorrelationIdGenerator> {
        &self.correlation_ids
    }

    /// Returns the event dispatcher connections hand events to.
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Registers an observer of connection changes. Only a weak reference
    /// is kept.
    pub fn add_connection_listener(&self, listener: Weak<dyn ConnectionListener>) {
        write(&self.listeners).push(listener);
    }

    /// Subscribes to connection lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_sender.subscribe()
    }

    /// Returns `true` once shutdown started.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled() || self.lifecycle.state().is_shutting_down()
    }

    /// Returns the number of open connections.
    pub fn connection_count(&self) -> usize {
        read(&self.connections).len()
    }

    /// Returns every open connection.
    pub fn active_connections(&self) -> Vec<Arc<Connection>> {
        read(&self.connections).values().cloned().collect()
    }

    /// Returns the connection to member `uuid`.
    pub fn connection_for_member(&self, uuid: &Uuid) -> Option<Arc<Connection>> {
        read(&self.connections).get(uuid).cloned()
    }

    /// Returns the open connection with `id`.
    pub fn connection_by_id(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        read(&self.connections)
            .values()
            .find(|c| c.id() == id)
            .cloned()
    }

    fn connection_for_address(&self, address: SocketAddr) -> Option<Arc<Connection>> {
        read(&self.connections)
            .values()
            .find(|c| c.address() == address)
            .cloned()
    }

    /// Returns a connection for invocations with no routing preference.
    pub fn random_connection(&self) -> Option<Arc<Connection>> {
        let connections = read(&self.connections);
        if !self.config.network().smart_routing() {
            return connections.values().next().cloned();
        }
        let members: Vec<Member> = connections
            .values()
            .filter_map(|c| c.member().cloned())
            .collect();
        self.load_balancer
            .select(&members)
            .and_then(|m| connections.get(&m.uuid()).cloned())
    }

    /// Resolves the connection that should carry an invocation for
    /// `target`, or `None` if no usable connection exists right now.
    pub fn select_connection(&self, target: &InvocationTarget) -> Option<Arc<Connection>> {
        let smart = self.config.network().smart_routing();
        match *target {
            InvocationTarget::Connection(id) => self.connection_by_id(id),
            InvocationTarget::Member(uuid) => {
                if smart {
                    self.connection_for_member(&uuid)
                } else {
                    self.random_connection()
                }
            }
            InvocationTarget::Partition(partition_id) => {
                if smart {
                    let owner = self
                        .partitions
                        .owner_of(partition_id)
                        .and_then(|owner| self.connection_for_member(&owner));
                    if owner.is_some() {
                        return owner;
                    }
                }
                self.random_connection()
            }
            InvocationTarget::Random => self.random_connection(),
        }
    }

    /// Returns a future resolving the next time a connection is added or
    /// shutdown starts.
    pub(crate) fn connection_established(&self) -> Notified<'_> {
        self.connection_established.notified()
    }

    /// Connects to the cluster and starts the background tasks.
    #[instrument(
        name = "connection_manager.start",
        skip(self),
        fields(cluster = %self.config.cluster_name())
    )]
    pub async fn start(&self) -> Result<()> {
        self.spawn_close_handler();
        self.connect_to_cluster().await?;
        self.spawn_heartbeat_task();
        Ok(())
    }

    /// Tries every known address until one connection is authenticated,
    /// backing off between rounds until the cluster connect timeout.
    async fn connect_to_cluster(&self) -> Result<()> {
        let retry = self.config.retry();
        let deadline = Instant::now() + retry.cluster_connect_timeout();
        let mut backoff = Backoff::new(
            retry.initial_backoff(),
            retry.max_backoff(),
            retry.multiplier(),
            retry.jitter(),
        );
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            for address in self.candidate_addresses().await {
                if self.is_shutting_down() {
                    return Err(not_active());
                }
                match self.connect_to(address).await {
                    Ok(_) => return Ok(()),
                    Err(e @ HazelcastError::Authentication(_)) => {
                        tracing::error!(address = %address, error = %e, "authentication rejected");
                        return Err(e);
                    }
                    Err(e) => {
                        tracing::warn!(address = %address, attempt, error = %e, "connection attempt failed");
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::error!(attempts = attempt, "unable to connect to cluster");
                return Err(HazelcastError::Connection(format!(
                    "unable to connect to cluster {} within {:?}",
                    self.config.cluster_name(),
                    retry.cluster_connect_timeout()
                )));
            }

            let delay = backoff.next_delay().min(deadline - now);
            let _ = self.event_sender.send(ConnectionEvent::ReconnectAttempt {
                attempt,
                next_delay: delay,
            });
            tracing::debug!(attempt, backoff = ?delay, "waiting before next connection round");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.cancelled() => return Err(not_active()),
            }
        }
    }

    /// Addresses of known members followed by the configured addresses.
    async fn candidate_addresses(&self) -> Vec<SocketAddr> {
        let mut addresses = Vec::new();
        for member in self.cluster.members() {
            match resolve(member.address()).await {
                Ok(address) => addresses.push(address),
                Err(e) => tracing::debug!(member = %member, error = %e, "cannot resolve member"),
            }
        }
        addresses.extend_from_slice(self.config.network().addresses());

        let mut seen = HashSet::new();
        addresses.retain(|a| seen.insert(*a));
        addresses
    }

    /// Opens, authenticates and registers a connection to `address`.
    #[instrument(
        name = "connection_manager.connect",
        skip(self),
        fields(address = %address)
    )]
    pub async fn connect_to(&self, address: SocketAddr) -> Result<Arc<Connection>> {
        if let Some(existing) = self.connection_for_address(address) {
            return Ok(existing);
        }
        if self.is_shutting_down() {
            return Err(not_active());
        }

        let connect_timeout = self.config.network().connection_timeout();
        let stream = timeout(connect_timeout, self.connector.connect(address))
            .await
            .map_err(|_| {
                HazelcastError::Connection(format!(
                    "connection to {} timed out after {:?}",
                    address, connect_timeout
                ))
            })??;

        let connection = Connection::establish(
            stream,
            address,
            ConnectionOptions {
                max_frame_size: self.config.network().max_frame_size(),
                dispatcher: self.dispatcher.clone(),
                closed_tx: self.closed_tx.clone(),
            },
        )
        .await?;

        let response = match self.authenticate(&connection).await {
            Ok(response) => response,
            Err(e) => {
                connection.close(format!("authentication failed: {}", e)).await;
                return Err(e);
            }
        };

        self.register(connection, response).await
    }

    async fn authenticate(&self, connection: &Connection) -> Result<AuthenticationResponse> {
        let security = self.config.security();
        let client = self.cluster.local_client();
        let request = client_authentication::encode_request(&AuthenticationRequest {
            cluster_name: self.config.cluster_name().to_string(),
            username: security.username().map(str::to_string),
            password: security.password().map(str::to_string),
            client_uuid: self.client_uuid,
            client_type: CLIENT_TYPE.to_string(),
            serialization_version: SERIALIZATION_VERSION,
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            client_name: client.name().to_string(),
            labels: client.labels().to_vec(),
        });

        let response = connection
            .call(
                request,
                self.correlation_ids.next_id(),
                self.config.network().connection_timeout(),
            )
            .await?;
        let response = client_authentication::decode_response(&response)?;

        match response.status {
            AuthenticationStatus::Authenticated => Ok(response),
            AuthenticationStatus::CredentialsFailed => Err(HazelcastError::Authentication(format!(
                "invalid credentials for cluster {}",
                self.config.cluster_name()
            ))),
            AuthenticationStatus::SerializationVersionMismatch => {
                Err(HazelcastError::Authentication(format!(
                    "member at {} uses serialization version {}, client uses {}",
                    connection.address(),
                    response.serialization_version,
                    SERIALIZATION_VERSION
                )))
            }
            AuthenticationStatus::NotAllowedInCluster => Err(HazelcastError::Authentication(
                "client is not allowed in the cluster".to_string(),
            )),
        }
    }

    async fn register(
        &self,
        connection: Arc<Connection>,
        response: AuthenticationResponse,
    ) -> Result<Arc<Connection>> {
        let admission = self.admit(&connection, &response);
        let (first, changed_cluster) = match admission {
            Admission::Added {
                first,
                changed_cluster,
            } => (first, changed_cluster),
            Admission::Duplicate(existing) => {
                connection.close("duplicate connection to member").await;
                return Ok(existing);
            }
            Admission::Rejected(e) => {
                connection.close(e.to_string()).await;
                return Err(e);
            }
        };

        let address = connection.address();
        if changed_cluster {
            tracing::warn!(
                cluster_id = ?response.cluster_id,
                "connected to a different cluster, resetting member list and partition table"
            );
            self.cluster.reset();
            self.partitions.reset();
            self.lifecycle.fire(LifecycleEvent::ClientChangedCluster);
        }
        if first {
            self.lifecycle.set_state(ClientState::Connected);
            self.lifecycle.fire(LifecycleEvent::ClientConnected);
        }

        let _ = self.event_sender.send(ConnectionEvent::Connected {
            id: connection.id(),
            address,
        });
        tracing::info!(
            id = %connection.id(),
            member = ?connection.member_uuid(),
            server_version = %response.server_version,
            "connected to cluster member"
        );

        for listener in self.connection_listeners() {
            listener.connection_added(&connection).await;
        }
        self.connection_established.notify_waiters();
        Ok(connection)
    }

    fn admit(&self, connection: &Arc<Connection>, response: &AuthenticationResponse) -> Admission {
        let Some(member_uuid) = response.member_uuid else {
            return Admission::Rejected(HazelcastError::Protocol(
                "authentication response carries no member uuid".to_string(),
            ));
        };
        if let Err(e) = self.partitions.check_and_set_partition_count(response.partition_count) {
            return Admission::Rejected(e);
        }
        let address = response
            .address
            .clone()
            .unwrap_or_else(|| Address::from(connection.address()));
        connection.set_member(Member::new(member_uuid, address));

        let mut connections = write(&self.connections);
        if self.is_shutting_down() {
            return Admission::Rejected(not_active());
        }
        if let Some(existing) = connections.get(&member_uuid) {
            return Admission::Duplicate(Arc::clone(existing));
        }

        let mut cluster_id = lock(&self.cluster_id);
        let changed_cluster = matches!(
            (*cluster_id, response.cluster_id),
            (Some(old), Some(new)) if old != new
        );
        if changed_cluster && !connections.is_empty() {
            return Admission::Rejected(HazelcastError::Connection(format!(
                "member {} belongs to cluster {:?}, client is connected to {:?}",
                member_uuid, response.cluster_id, *cluster_id
            )));
        }
        if response.cluster_id.is_some() {
            *cluster_id = response.cluster_id;
        }

        let first = connections.is_empty();
        connections.insert(member_uuid, Arc::clone(connection));
        Admission::Added {
            first,
            changed_cluster,
        }
    }

    fn connection_listeners(&self) -> Vec<Arc<dyn ConnectionListener>> {
        let mut listeners = write(&self.listeners);
        listeners.retain(|l| l.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }

    /// Opens connections to every member without one. Only used with smart
    /// routing; connections are opened in the background.
    pub(crate) fn connect_to_all_members(&self) {
        if !self.config.network().smart_routing() || self.is_shutting_down() {
            return;
        }

        for member in self.cluster.members() {
            let uuid = member.uuid();
            if self.connection_for_member(&uuid).is_some() || !lock(&self.connecting).insert(uuid) {
                continue;
            }

            let weak = self.weak_self.clone();
            tokio::spawn(async move {
                let Some(manager) = weak.upgrade() else {
                    return;
                };
                let result = match resolve(member.address()).await {
                    Ok(address) => manager.connect_to(address).await.map(|_| ()),
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    tracing::debug!(member = %member, error = %e, "failed to connect to member");
                }
                lock(&manager.connecting).remove(&uuid);
            });
        }
    }

    /// Closes the connection to a member that left the cluster.
    pub(crate) async fn close_member_connection(&self, uuid: &Uuid, reason: &str) {
        if let Some(connection) = self.connection_for_member(uuid) {
            connection.close(reason).await;
        }
    }

    fn spawn_close_handler(&self) {
        let Some(mut closed_rx) = lock(&self.closed_rx).take() else {
            return;
        };
        let weak = self.weak_self.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                let closed = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    closed = closed_rx.recv() => match closed {
                        Some(closed) => closed,
                        None => break,
                    },
                };
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                manager.on_connection_closed(closed).await;
            }
            tracing::debug!("connection close handler stopped");
        });
    }

    async fn on_connection_closed(&self, closed: ConnectionClosed) {
        let removed = {
            let mut connections = write(&self.connections);
            let member = connections
                .iter()
                .find(|(_, c)| c.id() == closed.id)
                .map(|(uuid, _)| *uuid);
            member.and_then(|uuid| connections.remove(&uuid))
        };
        let Some(connection) = removed else {
            return;
        };

        let _ = self.event_sender.send(ConnectionEvent::Disconnected {
            id: connection.id(),
            address: connection.address(),
            error: Some(closed.reason.clone()),
        });
        tracing::info!(
            id = %connection.id(),
            address = %connection.address(),
            reason = %closed.reason,
            "removed connection"
        );

        for listener in self.connection_listeners() {
            listener.connection_removed(&connection).await;
        }

        if self.is_shutting_down() || self.connection_count() > 0 {
            return;
        }
        self.on_cluster_disconnected().await;
    }

    async fn on_cluster_disconnected(&self) {
        if !self.lifecycle.set_state(ClientState::Disconnected) {
            return;
        }
        self.lifecycle.fire(LifecycleEvent::ClientDisconnected);

        match self.config.network().reconnect_mode() {
            ReconnectMode::Off => {
                tracing::info!("lost cluster connection and reconnect is off, shutting down");
                self.shutdown().await;
            }
            ReconnectMode::On | ReconnectMode::Async => self.spawn_reconnect(),
        }
    }

    fn spawn_reconnect(&self) {
        if self.reconnecting.swap(true, Ordering::AcqRel) {
            return;
        }
        let weak = self.weak_self.clone();

        tokio::spawn(async move {
            let Some(manager) = weak.upgrade() else {
                return;
            };
            manager.lifecycle.set_state(ClientState::Reconnecting);
            tracing::info!("reconnecting to cluster");

            let result = manager.connect_to_cluster().await;
            manager.reconnecting.store(false, Ordering::Release);

            match result {
                Ok(()) => tracing::info!("reconnected to cluster"),
                Err(_) if manager.is_shutting_down() => {}
                Err(e) => {
                    tracing::error!(error = %e, "reconnection failed, shutting down");
                    let _ = manager.event_sender.send(ConnectionEvent::ReconnectFailed {
                        error: e.to_string(),
                    });
                    manager.shutdown().await;
                }
            }
        });
    }

    fn spawn_heartbeat_task(&self) {
        let weak = self.weak_self.clone();
        let shutdown = self.shutdown.clone();
        let heartbeat_interval = self.config.network().heartbeat_interval();

        tokio::spawn(async move {
            let mut ticker = interval(heartbeat_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(manager) = weak.upgrade() else {
                            break;
                        };
                        manager.check_heartbeats().await;
                    }
                    _ = shutdown.cancelled() => break,
                }
            }
            tracing::debug!("heartbeat task stopped");
        });
    }

    /// Closes connections silent for longer than the heartbeat timeout and
    /// pings connections idle for longer than the heartbeat interval.
    async fn check_heartbeats(&self) {
        let network = self.config.network();
        for connection in self.active_connections() {
            if connection.last_read_elapsed() >= network.heartbeat_timeout() {
                tracing::warn!(
                    id = %connection.id(),
                    address = %connection.address(),
                    timeout = ?network.heartbeat_timeout(),
                    "heartbeat timed out"
                );
                connection
                    .close(format!(
                        "no data received for {:?}",
                        network.heartbeat_timeout()
                    ))
                    .await;
                continue;
            }

            if connection.last_write_elapsed() >= network.heartbeat_interval() {
                let correlation_id = self.correlation_ids.next_id();
                let ping_timeout = network.heartbeat_timeout();
                tokio::spawn(async move {
                    if let Err(e) = connection
                        .call(client_ping::encode_request(), correlation_id, ping_timeout)
                        .await
                    {
                        tracing::debug!(id = %connection.id(), error = %e, "ping failed");
                    }
                });
            }
        }
    }

    /// Closes every connection and stops background tasks. Pending
    /// invocations fail with [`HazelcastError::ClientNotActive`].
    #[instrument(
        name = "connection_manager.shutdown",
        skip(self),
        fields(cluster = %self.config.cluster_name())
    )]
    pub async fn shutdown(&self) {
        if !self.lifecycle.set_state(ClientState::ShuttingDown) {
            return;
        }
        self.lifecycle.fire(LifecycleEvent::ShuttingDown);
        self.shutdown.cancel();

        let connections: Vec<Arc<Connection>> = write(&self.connections)
            .drain()
            .map(|(_, c)| c)
            .collect();
        tracing::debug!(connection_count = connections.len(), "closing all connections");

        for connection in &connections {
            connection.close("client is shutting down").await;
            let _ = self.event_sender.send(ConnectionEvent::Disconnected {
                id: connection.id(),
                address: connection.address(),
                error: None,
            });
        }
        self.connection_established.notify_waiters();

        if !connections.is_empty() {
            self.lifecycle.fire(LifecycleEvent::ClientDisconnected);
        }
        self.lifecycle.fire(LifecycleEvent::Shutdown);
        tracing::info!("connection manager shut down");
    }
}

fn not_active() -> HazelcastError {
    HazelcastError::ClientNotActive("client is shutting down".to_string())
}

async fn resolve(address: &Address) -> Result<SocketAddr> {
    tokio::net::lookup_host((address.host.as_str(), address.port))
        .await
        .map_err(|e| HazelcastError::Connection(format!("cannot resolve {}: {}", address, e)))?
        .next()
        .ok_or_else(|| HazelcastError::Connection(format!("{} resolved to no address", address)))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
