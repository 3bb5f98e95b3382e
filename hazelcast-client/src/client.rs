//! Hazelcast client entry point.

use std::sync::Arc;

use hazelcast_core::{ClientMessage, Result, Serializable};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cluster::{
    ClientInfo, ClusterService, ClusterViewListener, LifecycleListenerRegistration,
    LifecycleService, PartitionService,
};
use crate::config::ClientConfig;
use crate::connection::{
    ConnectionEvent, ConnectionListener, ConnectionManager, Connector, TcpConnector,
};
use crate::invocation::{InvocationService, InvocationTarget};
use crate::listener::{
    ClientState, EntryListener, EntryListenerCodec, EntryListenerConfig, EventHandler,
    LifecycleEvent, ListenerId, ListenerMessageCodec, ListenerService, Member, MemberEvent,
};

/// The main entry point for connecting to a Hazelcast cluster.
///
/// `HazelcastClient` owns the connections to cluster members and routes
/// requests to them. It keeps the member list and partition table current
/// and keeps listener registrations alive across reconnects.
///
/// # Example
///
/// ```ignore
/// use hazelcast_client::{ClientConfig, HazelcastClient, InvocationTarget};
/// use hazelcast_client::core::protocol::codecs::client_ping;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ClientConfig::builder()
///         .cluster_name("dev")
///         .build()?;
///
///     let client = HazelcastClient::new(config).await?;
///     client
///         .invoke(client_ping::encode_request(), InvocationTarget::Random)
///         .await?;
///
///     client.shutdown().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct HazelcastClient {
    config: Arc<ClientConfig>,
    lifecycle: Arc<LifecycleService>,
    cluster: Arc<ClusterService>,
    partitions: Arc<PartitionService>,
    connection_manager: Arc<ConnectionManager>,
    invocations: Arc<InvocationService>,
    listeners: Arc<ListenerService>,
    // Held so the manager's weak reference stays valid.
    _cluster_view: Arc<ClusterViewListener>,
}

impl HazelcastClient {
    /// Creates a new client and connects to the Hazelcast cluster over TCP.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No member could be reached before the cluster connect timeout
    /// - A member rejected the client's credentials
    pub async fn new(config: ClientConfig) -> Result<Self> {
        Self::with_connector(config, Arc::new(TcpConnector)).await
    }

    /// Creates a new client that opens member streams with `connector`.
    pub async fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        let config = Arc::new(config);
        let client_uuid = Uuid::new_v4();
        let client_name = config
            .client_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("hz.client_{}", client_uuid.simple()));

        let lifecycle = Arc::new(LifecycleService::new());
        let cluster = Arc::new(ClusterService::new(ClientInfo::new(
            client_uuid,
            client_name,
            config.labels().to_vec(),
        )));
        let partitions = Arc::new(PartitionService::new());
        let connection_manager = ConnectionManager::new(
            Arc::clone(&config),
            connector,
            Arc::clone(&cluster),
            Arc::clone(&partitions),
            Arc::clone(&lifecycle),
        );
        let invocations = Arc::new(InvocationService::new(
            Arc::clone(&connection_manager),
            Arc::clone(&lifecycle),
        ));
        let listeners = Arc::new(ListenerService::new(
            Arc::clone(&connection_manager),
            Arc::clone(&invocations),
            config.network().smart_routing(),
        ));
        let cluster_view = ClusterViewListener::new(
            Arc::clone(&connection_manager),
            Arc::clone(&invocations),
            Arc::clone(&cluster),
            Arc::clone(&partitions),
        );

        let cluster_view_listener: Arc<dyn ConnectionListener> = cluster_view.clone();
        let subscription_listener: Arc<dyn ConnectionListener> = listeners.clone();
        connection_manager.add_connection_listener(Arc::downgrade(&cluster_view_listener));
        connection_manager.add_connection_listener(Arc::downgrade(&subscription_listener));

        lifecycle.fire(LifecycleEvent::Starting);
        if let Err(e) = connection_manager.start().await {
            tracing::error!(cluster = %config.cluster_name(), error = %e, "failed to start client");
            connection_manager.shutdown().await;
            return Err(e);
        }

        let wait = config.network().connection_timeout();
        if !cluster.wait_initial_member_list(wait).await {
            tracing::warn!(timeout = ?wait, "member list not received, continuing without it");
        }
        lifecycle.fire(LifecycleEvent::Started);

        tracing::info!(
            cluster = %config.cluster_name(),
            client = %cluster.local_client(),
            members = cluster.member_count(),
            "connected to Hazelcast cluster"
        );

        Ok(Self {
            config,
            lifecycle,
            cluster,
            partitions,
            connection_manager,
            invocations,
            listeners,
            _cluster_view: cluster_view,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns information about this client instance.
    pub fn local_client(&self) -> &ClientInfo {
        self.cluster.local_client()
    }

    /// Sends `message` to `target` and waits for the response.
    ///
    /// Transient failures are retried until the invocation timeout.
    pub async fn invoke(&self, message: ClientMessage, target: InvocationTarget) -> Result<ClientMessage> {
        self.invocations.invoke(message, target).await
    }

    /// Like [`invoke`](Self::invoke), but gives up as soon as `cancel` fires.
    pub async fn invoke_with_cancellation(
        &self,
        message: ClientMessage,
        target: InvocationTarget,
        cancel: CancellationToken,
    ) -> Result<ClientMessage> {
        self.invocations
            .invoke_with_cancellation(message, target, cancel)
            .await
    }

    /// Sends `message` to the owner of the partition `key` belongs to.
    pub async fn invoke_on_key<K>(&self, message: ClientMessage, key: &K) -> Result<ClientMessage>
    where
        K: Serializable + ?Sized,
    {
        let partition_id = self.partitions.partition_id_for_key(key)?;
        self.invoke(message, InvocationTarget::Partition(partition_id))
            .await
    }

    /// Returns the partition `key` belongs to.
    pub fn partition_id_for_key<K>(&self, key: &K) -> Result<i32>
    where
        K: Serializable + ?Sized,
    {
        self.partitions.partition_id_for_key(key)
    }

    /// Returns the member owning `partition_id`, if known.
    pub fn partition_owner(&self, partition_id: i32) -> Option<Member> {
        self.partitions
            .owner_of(partition_id)
            .and_then(|uuid| self.cluster.member(&uuid))
    }

    /// Registers `listener` for entry events of the map named `map_name`.
    pub async fn add_entry_listener<L>(
        &self,
        map_name: &str,
        config: EntryListenerConfig,
        listener: L,
    ) -> Result<ListenerId>
    where
        L: EntryListener + 'static,
    {
        self.subscribe(
            Arc::new(EntryListenerCodec::new(map_name, config)),
            vec![EventHandler::entry(listener)],
            false,
        )
        .await
    }

    /// Registers a server-side listener described by `codec`. Events are
    /// delivered to `handlers` in arrival order.
    pub async fn subscribe(
        &self,
        codec: Arc<dyn ListenerMessageCodec>,
        handlers: Vec<EventHandler>,
        local_only: bool,
    ) -> Result<ListenerId> {
        self.listeners.subscribe(codec, handlers, local_only).await
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub async fn unsubscribe(&self, id: ListenerId) -> Result<bool> {
        self.listeners.unsubscribe(id).await
    }

    /// Returns the members currently in the cluster.
    pub fn members(&self) -> Vec<Member> {
        self.cluster.members()
    }

    /// Subscribes to member added and removed events.
    pub fn membership_events(&self) -> broadcast::Receiver<MemberEvent> {
        self.cluster.add_membership_listener()
    }

    /// Subscribes to connection added and removed events.
    pub fn connection_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection_manager.subscribe()
    }

    /// Adds a lifecycle event listener.
    pub fn add_lifecycle_listener(&self) -> LifecycleListenerRegistration {
        self.lifecycle.add_lifecycle_listener()
    }

    /// Returns the current client state.
    pub fn state(&self) -> ClientState {
        self.lifecycle.state()
    }

    /// Returns a receiver observing client state changes.
    pub fn watch_state(&self) -> watch::Receiver<ClientState> {
        self.lifecycle.watch_state()
    }

    /// Returns `true` until shutdown starts.
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Returns the cluster service.
    pub fn cluster_service(&self) -> &Arc<ClusterService> {
        &self.cluster
    }

    /// Returns the partition service.
    pub fn partition_service(&self) -> &Arc<PartitionService> {
        &self.partitions
    }

    /// Returns the connection manager.
    pub fn connection_manager(&self) -> &Arc<ConnectionManager> {
        &self.connection_manager
    }

    /// Returns the listener service.
    pub fn listener_service(&self) -> &Arc<ListenerService> {
        &self.listeners
    }

    /// Shuts down the client. Pending invocations fail with
    /// [`HazelcastError::ClientNotActive`](hazelcast_core::HazelcastError::ClientNotActive)
    /// and every connection is closed. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        self.connection_manager.shutdown().await;
    }
}
