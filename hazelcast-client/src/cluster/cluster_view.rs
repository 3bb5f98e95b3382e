//! Keeps the member list and partition table current.
//!
//! The cluster view listener is registered on exactly one connection. Members
//! push the member list and the partition table on it; when that connection
//! closes the listener moves to another one.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use hazelcast_core::protocol::codecs::client_add_cluster_view_listener::{
    self, ClusterViewEvent,
};
use hazelcast_core::ClientMessage;

use super::{ClusterService, PartitionService};
use crate::connection::{Connection, ConnectionId, ConnectionListener, ConnectionManager};
use crate::invocation::InvocationService;
use crate::listener::{EventHandler, HandlerSet, MemberEventType};

pub(crate) struct ClusterViewListener {
    connections: Arc<ConnectionManager>,
    invocations: Arc<InvocationService>,
    cluster: Arc<ClusterService>,
    partitions: Arc<PartitionService>,
    registered_on: Mutex<Option<ConnectionId>>,
    weak_self: Weak<ClusterViewListener>,
}

impl std::fmt::Debug for ClusterViewListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterViewListener")
            .field("registered_on", &self.registered_on())
            .finish()
    }
}

impl ClusterViewListener {
    pub(crate) fn new(
        connections: Arc<ConnectionManager>,
        invocations: Arc<InvocationService>,
        cluster: Arc<ClusterService>,
        partitions: Arc<PartitionService>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            connections,
            invocations,
            cluster,
            partitions,
            registered_on: Mutex::new(None),
            weak_self: weak_self.clone(),
        })
    }

    /// Returns the connection the listener is registered on.
    pub(crate) fn registered_on(&self) -> Option<ConnectionId> {
        *self.lock()
    }

    /// Registers on `preferred` if given, otherwise on the first open
    /// connection that accepts the registration.
    async fn register(&self, preferred: Option<Arc<Connection>>) {
        let candidates = preferred
            .into_iter()
            .chain(self.connections.active_connections());

        for connection in candidates {
            if !connection.is_alive() {
                continue;
            }
            {
                let mut slot = self.lock();
                if slot.is_some() {
                    return;
                }
                *slot = Some(connection.id());
            }

            match self
                .invocations
                .invoke_on_connection(
                    client_add_cluster_view_listener::encode_request(),
                    &connection,
                    Some(self.handlers(connection.id())),
                )
                .await
            {
                Ok(_) => {
                    tracing::debug!(connection = %connection.id(), "cluster view listener registered");
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        connection = %connection.id(),
                        error = %e,
                        "failed to register cluster view listener"
                    );
                    let mut slot = self.lock();
                    if *slot == Some(connection.id()) {
                        *slot = None;
                    }
                }
            }
        }
    }

    fn handlers(&self, origin: ConnectionId) -> HandlerSet {
        let weak = self.weak_self.clone();
        Arc::from(vec![EventHandler::message(move |message| {
            if let Some(listener) = weak.upgrade() {
                listener.handle_event(origin, message);
            }
        })])
    }

    fn handle_event(&self, origin: ConnectionId, message: &ClientMessage) {
        let event = match client_add_cluster_view_listener::decode_event(message) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(connection = %origin, error = %e, "malformed cluster view event");
                return;
            }
        };

        match event {
            ClusterViewEvent::MembersView { version, members } => {
                let events = self.cluster.apply_members_view(version, members);
                for event in events {
                    if event.event_type != MemberEventType::Removed {
                        continue;
                    }
                    let connections = Arc::clone(&self.connections);
                    let uuid = event.member.uuid();
                    tokio::spawn(async move {
                        connections
                            .close_member_connection(&uuid, "member left the cluster")
                            .await;
                    });
                }
                self.connections.connect_to_all_members();
            }
            ClusterViewEvent::PartitionsView { version, partitions } => {
                self.partitions.apply(origin, version, &partitions);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ConnectionId>> {
        self.registered_on
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ConnectionListener for ClusterViewListener {
    async fn connection_added(&self, connection: &Arc<Connection>) {
        if self.lock().is_some() {
            return;
        }
        self.register(Some(Arc::clone(connection))).await;
    }

    async fn connection_removed(&self, connection: &Arc<Connection>) {
        {
            let mut slot = self.lock();
            if *slot != Some(connection.id()) {
                return;
            }
            *slot = None;
        }
        tracing::debug!(connection = %connection.id(), "cluster view connection closed, re-registering");

        let weak = self.weak_self.clone();
        tokio::spawn(async move {
            if let Some(listener) = weak.upgrade() {
                listener.register(None).await;
            }
        });
    }
}
