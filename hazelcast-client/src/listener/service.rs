//! Subscription manager.
//!
//! Every subscription remembers how to build its add and remove requests and
//! which handlers receive its events. Registrations are tracked per
//! connection: when a connection closes its registrations are forgotten, and
//! when a connection is added every subscription is registered on it again.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use hazelcast_core::{ClientMessage, HazelcastError, Result};
use uuid::Uuid;

use super::handler::{EventHandler, HandlerSet};
use super::ListenerId;
use crate::connection::{Connection, ConnectionId, ConnectionListener, ConnectionManager};
use crate::invocation::InvocationService;

/// Builds the requests that add and remove one kind of server-side listener.
pub trait ListenerMessageCodec: Send + Sync {
    /// Encodes the add-listener request.
    fn encode_add_request(&self, local_only: bool) -> ClientMessage;

    /// Extracts the server registration id from the add-listener response.
    fn decode_add_response(&self, response: &ClientMessage) -> Result<Uuid>;

    /// Encodes the remove-listener request for a server registration.
    fn encode_remove_request(&self, registration_id: Uuid) -> ClientMessage;
}

#[derive(Debug, Clone, Copy)]
struct ServerRegistration {
    registration_id: Uuid,
    correlation_id: i64,
}

struct Subscription {
    codec: Arc<dyn ListenerMessageCodec>,
    handlers: HandlerSet,
    local_only: bool,
    registrations: HashMap<ConnectionId, ServerRegistration>,
    in_flight: HashSet<ConnectionId>,
}

/// Tracks listener subscriptions and keeps them registered on the cluster.
pub struct ListenerService {
    connections: Arc<ConnectionManager>,
    invocations: Arc<InvocationService>,
    smart_routing: bool,
    subscriptions: Mutex<HashMap<ListenerId, Subscription>>,
}

impl std::fmt::Debug for ListenerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerService")
            .field("smart_routing", &self.smart_routing)
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl ListenerService {
    /// Creates a listener service.
    pub fn new(
        connections: Arc<ConnectionManager>,
        invocations: Arc<InvocationService>,
        smart_routing: bool,
    ) -> Self {
        Self {
            connections,
            invocations,
            smart_routing,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a listener on the cluster.
    ///
    /// With smart routing the listener is registered on every open
    /// connection, otherwise on the single cluster connection. Connections
    /// opened later receive the registration when they are added. If
    /// registration fails on a live connection the subscription is rolled
    /// back and the error returned.
    #[tracing::instrument(skip(self, codec, handlers), fields(listener))]
    pub async fn subscribe(
        &self,
        codec: Arc<dyn ListenerMessageCodec>,
        handlers: Vec<EventHandler>,
        local_only: bool,
    ) -> Result<ListenerId> {
        if self.connections.is_shutting_down() {
            return Err(HazelcastError::ClientNotActive(
                "client is shutting down".to_string(),
            ));
        }

        let id = ListenerId::new();
        tracing::Span::current().record("listener", tracing::field::display(id));
        self.lock().insert(
            id,
            Subscription {
                codec,
                handlers: Arc::from(handlers),
                local_only,
                registrations: HashMap::new(),
                in_flight: HashSet::new(),
            },
        );

        for connection in self.targets() {
            match self.register_on(id, &connection).await {
                Ok(()) => {}
                Err(e) if !connection.is_alive() => {
                    tracing::debug!(
                        connection = %connection.id(),
                        error = %e,
                        "connection lost during registration, will register on reconnect"
                    );
                }
                Err(e) => {
                    self.unsubscribe(id).await?;
                    return Err(e);
                }
            }
        }

        tracing::debug!(listener = %id, "listener subscribed");
        Ok(id)
    }

    /// Removes a listener. Local state is dropped first, so events stop even
    /// if the members never acknowledge the removal. Returns `false` if the
    /// listener was not registered.
    #[tracing::instrument(skip(self))]
    pub async fn unsubscribe(&self, id: ListenerId) -> Result<bool> {
        let Some(subscription) = self.lock().remove(&id) else {
            return Ok(false);
        };

        for (connection_id, registration) in subscription.registrations {
            let Some(connection) = self.connections.connection_by_id(connection_id) else {
                continue;
            };
            self.deregister(&connection, subscription.codec.as_ref(), registration)
                .await;
        }

        tracing::debug!(listener = %id, "listener unsubscribed");
        Ok(true)
    }

    /// Returns the number of subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.lock().len()
    }

    /// Returns on how many connections `id` is currently registered.
    pub fn active_registrations(&self, id: ListenerId) -> usize {
        self.lock()
            .get(&id)
            .map(|s| s.registrations.len())
            .unwrap_or(0)
    }

    fn targets(&self) -> Vec<Arc<Connection>> {
        if self.smart_routing {
            self.connections.active_connections()
        } else {
            self.connections.random_connection().into_iter().collect()
        }
    }

    /// Registers subscription `id` on `connection` unless it is already
    /// registered there or a registration is in flight.
    async fn register_on(&self, id: ListenerId, connection: &Arc<Connection>) -> Result<()> {
        let connection_id = connection.id();
        let (codec, request, handlers) = {
            let mut subscriptions = self.lock();
            let Some(subscription) = subscriptions.get_mut(&id) else {
                return Ok(());
            };
            if subscription.registrations.contains_key(&connection_id)
                || !subscription.in_flight.insert(connection_id)
            {
                return Ok(());
            }
            (
                Arc::clone(&subscription.codec),
                subscription.codec.encode_add_request(subscription.local_only),
                Arc::clone(&subscription.handlers),
            )
        };

        let outcome = self
            .invocations
            .invoke_on_connection(request, connection, Some(handlers))
            .await
            .and_then(|(response, correlation_id)| {
                match codec.decode_add_response(&response) {
                    Ok(registration_id) => Ok(ServerRegistration {
                        registration_id,
                        correlation_id,
                    }),
                    Err(e) => {
                        connection.remove_event_handler(correlation_id);
                        Err(e)
                    }
                }
            });

        let orphaned = {
            let mut subscriptions = self.lock();
            match subscriptions.get_mut(&id) {
                Some(subscription) => {
                    subscription.in_flight.remove(&connection_id);
                    let registration = outcome?;
                    if connection.is_alive() {
                        subscription.registrations.insert(connection_id, registration);
                    }
                    None
                }
                None => outcome.ok(),
            }
        };

        // Unsubscribed while the registration was in flight.
        if let Some(registration) = orphaned {
            self.deregister(connection, codec.as_ref(), registration).await;
        }
        Ok(())
    }

    async fn deregister(
        &self,
        connection: &Arc<Connection>,
        codec: &dyn ListenerMessageCodec,
        registration: ServerRegistration,
    ) {
        connection.remove_event_handler(registration.correlation_id);
        let request = codec.encode_remove_request(registration.registration_id);
        if let Err(e) = self
            .invocations
            .invoke_on_connection(request, connection, None)
            .await
        {
            tracing::debug!(
                connection = %connection.id(),
                registration = %registration.registration_id,
                error = %e,
                "failed to deregister listener"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ListenerId, Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ConnectionListener for ListenerService {
    async fn connection_added(&self, connection: &Arc<Connection>) {
        if !self.smart_routing && self.connections.active_connections().len() > 1 {
            return;
        }

        let ids: Vec<ListenerId> = self.lock().keys().copied().collect();
        for id in ids {
            if let Err(e) = self.register_on(id, connection).await {
                tracing::warn!(
                    listener = %id,
                    connection = %connection.id(),
                    error = %e,
                    "failed to re-register listener"
                );
            }
        }
    }

    async fn connection_removed(&self, connection: &Arc<Connection>) {
        let connection_id = connection.id();
        for subscription in self.lock().values_mut() {
            subscription.registrations.remove(&connection_id);
        }
    }
}
