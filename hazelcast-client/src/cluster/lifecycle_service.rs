//! Client lifecycle state and lifecycle events.

use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::listener::{ClientState, LifecycleEvent};

/// Registration handle for a lifecycle event listener.
///
/// The listener receives events until this registration is dropped.
#[derive(Debug)]
pub struct LifecycleListenerRegistration {
    id: Uuid,
    receiver: broadcast::Receiver<LifecycleEvent>,
}

impl LifecycleListenerRegistration {
    /// Returns the unique identifier for this registration.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns a mutable reference to the event receiver.
    pub fn receiver(&mut self) -> &mut broadcast::Receiver<LifecycleEvent> {
        &mut self.receiver
    }

    /// Receives the next lifecycle event.
    pub async fn recv(&mut self) -> std::result::Result<LifecycleEvent, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}

/// Holds the client state and publishes lifecycle events.
///
/// The state is a `watch` value so waiters can block until the client is
/// connected again; events go out on a `broadcast` channel.
#[derive(Debug)]
pub struct LifecycleService {
    state: watch::Sender<ClientState>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl Default for LifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleService {
    /// Creates a lifecycle service in [`ClientState::Initial`].
    pub fn new() -> Self {
        let (state, _) = watch::channel(ClientState::Initial);
        let (events, _) = broadcast::channel(32);
        Self { state, events }
    }

    /// Publishes a lifecycle event.
    pub fn fire(&self, event: LifecycleEvent) {
        tracing::info!(event = %event, "client lifecycle");
        let _ = self.events.send(event);
    }

    /// Returns the current client state.
    pub fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    /// Moves to `state`. Once shutting down the state never changes again;
    /// returns `false` if the transition was refused.
    pub fn set_state(&self, state: ClientState) -> bool {
        self.state.send_if_modified(|current| {
            if current.is_shutting_down() || *current == state {
                return false;
            }
            tracing::debug!(from = %current, to = %state, "client state changed");
            *current = state;
            true
        })
    }

    /// Returns a receiver observing client state changes.
    pub fn watch_state(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    /// Returns `true` until shutdown starts.
    pub fn is_running(&self) -> bool {
        !self.state().is_shutting_down()
    }

    /// Adds a lifecycle event listener.
    pub fn add_lifecycle_listener(&self) -> LifecycleListenerRegistration {
        LifecycleListenerRegistration {
            id: Uuid::new_v4(),
            receiver: self.events.subscribe(),
        }
    }
}
