//! Client lifecycle events and connection state.

use std::fmt;

/// Events emitted during client lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The client is starting and initializing resources.
    Starting,
    /// The client has started and is ready to accept operations.
    Started,
    /// The client is beginning the shutdown process.
    ShuttingDown,
    /// The client has completed shutdown.
    Shutdown,
    /// The client has connected to the cluster.
    ClientConnected,
    /// The client has lost its last cluster connection.
    ClientDisconnected,
    /// The client reconnected to a cluster with a different cluster id.
    ClientChangedCluster,
}

impl LifecycleEvent {
    /// Returns a human-readable name for this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::Shutdown => "SHUTDOWN",
            Self::ClientConnected => "CLIENT_CONNECTED",
            Self::ClientDisconnected => "CLIENT_DISCONNECTED",
            Self::ClientChangedCluster => "CLIENT_CHANGED_CLUSTER",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Connection state of the client as a whole.
///
/// `Initial → Connected ⇄ Disconnected → Reconnecting → Connected`, with
/// `ShuttingDown` reachable from every state and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClientState {
    /// Not yet connected for the first time.
    #[default]
    Initial,
    /// At least one authenticated connection is open.
    Connected,
    /// The last connection was lost.
    Disconnected,
    /// A background reconnect is in progress.
    Reconnecting,
    /// The client is shutting down; all work is rejected.
    ShuttingDown,
}

impl ClientState {
    /// Returns `true` once shutdown has started.
    pub fn is_shutting_down(self) -> bool {
        self == Self::ShuttingDown
    }

    /// Returns `true` while at least one connection is usable.
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "INITIAL",
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
            Self::Reconnecting => "RECONNECTING",
            Self::ShuttingDown => "SHUTTING_DOWN",
        };
        f.write_str(name)
    }
}
