//! Event listener infrastructure: handler kinds, the dispatch worker and the
//! subscription manager that keeps registrations alive across reconnects.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

mod dispatcher;
mod entry_listener;
mod handler;
mod lifecycle;
mod membership;
mod service;

pub use dispatcher::EventDispatcher;
pub use entry_listener::{
    dispatch_entry_event, dispatch_map_event, BoxedEntryListener, EntryEvent, EntryEventType,
    EntryListener, EntryListenerCodec, EntryListenerConfig, FnEntryListener,
    FnEntryListenerBuilder, MapEvent, MapListener,
};
pub use handler::{EventHandler, HandlerSet, MessageCallback};
pub use lifecycle::{ClientState, LifecycleEvent};
pub use membership::{Member, MemberEvent, MemberEventType};
pub use service::{ListenerMessageCodec, ListenerService};

/// Unique identifier for a listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Creates a new unique listener ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a listener ID from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Counters for event dispatch.
#[derive(Debug, Default)]
pub struct ListenerStats {
    messages_received: AtomicU64,
    errors: AtomicU64,
    dropped: AtomicU64,
}

impl ListenerStats {
    /// Creates new listener statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the dispatched events counter.
    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the handler error counter.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the dropped events counter.
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of events dispatched to handlers.
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Returns the number of handler failures.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns the number of events dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
