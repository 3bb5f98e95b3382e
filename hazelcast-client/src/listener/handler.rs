//! Event handler kinds.

use std::fmt;
use std::sync::Arc;

use hazelcast_core::{ClientMessage, Result};

use super::entry_listener::{dispatch_entry_event, dispatch_map_event, EntryListener, MapListener};

/// Callback receiving raw event messages.
pub type MessageCallback = Arc<dyn Fn(&ClientMessage) + Send + Sync>;

/// The handlers attached to one event registration, shared between the
/// subscription and every connection the registration lives on.
pub type HandlerSet = Arc<[EventHandler]>;

/// A handler for events pushed on a listener registration.
#[derive(Clone)]
pub enum EventHandler {
    /// Per-entry events (added, removed, updated, ...).
    Entry(Arc<dyn EntryListener>),
    /// Events describing the whole map (clear, evict all) with the number of
    /// affected entries.
    MapWide(Arc<dyn MapListener>),
    /// Raw event messages, decoded by the callback.
    Message(MessageCallback),
}

impl EventHandler {
    /// Wraps an entry listener.
    pub fn entry(listener: impl EntryListener + 'static) -> Self {
        Self::Entry(Arc::new(listener))
    }

    /// Wraps a map-wide listener.
    pub fn map_wide(listener: impl MapListener + 'static) -> Self {
        Self::MapWide(Arc::new(listener))
    }

    /// Wraps a raw message callback.
    pub fn message<F>(f: F) -> Self
    where
        F: Fn(&ClientMessage) + Send + Sync + 'static,
    {
        Self::Message(Arc::new(f))
    }

    /// Delivers `message` to this handler.
    pub fn handle(&self, message: &ClientMessage) -> Result<()> {
        match self {
            Self::Entry(listener) => dispatch_entry_event(listener.as_ref(), message),
            Self::MapWide(listener) => dispatch_map_event(listener.as_ref(), message),
            Self::Message(callback) => {
                callback(message);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry(_) => f.write_str("EventHandler::Entry"),
            Self::MapWide(_) => f.write_str("EventHandler::MapWide"),
            Self::Message(_) => f.write_str("EventHandler::Message"),
        }
    }
}
