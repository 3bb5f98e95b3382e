//! Entry listeners for map-like data structures.

use std::sync::Arc;

use bytes::Bytes;
use hazelcast_core::protocol::codecs::map_entry_listener::{self, AddEntryListenerRequest, EntryEventBody};
use hazelcast_core::{ClientMessage, Deserializable, Result};
use uuid::Uuid;

use super::service::ListenerMessageCodec;

/// Kind of an entry event. Values are bits of the listener flags mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EntryEventType {
    /// An entry was added.
    Added = 1,
    /// An entry was removed.
    Removed = 1 << 1,
    /// An entry's value was replaced.
    Updated = 1 << 2,
    /// An entry was evicted.
    Evicted = 1 << 3,
    /// An entry expired.
    Expired = 1 << 4,
    /// All entries were evicted.
    EvictAll = 1 << 5,
    /// All entries were cleared.
    ClearAll = 1 << 6,
    /// An entry was merged after a split brain.
    Merged = 1 << 7,
    /// A near cache entry was invalidated.
    Invalidation = 1 << 8,
    /// An entry was loaded from a map store.
    Loaded = 1 << 9,
}

impl EntryEventType {
    /// Every event type, in bit order.
    pub const ALL: [EntryEventType; 10] = [
        Self::Added,
        Self::Removed,
        Self::Updated,
        Self::Evicted,
        Self::Expired,
        Self::EvictAll,
        Self::ClearAll,
        Self::Merged,
        Self::Invalidation,
        Self::Loaded,
    ];

    /// Creates an event type from its wire format value.
    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.value() == value)
    }

    /// Returns the wire format value for this event type.
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Returns `true` for events that describe the whole map rather than one
    /// entry.
    pub fn is_map_wide(self) -> bool {
        matches!(self, Self::EvictAll | Self::ClearAll)
    }
}

impl std::fmt::Display for EntryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Added => "ADDED",
            Self::Removed => "REMOVED",
            Self::Updated => "UPDATED",
            Self::Evicted => "EVICTED",
            Self::Expired => "EXPIRED",
            Self::EvictAll => "EVICT_ALL",
            Self::ClearAll => "CLEAR_ALL",
            Self::Merged => "MERGED",
            Self::Invalidation => "INVALIDATION",
            Self::Loaded => "LOADED",
        };
        f.write_str(name)
    }
}

/// An event about a single entry. Key and values are serialized blobs; use
/// [`EntryEvent::key_as`] and friends to deserialize them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryEvent {
    /// Kind of change.
    pub event_type: EntryEventType,
    /// Serialized key.
    pub key: Option<Bytes>,
    /// Serialized new value, if values were requested.
    pub value: Option<Bytes>,
    /// Serialized previous value, if values were requested.
    pub old_value: Option<Bytes>,
    /// Serialized merging value.
    pub merging_value: Option<Bytes>,
    /// Member that produced the event.
    pub member_uuid: Option<Uuid>,
}

impl EntryEvent {
    fn from_body(event_type: EntryEventType, body: EntryEventBody) -> Self {
        Self {
            event_type,
            key: body.key,
            value: body.value,
            old_value: body.old_value,
            merging_value: body.merging_value,
            member_uuid: body.member_uuid,
        }
    }

    /// Deserializes the key.
    pub fn key_as<K: Deserializable>(&self) -> Result<Option<K>> {
        self.key.as_deref().map(K::from_bytes).transpose()
    }

    /// Deserializes the new value.
    pub fn value_as<V: Deserializable>(&self) -> Result<Option<V>> {
        self.value.as_deref().map(V::from_bytes).transpose()
    }

    /// Deserializes the previous value.
    pub fn old_value_as<V: Deserializable>(&self) -> Result<Option<V>> {
        self.old_value.as_deref().map(V::from_bytes).transpose()
    }
}

/// An event about the whole map, such as `clear` or `evict_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEvent {
    /// Kind of change.
    pub event_type: EntryEventType,
    /// Number of entries the operation affected.
    pub number_of_affected_entries: i32,
    /// Member that produced the event.
    pub member_uuid: Option<Uuid>,
}

/// A listener for entry-level events on maps.
///
/// All methods default to doing nothing, so implementors override only the
/// events they care about.
pub trait EntryListener: Send + Sync {
    /// Called when a new entry is added to the map.
    fn entry_added(&self, event: EntryEvent) {
        let _ = event;
    }

    /// Called when an entry is removed from the map.
    fn entry_removed(&self, event: EntryEvent) {
        let _ = event;
    }

    /// Called when an existing entry is updated in the map.
    fn entry_updated(&self, event: EntryEvent) {
        let _ = event;
    }

    /// Called when an entry is evicted from the map.
    fn entry_evicted(&self, event: EntryEvent) {
        let _ = event;
    }

    /// Called when an entry expires.
    fn entry_expired(&self, event: EntryEvent) {
        let _ = event;
    }

    /// Called for merge, invalidation and load events.
    fn entry_other(&self, event: EntryEvent) {
        let _ = event;
    }
}

/// A listener for map-wide events.
pub trait MapListener: Send + Sync {
    /// Called after the map was cleared.
    fn map_cleared(&self, event: MapEvent) {
        let _ = event;
    }

    /// Called after every entry was evicted.
    fn map_evicted(&self, event: MapEvent) {
        let _ = event;
    }
}

/// A boxed entry listener for type-erased storage.
pub type BoxedEntryListener = Arc<dyn EntryListener>;

type EntryCallback = Box<dyn Fn(EntryEvent) + Send + Sync>;

/// An entry listener implementation using closures.
///
/// Use [`FnEntryListener::builder`] to create a new instance.
pub struct FnEntryListener {
    on_added: Option<EntryCallback>,
    on_removed: Option<EntryCallback>,
    on_updated: Option<EntryCallback>,
    on_evicted: Option<EntryCallback>,
    on_expired: Option<EntryCallback>,
}

impl FnEntryListener {
    /// Creates a new builder for constructing an `FnEntryListener`.
    pub fn builder() -> FnEntryListenerBuilder {
        FnEntryListenerBuilder::default()
    }

    fn call(callback: &Option<EntryCallback>, event: EntryEvent) {
        if let Some(f) = callback {
            f(event);
        }
    }
}

impl EntryListener for FnEntryListener {
    fn entry_added(&self, event: EntryEvent) {
        Self::call(&self.on_added, event);
    }

    fn entry_removed(&self, event: EntryEvent) {
        Self::call(&self.on_removed, event);
    }

    fn entry_updated(&self, event: EntryEvent) {
        Self::call(&self.on_updated, event);
    }

    fn entry_evicted(&self, event: EntryEvent) {
        Self::call(&self.on_evicted, event);
    }

    fn entry_expired(&self, event: EntryEvent) {
        Self::call(&self.on_expired, event);
    }
}

impl std::fmt::Debug for FnEntryListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnEntryListener")
            .field("on_added", &self.on_added.is_some())
            .field("on_removed", &self.on_removed.is_some())
            .field("on_updated", &self.on_updated.is_some())
            .field("on_evicted", &self.on_evicted.is_some())
            .field("on_expired", &self.on_expired.is_some())
            .finish()
    }
}

/// Builder for creating [`FnEntryListener`] instances.
#[derive(Default)]
pub struct FnEntryListenerBuilder {
    on_added: Option<EntryCallback>,
    on_removed: Option<EntryCallback>,
    on_updated: Option<EntryCallback>,
    on_evicted: Option<EntryCallback>,
    on_expired: Option<EntryCallback>,
}

impl FnEntryListenerBuilder {
    /// Sets the handler for entry added events.
    pub fn on_added<F>(mut self, f: F) -> Self
    where
        F: Fn(EntryEvent) + Send + Sync + 'static,
    {
        self.on_added = Some(Box::new(f));
        self
    }

    /// Sets the handler for entry removed events.
    pub fn on_removed<F>(mut self, f: F) -> Self
    where
        F: Fn(EntryEvent) + Send + Sync + 'static,
    {
        self.on_removed = Some(Box::new(f));
        self
    }

    /// Sets the handler for entry updated events.
    pub fn on_updated<F>(mut self, f: F) -> Self
    where
        F: Fn(EntryEvent) + Send + Sync + 'static,
    {
        self.on_updated = Some(Box::new(f));
        self
    }

    /// Sets the handler for entry evicted events.
    pub fn on_evicted<F>(mut self, f: F) -> Self
    where
        F: Fn(EntryEvent) + Send + Sync + 'static,
    {
        self.on_evicted = Some(Box::new(f));
        self
    }

    /// Sets the handler for entry expired events.
    pub fn on_expired<F>(mut self, f: F) -> Self
    where
        F: Fn(EntryEvent) + Send + Sync + 'static,
    {
        self.on_expired = Some(Box::new(f));
        self
    }

    /// Builds the [`FnEntryListener`].
    pub fn build(self) -> FnEntryListener {
        FnEntryListener {
            on_added: self.on_added,
            on_removed: self.on_removed,
            on_updated: self.on_updated,
            on_evicted: self.on_evicted,
            on_expired: self.on_expired,
        }
    }
}

impl std::fmt::Debug for FnEntryListenerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnEntryListenerBuilder").finish()
    }
}

/// Decodes an entry event message and calls the matching listener method.
/// Map-wide events are skipped.
pub fn dispatch_entry_event(listener: &dyn EntryListener, message: &ClientMessage) -> Result<()> {
    let (event_type, body) = decode_body(message)?;
    if event_type.is_map_wide() {
        return Ok(());
    }
    let event = EntryEvent::from_body(event_type, body);
    match event_type {
        EntryEventType::Added => listener.entry_added(event),
        EntryEventType::Removed => listener.entry_removed(event),
        EntryEventType::Updated => listener.entry_updated(event),
        EntryEventType::Evicted => listener.entry_evicted(event),
        EntryEventType::Expired => listener.entry_expired(event),
        EntryEventType::Merged
        | EntryEventType::Invalidation
        | EntryEventType::Loaded
        | EntryEventType::EvictAll
        | EntryEventType::ClearAll => listener.entry_other(event),
    }
    Ok(())
}

/// Decodes an entry event message and calls the matching map listener method.
/// Per-entry events are skipped.
pub fn dispatch_map_event(listener: &dyn MapListener, message: &ClientMessage) -> Result<()> {
    let (event_type, body) = decode_body(message)?;
    let event = MapEvent {
        event_type,
        number_of_affected_entries: body.number_of_affected_entries,
        member_uuid: body.member_uuid,
    };
    match event_type {
        EntryEventType::ClearAll => listener.map_cleared(event),
        EntryEventType::EvictAll => listener.map_evicted(event),
        _ => {}
    }
    Ok(())
}

fn decode_body(message: &ClientMessage) -> Result<(EntryEventType, EntryEventBody)> {
    let body = map_entry_listener::decode_entry_event(message)?;
    let event_type = EntryEventType::from_value(body.event_type).ok_or_else(|| {
        hazelcast_core::HazelcastError::Protocol(format!(
            "unknown entry event type {}",
            body.event_type
        ))
    })?;
    Ok((event_type, body))
}

/// Which entry events a map listener registration asks for.
#[derive(Debug, Clone)]
pub struct EntryListenerConfig {
    include_value: bool,
    flags: i32,
}

impl EntryListenerConfig {
    /// Listens to every event type, with values.
    pub fn new() -> Self {
        Self {
            include_value: true,
            flags: EntryEventType::ALL.iter().fold(0, |acc, t| acc | t.value()),
        }
    }

    /// Listens only to the given event types, with values.
    pub fn only(types: &[EntryEventType]) -> Self {
        Self {
            include_value: true,
            flags: types.iter().fold(0, |acc, t| acc | t.value()),
        }
    }

    /// Sets whether events carry values.
    pub fn include_value(mut self, include: bool) -> Self {
        self.include_value = include;
        self
    }

    /// Returns the listener flags mask.
    pub fn flags(&self) -> i32 {
        self.flags
    }

    /// Returns whether events carry values.
    pub fn includes_value(&self) -> bool {
        self.include_value
    }
}

impl Default for EntryListenerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration codec for map entry listeners.
#[derive(Debug, Clone)]
pub struct EntryListenerCodec {
    map_name: String,
    config: EntryListenerConfig,
}

impl EntryListenerCodec {
    /// Creates a codec registering on the map named `map_name`.
    pub fn new(map_name: impl Into<String>, config: EntryListenerConfig) -> Self {
        Self {
            map_name: map_name.into(),
            config,
        }
    }
}

impl ListenerMessageCodec for EntryListenerCodec {
    fn encode_add_request(&self, local_only: bool) -> ClientMessage {
        map_entry_listener::encode_add_request(&AddEntryListenerRequest {
            name: self.map_name.clone(),
            include_value: self.config.include_value,
            listener_flags: self.config.flags,
            local_only,
        })
    }

    fn decode_add_response(&self, response: &ClientMessage) -> Result<Uuid> {
        map_entry_listener::decode_add_response(response)
    }

    fn encode_remove_request(&self, registration_id: Uuid) -> ClientMessage {
        map_entry_listener::encode_remove_request(&self.map_name, registration_id)
    }
}
