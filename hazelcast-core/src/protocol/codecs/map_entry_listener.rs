//! Map entry listener registration, removal and the entry event body.
//!
//! The entry event layout is shared by every map-like structure, so this is
//! also the codec the client's entry event handlers decode with.

use bytes::Bytes;
use uuid::Uuid;

use crate::error::{HazelcastError, Result};
use crate::protocol::builtin::{self, fixed};
use crate::protocol::constants::*;
use crate::protocol::ClientMessage;

/// Map add-entry-listener request.
pub const MAP_ADD_ENTRY_LISTENER: i32 = 0x011900;
/// Map add-entry-listener response.
pub const MAP_ADD_ENTRY_LISTENER_RESPONSE: i32 = 0x011901;
/// Map entry event.
pub const MAP_ENTRY_EVENT: i32 = 0x011902;
/// Map remove-entry-listener request.
pub const MAP_REMOVE_ENTRY_LISTENER: i32 = 0x011A00;
/// Map remove-entry-listener response.
pub const MAP_REMOVE_ENTRY_LISTENER_RESPONSE: i32 = 0x011A01;

const ADD_INCLUDE_VALUE_OFFSET: usize = REQUEST_HEADER_SIZE;
const ADD_LISTENER_FLAGS_OFFSET: usize = ADD_INCLUDE_VALUE_OFFSET + BOOLEAN_SIZE_IN_BYTES;
const ADD_LOCAL_ONLY_OFFSET: usize = ADD_LISTENER_FLAGS_OFFSET + INT_SIZE_IN_BYTES;
const ADD_INITIAL_FRAME_SIZE: usize = ADD_LOCAL_ONLY_OFFSET + BOOLEAN_SIZE_IN_BYTES;
const ADD_RESPONSE_UUID_OFFSET: usize = RESPONSE_HEADER_SIZE;
const ADD_RESPONSE_INITIAL_FRAME_SIZE: usize = ADD_RESPONSE_UUID_OFFSET + UUID_SIZE_IN_BYTES;

const REMOVE_REGISTRATION_ID_OFFSET: usize = REQUEST_HEADER_SIZE;
const REMOVE_INITIAL_FRAME_SIZE: usize = REMOVE_REGISTRATION_ID_OFFSET + UUID_SIZE_IN_BYTES;
const REMOVE_RESPONSE_OFFSET: usize = RESPONSE_HEADER_SIZE;
const REMOVE_RESPONSE_INITIAL_FRAME_SIZE: usize = REMOVE_RESPONSE_OFFSET + BOOLEAN_SIZE_IN_BYTES;

const EVENT_TYPE_OFFSET: usize = EVENT_HEADER_SIZE;
const EVENT_UUID_OFFSET: usize = EVENT_TYPE_OFFSET + INT_SIZE_IN_BYTES;
const EVENT_AFFECTED_ENTRIES_OFFSET: usize = EVENT_UUID_OFFSET + UUID_SIZE_IN_BYTES;
const EVENT_INITIAL_FRAME_SIZE: usize = EVENT_AFFECTED_ENTRIES_OFFSET + INT_SIZE_IN_BYTES;

/// Parameters of an add-entry-listener request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddEntryListenerRequest {
    /// Map name.
    pub name: String,
    /// Whether events carry values.
    pub include_value: bool,
    /// Bit set of entry event types to receive.
    pub listener_flags: i32,
    /// Only events for entries owned by the receiving member.
    pub local_only: bool,
}

/// Encodes an add-entry-listener request.
pub fn encode_add_request(request: &AddEntryListenerRequest) -> ClientMessage {
    let mut initial = builtin::initial_content(ADD_INITIAL_FRAME_SIZE);
    fixed::encode_bool(&mut initial, ADD_INCLUDE_VALUE_OFFSET, request.include_value);
    fixed::encode_i32(&mut initial, ADD_LISTENER_FLAGS_OFFSET, request.listener_flags);
    fixed::encode_bool(&mut initial, ADD_LOCAL_ONLY_OFFSET, request.local_only);
    let mut message = ClientMessage::new_request(MAP_ADD_ENTRY_LISTENER, PARTITION_ID_ANY, initial);
    message.set_retryable(false);
    builtin::encode_string(&mut message, &request.name);
    message
}

/// Decodes an add-entry-listener request.
pub fn decode_add_request(message: &ClientMessage) -> Result<AddEntryListenerRequest> {
    let mut iter = message.iter();
    let initial = iter.next_frame()?.content();
    Ok(AddEntryListenerRequest {
        include_value: fixed::decode_bool(initial, ADD_INCLUDE_VALUE_OFFSET)?,
        listener_flags: fixed::decode_i32(initial, ADD_LISTENER_FLAGS_OFFSET)?,
        local_only: fixed::decode_bool(initial, ADD_LOCAL_ONLY_OFFSET)?,
        name: builtin::decode_string(&mut iter)?,
    })
}

/// Encodes the add-entry-listener response carrying the registration id.
pub fn encode_add_response(registration_id: Uuid) -> ClientMessage {
    let mut initial = builtin::initial_content(ADD_RESPONSE_INITIAL_FRAME_SIZE);
    fixed::encode_uuid(&mut initial, ADD_RESPONSE_UUID_OFFSET, Some(registration_id));
    ClientMessage::new_response(MAP_ADD_ENTRY_LISTENER_RESPONSE, initial)
}

/// Decodes the registration id from an add-entry-listener response.
pub fn decode_add_response(message: &ClientMessage) -> Result<Uuid> {
    let initial = message
        .initial_frame()
        .ok_or_else(|| HazelcastError::Protocol("empty add listener response".to_string()))?;
    fixed::decode_uuid(initial.content(), ADD_RESPONSE_UUID_OFFSET)?.ok_or_else(|| {
        HazelcastError::Protocol("add listener response without registration id".to_string())
    })
}

/// Encodes a remove-entry-listener request.
pub fn encode_remove_request(name: &str, registration_id: Uuid) -> ClientMessage {
    let mut initial = builtin::initial_content(REMOVE_INITIAL_FRAME_SIZE);
    fixed::encode_uuid(&mut initial, REMOVE_REGISTRATION_ID_OFFSET, Some(registration_id));
    let mut message =
        ClientMessage::new_request(MAP_REMOVE_ENTRY_LISTENER, PARTITION_ID_ANY, initial);
    message.set_retryable(true);
    builtin::encode_string(&mut message, name);
    message
}

/// Decodes a remove-entry-listener request into `(name, registration id)`.
pub fn decode_remove_request(message: &ClientMessage) -> Result<(String, Uuid)> {
    let mut iter = message.iter();
    let registration_id = fixed::decode_uuid(
        iter.next_frame()?.content(),
        REMOVE_REGISTRATION_ID_OFFSET,
    )?
    .ok_or_else(|| HazelcastError::Protocol("remove listener without id".to_string()))?;
    Ok((builtin::decode_string(&mut iter)?, registration_id))
}

/// Encodes the remove-entry-listener response.
pub fn encode_remove_response(removed: bool) -> ClientMessage {
    let mut initial = builtin::initial_content(REMOVE_RESPONSE_INITIAL_FRAME_SIZE);
    fixed::encode_bool(&mut initial, REMOVE_RESPONSE_OFFSET, removed);
    ClientMessage::new_response(MAP_REMOVE_ENTRY_LISTENER_RESPONSE, initial)
}

/// Decodes whether the member removed the registration.
pub fn decode_remove_response(message: &ClientMessage) -> Result<bool> {
    let initial = message
        .initial_frame()
        .ok_or_else(|| HazelcastError::Protocol("empty remove listener response".to_string()))?;
    fixed::decode_bool(initial.content(), REMOVE_RESPONSE_OFFSET)
}

/// Raw body of an entry event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryEventBody {
    /// Entry event type bit.
    pub event_type: i32,
    /// Member that produced the event.
    pub member_uuid: Option<Uuid>,
    /// Entries affected by a map-wide event.
    pub number_of_affected_entries: i32,
    /// Serialized key.
    pub key: Option<Bytes>,
    /// Serialized new value.
    pub value: Option<Bytes>,
    /// Serialized previous value.
    pub old_value: Option<Bytes>,
    /// Serialized merging value.
    pub merging_value: Option<Bytes>,
}

/// Encodes an entry event addressed to the registration with `correlation_id`.
pub fn encode_entry_event(correlation_id: i64, body: &EntryEventBody) -> ClientMessage {
    let mut initial = builtin::initial_content(EVENT_INITIAL_FRAME_SIZE);
    fixed::encode_i32(&mut initial, EVENT_TYPE_OFFSET, body.event_type);
    fixed::encode_uuid(&mut initial, EVENT_UUID_OFFSET, body.member_uuid);
    fixed::encode_i32(
        &mut initial,
        EVENT_AFFECTED_ENTRIES_OFFSET,
        body.number_of_affected_entries,
    );
    let mut message = ClientMessage::new_event(MAP_ENTRY_EVENT, initial);
    message.set_correlation_id(correlation_id);
    for data in [&body.key, &body.value, &body.old_value, &body.merging_value] {
        builtin::encode_nullable(&mut message, data.as_deref(), builtin::encode_data);
    }
    message
}

/// Decodes an entry event body.
pub fn decode_entry_event(message: &ClientMessage) -> Result<EntryEventBody> {
    let mut iter = message.iter();
    let initial = iter.next_frame()?.content();
    Ok(EntryEventBody {
        event_type: fixed::decode_i32(initial, EVENT_TYPE_OFFSET)?,
        member_uuid: fixed::decode_uuid(initial, EVENT_UUID_OFFSET)?,
        number_of_affected_entries: fixed::decode_i32(initial, EVENT_AFFECTED_ENTRIES_OFFSET)?,
        key: builtin::decode_nullable(&mut iter, builtin::decode_data)?,
        value: builtin::decode_nullable(&mut iter, builtin::decode_data)?,
        old_value: builtin::decode_nullable(&mut iter, builtin::decode_data)?,
        merging_value: builtin::decode_nullable(&mut iter, builtin::decode_data)?,
    })
}
