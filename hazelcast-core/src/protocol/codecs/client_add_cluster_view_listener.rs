//! Cluster view listener: member list and partition table pushes.

use uuid::Uuid;

use super::custom::{decode_member_info, encode_member_info, MemberInfo};
use crate::error::{HazelcastError, Result};
use crate::protocol::builtin::{self, fixed};
use crate::protocol::constants::*;
use crate::protocol::ClientMessage;

const EVENT_VERSION_OFFSET: usize = EVENT_HEADER_SIZE;
const EVENT_INITIAL_FRAME_SIZE: usize = EVENT_VERSION_OFFSET + INT_SIZE_IN_BYTES;

/// An event pushed on the cluster view listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterViewEvent {
    /// The full member list at `version`.
    MembersView {
        /// Member list version.
        version: i32,
        /// Members in join order.
        members: Vec<MemberInfo>,
    },
    /// The full partition table at `version`.
    PartitionsView {
        /// Partition table version.
        version: i32,
        /// Owner UUID with the partitions it owns.
        partitions: Vec<(Uuid, Vec<i32>)>,
    },
}

/// Encodes the add-listener request.
pub fn encode_request() -> ClientMessage {
    let mut message = ClientMessage::new_request(
        CLIENT_ADD_CLUSTER_VIEW_LISTENER,
        PARTITION_ID_ANY,
        builtin::initial_content(REQUEST_HEADER_SIZE),
    );
    message.set_retryable(false);
    message
}

/// Encodes the empty add-listener response.
pub fn encode_response() -> ClientMessage {
    ClientMessage::new_response(
        CLIENT_ADD_CLUSTER_VIEW_LISTENER_RESPONSE,
        builtin::initial_content(RESPONSE_HEADER_SIZE),
    )
}

/// Encodes a members-view event.
pub fn encode_members_view_event(version: i32, members: &[MemberInfo]) -> ClientMessage {
    let mut initial = builtin::initial_content(EVENT_INITIAL_FRAME_SIZE);
    fixed::encode_i32(&mut initial, EVENT_VERSION_OFFSET, version);
    let mut message = ClientMessage::new_event(CLIENT_MEMBERS_VIEW_EVENT, initial);
    builtin::encode_list(&mut message, members, encode_member_info);
    message
}

/// Encodes a partitions-view event: a list of per-owner partition lists
/// followed by the owner UUIDs in the same order.
pub fn encode_partitions_view_event(version: i32, partitions: &[(Uuid, Vec<i32>)]) -> ClientMessage {
    let mut initial = builtin::initial_content(EVENT_INITIAL_FRAME_SIZE);
    fixed::encode_i32(&mut initial, EVENT_VERSION_OFFSET, version);
    let mut message = ClientMessage::new_event(CLIENT_PARTITIONS_VIEW_EVENT, initial);
    builtin::encode_list(&mut message, partitions, |m, (_, ids)| {
        builtin::encode_int_list(m, ids)
    });
    let owners: Vec<Uuid> = partitions.iter().map(|(owner, _)| *owner).collect();
    builtin::encode_uuid_list(&mut message, &owners);
    message
}

/// Decodes a cluster view event. Returns `Ok(None)` for other message types.
pub fn decode_event(message: &ClientMessage) -> Result<Option<ClusterViewEvent>> {
    let message_type = match message.message_type() {
        Some(t @ (CLIENT_MEMBERS_VIEW_EVENT | CLIENT_PARTITIONS_VIEW_EVENT)) => t,
        _ => return Ok(None),
    };

    let mut iter = message.iter();
    let version = fixed::decode_i32(iter.next_frame()?.content(), EVENT_VERSION_OFFSET)?;
    if message_type == CLIENT_MEMBERS_VIEW_EVENT {
        let members = builtin::decode_list(&mut iter, decode_member_info)?;
        return Ok(Some(ClusterViewEvent::MembersView { version, members }));
    }

    let partition_lists = builtin::decode_list(&mut iter, builtin::decode_int_list)?;
    let owners = builtin::decode_uuid_list(&mut iter)?;
    if owners.len() != partition_lists.len() {
        return Err(HazelcastError::Protocol(format!(
            "partitions view has {} owners but {} partition lists",
            owners.len(),
            partition_lists.len()
        )));
    }
    Ok(Some(ClusterViewEvent::PartitionsView {
        version,
        partitions: owners.into_iter().zip(partition_lists).collect(),
    }))
}
