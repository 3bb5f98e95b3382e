//! Client authentication request and response.

use uuid::Uuid;

use super::custom::{decode_address, encode_address, Address};
use crate::error::{HazelcastError, Result};
use crate::protocol::builtin::{self, fixed};
use crate::protocol::constants::*;
use crate::protocol::ClientMessage;

const REQUEST_UUID_OFFSET: usize = REQUEST_HEADER_SIZE;
const REQUEST_SERIALIZATION_VERSION_OFFSET: usize = REQUEST_UUID_OFFSET + UUID_SIZE_IN_BYTES;
const REQUEST_INITIAL_FRAME_SIZE: usize = REQUEST_SERIALIZATION_VERSION_OFFSET + BYTE_SIZE_IN_BYTES;

const RESPONSE_STATUS_OFFSET: usize = RESPONSE_HEADER_SIZE;
const RESPONSE_MEMBER_UUID_OFFSET: usize = RESPONSE_STATUS_OFFSET + BYTE_SIZE_IN_BYTES;
const RESPONSE_SERIALIZATION_VERSION_OFFSET: usize = RESPONSE_MEMBER_UUID_OFFSET + UUID_SIZE_IN_BYTES;
const RESPONSE_PARTITION_COUNT_OFFSET: usize =
    RESPONSE_SERIALIZATION_VERSION_OFFSET + BYTE_SIZE_IN_BYTES;
const RESPONSE_CLUSTER_ID_OFFSET: usize = RESPONSE_PARTITION_COUNT_OFFSET + INT_SIZE_IN_BYTES;
const RESPONSE_FAILOVER_SUPPORTED_OFFSET: usize = RESPONSE_CLUSTER_ID_OFFSET + UUID_SIZE_IN_BYTES;
const RESPONSE_INITIAL_FRAME_SIZE: usize = RESPONSE_FAILOVER_SUPPORTED_OFFSET + BOOLEAN_SIZE_IN_BYTES;

/// Client type reported to the cluster.
pub const CLIENT_TYPE: &str = "RST";

/// Parameters of an authentication request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequest {
    /// Cluster the client expects to join.
    pub cluster_name: String,
    /// Optional username.
    pub username: Option<String>,
    /// Optional password.
    pub password: Option<String>,
    /// Client instance UUID.
    pub client_uuid: Uuid,
    /// Client type identifier.
    pub client_type: String,
    /// Serialization version spoken by the client.
    pub serialization_version: u8,
    /// Client library version.
    pub client_version: String,
    /// Client instance name.
    pub client_name: String,
    /// Client labels.
    pub labels: Vec<String>,
}

/// Authentication outcome reported by the member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationStatus {
    /// Accepted.
    Authenticated,
    /// Wrong cluster name or credentials.
    CredentialsFailed,
    /// Client and member speak different serialization versions.
    SerializationVersionMismatch,
    /// The member does not accept this client (blacklisted or wrong cluster).
    NotAllowedInCluster,
}

impl AuthenticationStatus {
    /// Returns the wire value.
    pub fn code(self) -> u8 {
        match self {
            Self::Authenticated => 0,
            Self::CredentialsFailed => 1,
            Self::SerializationVersionMismatch => 2,
            Self::NotAllowedInCluster => 3,
        }
    }

    /// Parses the wire value.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Authenticated),
            1 => Ok(Self::CredentialsFailed),
            2 => Ok(Self::SerializationVersionMismatch),
            3 => Ok(Self::NotAllowedInCluster),
            other => Err(HazelcastError::Protocol(format!(
                "unknown authentication status {}",
                other
            ))),
        }
    }
}

/// Decoded authentication response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResponse {
    /// Authentication outcome.
    pub status: AuthenticationStatus,
    /// Address of the member that answered.
    pub address: Option<Address>,
    /// UUID of the member that answered.
    pub member_uuid: Option<Uuid>,
    /// Serialization version of the member.
    pub serialization_version: u8,
    /// Server library version.
    pub server_version: String,
    /// Number of partitions in the cluster.
    pub partition_count: i32,
    /// Identity of the cluster; changes when the client lands on another cluster.
    pub cluster_id: Option<Uuid>,
    /// Whether the member supports blue/green failover.
    pub failover_supported: bool,
}

/// Encodes an authentication request.
pub fn encode_request(request: &AuthenticationRequest) -> ClientMessage {
    let mut initial = builtin::initial_content(REQUEST_INITIAL_FRAME_SIZE);
    fixed::encode_uuid(&mut initial, REQUEST_UUID_OFFSET, Some(request.client_uuid));
    fixed::encode_u8(
        &mut initial,
        REQUEST_SERIALIZATION_VERSION_OFFSET,
        request.serialization_version,
    );
    let mut message = ClientMessage::new_request(CLIENT_AUTHENTICATION, PARTITION_ID_ANY, initial);
    message.set_retryable(true);

    builtin::encode_string(&mut message, &request.cluster_name);
    builtin::encode_nullable(&mut message, request.username.as_deref(), builtin::encode_string);
    builtin::encode_nullable(&mut message, request.password.as_deref(), builtin::encode_string);
    builtin::encode_string(&mut message, &request.client_type);
    builtin::encode_string(&mut message, &request.client_version);
    builtin::encode_string(&mut message, &request.client_name);
    builtin::encode_list(&mut message, &request.labels, |m, label| {
        builtin::encode_string(m, label)
    });
    message
}

/// Decodes an authentication request.
pub fn decode_request(message: &ClientMessage) -> Result<AuthenticationRequest> {
    let mut iter = message.iter();
    let initial = iter.next_frame()?.content();
    let client_uuid = fixed::decode_uuid(initial, REQUEST_UUID_OFFSET)?
        .ok_or_else(|| HazelcastError::Protocol("authentication without client uuid".into()))?;
    let serialization_version = fixed::decode_u8(initial, REQUEST_SERIALIZATION_VERSION_OFFSET)?;
    Ok(AuthenticationRequest {
        cluster_name: builtin::decode_string(&mut iter)?,
        username: builtin::decode_nullable(&mut iter, builtin::decode_string)?,
        password: builtin::decode_nullable(&mut iter, builtin::decode_string)?,
        client_uuid,
        client_type: builtin::decode_string(&mut iter)?,
        serialization_version,
        client_version: builtin::decode_string(&mut iter)?,
        client_name: builtin::decode_string(&mut iter)?,
        labels: builtin::decode_list(&mut iter, builtin::decode_string)?,
    })
}

/// Encodes an authentication response.
pub fn encode_response(response: &AuthenticationResponse) -> ClientMessage {
    let mut initial = builtin::initial_content(RESPONSE_INITIAL_FRAME_SIZE);
    fixed::encode_u8(&mut initial, RESPONSE_STATUS_OFFSET, response.status.code());
    fixed::encode_uuid(&mut initial, RESPONSE_MEMBER_UUID_OFFSET, response.member_uuid);
    fixed::encode_u8(
        &mut initial,
        RESPONSE_SERIALIZATION_VERSION_OFFSET,
        response.serialization_version,
    );
    fixed::encode_i32(&mut initial, RESPONSE_PARTITION_COUNT_OFFSET, response.partition_count);
    fixed::encode_uuid(&mut initial, RESPONSE_CLUSTER_ID_OFFSET, response.cluster_id);
    fixed::encode_bool(
        &mut initial,
        RESPONSE_FAILOVER_SUPPORTED_OFFSET,
        response.failover_supported,
    );
    let mut message = ClientMessage::new_response(CLIENT_AUTHENTICATION_RESPONSE, initial);
    builtin::encode_nullable(&mut message, response.address.as_ref(), encode_address);
    builtin::encode_string(&mut message, &response.server_version);
    message
}

/// Decodes an authentication response.
pub fn decode_response(message: &ClientMessage) -> Result<AuthenticationResponse> {
    let mut iter = message.iter();
    let initial = iter.next_frame()?.content();
    let status = AuthenticationStatus::from_code(fixed::decode_u8(initial, RESPONSE_STATUS_OFFSET)?)?;
    let member_uuid = fixed::decode_uuid(initial, RESPONSE_MEMBER_UUID_OFFSET)?;
    let serialization_version = fixed::decode_u8(initial, RESPONSE_SERIALIZATION_VERSION_OFFSET)?;
    let partition_count = fixed::decode_i32(initial, RESPONSE_PARTITION_COUNT_OFFSET)?;
    let cluster_id = fixed::decode_uuid(initial, RESPONSE_CLUSTER_ID_OFFSET)?;
    let failover_supported = fixed::decode_bool(initial, RESPONSE_FAILOVER_SUPPORTED_OFFSET)?;
    let address = builtin::decode_nullable(&mut iter, decode_address)?;
    let server_version = builtin::decode_string(&mut iter)?;
    Ok(AuthenticationResponse {
        status,
        address,
        member_uuid,
        serialization_version,
        server_version,
        partition_count,
        cluster_id,
        failover_supported,
    })
}
