//! Codecs for structured values nested inside messages.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use super::super::builtin::{self, fixed};
use super::super::client_message::{ClientMessage, ForwardFrameIterator};
use super::super::constants::*;
use super::super::frame::Frame;
use crate::error::{HazelcastError, Result, ServerError, StackTraceElement};

/// A member's network address as the cluster reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// Host name or IP literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Address {
    /// Creates an address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<std::net::SocketAddr> for Address {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

const ADDRESS_PORT_OFFSET: usize = 0;
const ADDRESS_INITIAL_FRAME_SIZE: usize = ADDRESS_PORT_OFFSET + INT_SIZE_IN_BYTES;

/// Appends an address structure.
pub fn encode_address(message: &mut ClientMessage, address: &Address) {
    message.add_frame(Frame::new_begin_frame());
    let mut initial = builtin::initial_content(ADDRESS_INITIAL_FRAME_SIZE);
    fixed::encode_i32(&mut initial, ADDRESS_PORT_OFFSET, i32::from(address.port));
    message.add_frame(Frame::with_content(initial));
    builtin::encode_string(message, &address.host);
    message.add_frame(Frame::new_end_frame());
}

/// Reads an address structure.
pub fn decode_address(iter: &mut ForwardFrameIterator<'_>) -> Result<Address> {
    builtin::expect_begin(iter)?;
    let initial = iter.next_frame()?;
    let port = fixed::decode_i32(initial.content(), ADDRESS_PORT_OFFSET)?;
    let host = builtin::decode_string(iter)?;
    iter.fast_forward_to_end_frame()?;
    let port = u16::try_from(port)
        .map_err(|_| HazelcastError::Protocol(format!("invalid port {} for {}", port, host)))?;
    Ok(Address { host, port })
}

/// Codebase version of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Patch version.
    pub patch: u8,
}

impl fmt::Display for MemberVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

const VERSION_MAJOR_OFFSET: usize = 0;
const VERSION_MINOR_OFFSET: usize = VERSION_MAJOR_OFFSET + BYTE_SIZE_IN_BYTES;
const VERSION_PATCH_OFFSET: usize = VERSION_MINOR_OFFSET + BYTE_SIZE_IN_BYTES;
const VERSION_INITIAL_FRAME_SIZE: usize = VERSION_PATCH_OFFSET + BYTE_SIZE_IN_BYTES;

fn encode_member_version(message: &mut ClientMessage, version: &MemberVersion) {
    message.add_frame(Frame::new_begin_frame());
    let mut initial = builtin::initial_content(VERSION_INITIAL_FRAME_SIZE);
    fixed::encode_u8(&mut initial, VERSION_MAJOR_OFFSET, version.major);
    fixed::encode_u8(&mut initial, VERSION_MINOR_OFFSET, version.minor);
    fixed::encode_u8(&mut initial, VERSION_PATCH_OFFSET, version.patch);
    message.add_frame(Frame::with_content(initial));
    message.add_frame(Frame::new_end_frame());
}

fn decode_member_version(iter: &mut ForwardFrameIterator<'_>) -> Result<MemberVersion> {
    builtin::expect_begin(iter)?;
    let initial = iter.next_frame()?.content();
    let version = MemberVersion {
        major: fixed::decode_u8(initial, VERSION_MAJOR_OFFSET)?,
        minor: fixed::decode_u8(initial, VERSION_MINOR_OFFSET)?,
        patch: fixed::decode_u8(initial, VERSION_PATCH_OFFSET)?,
    };
    iter.fast_forward_to_end_frame()?;
    Ok(version)
}

/// A member entry of a members-view event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    /// Member UUID.
    pub uuid: Uuid,
    /// Address clients connect to.
    pub address: Address,
    /// Lite members own no partitions.
    pub lite_member: bool,
    /// Member attributes.
    pub attributes: HashMap<String, String>,
    /// Member codebase version.
    pub version: MemberVersion,
}

const MEMBER_UUID_OFFSET: usize = 0;
const MEMBER_LITE_OFFSET: usize = MEMBER_UUID_OFFSET + UUID_SIZE_IN_BYTES;
const MEMBER_INITIAL_FRAME_SIZE: usize = MEMBER_LITE_OFFSET + BOOLEAN_SIZE_IN_BYTES;

/// Appends a member info structure.
pub fn encode_member_info(message: &mut ClientMessage, member: &MemberInfo) {
    message.add_frame(Frame::new_begin_frame());
    let mut initial = builtin::initial_content(MEMBER_INITIAL_FRAME_SIZE);
    fixed::encode_uuid(&mut initial, MEMBER_UUID_OFFSET, Some(member.uuid));
    fixed::encode_bool(&mut initial, MEMBER_LITE_OFFSET, member.lite_member);
    message.add_frame(Frame::with_content(initial));
    encode_address(message, &member.address);
    builtin::encode_string_map(message, &member.attributes);
    encode_member_version(message, &member.version);
    message.add_frame(Frame::new_end_frame());
}

/// Reads a member info structure, skipping fields newer members append.
pub fn decode_member_info(iter: &mut ForwardFrameIterator<'_>) -> Result<MemberInfo> {
    builtin::expect_begin(iter)?;
    let initial = iter.next_frame()?.content();
    let uuid = fixed::decode_uuid(initial, MEMBER_UUID_OFFSET)?
        .ok_or_else(|| HazelcastError::Protocol("member without uuid".to_string()))?;
    let lite_member = fixed::decode_bool(initial, MEMBER_LITE_OFFSET)?;
    let address = decode_address(iter)?;
    let attributes = builtin::decode_string_map(iter)?;
    let version = decode_member_version(iter)?;
    iter.fast_forward_to_end_frame()?;
    Ok(MemberInfo {
        uuid,
        address,
        lite_member,
        attributes,
        version,
    })
}

const STACK_LINE_OFFSET: usize = 0;
const STACK_INITIAL_FRAME_SIZE: usize = STACK_LINE_OFFSET + INT_SIZE_IN_BYTES;

fn encode_stack_trace_element(message: &mut ClientMessage, element: &StackTraceElement) {
    message.add_frame(Frame::new_begin_frame());
    let mut initial = builtin::initial_content(STACK_INITIAL_FRAME_SIZE);
    fixed::encode_i32(&mut initial, STACK_LINE_OFFSET, element.line_number);
    message.add_frame(Frame::with_content(initial));
    builtin::encode_string(message, &element.class_name);
    builtin::encode_string(message, &element.method_name);
    builtin::encode_nullable(message, element.file_name.as_deref(), builtin::encode_string);
    message.add_frame(Frame::new_end_frame());
}

fn decode_stack_trace_element(iter: &mut ForwardFrameIterator<'_>) -> Result<StackTraceElement> {
    builtin::expect_begin(iter)?;
    let line_number = fixed::decode_i32(iter.next_frame()?.content(), STACK_LINE_OFFSET)?;
    let class_name = builtin::decode_string(iter)?;
    let method_name = builtin::decode_string(iter)?;
    let file_name = builtin::decode_nullable(iter, builtin::decode_string)?;
    iter.fast_forward_to_end_frame()?;
    Ok(StackTraceElement {
        class_name,
        method_name,
        file_name,
        line_number,
    })
}

const ERROR_CODE_OFFSET: usize = 0;
const ERROR_INITIAL_FRAME_SIZE: usize = ERROR_CODE_OFFSET + INT_SIZE_IN_BYTES;

/// Appends one error holder (the error without its causes).
pub fn encode_error_holder(message: &mut ClientMessage, error: &ServerError) {
    message.add_frame(Frame::new_begin_frame());
    let mut initial = builtin::initial_content(ERROR_INITIAL_FRAME_SIZE);
    fixed::encode_i32(&mut initial, ERROR_CODE_OFFSET, error.error_code);
    message.add_frame(Frame::with_content(initial));
    builtin::encode_string(message, &error.class_name);
    builtin::encode_nullable(message, error.message.as_deref(), builtin::encode_string);
    builtin::encode_list(message, &error.stack_trace, encode_stack_trace_element);
    message.add_frame(Frame::new_end_frame());
}

/// Reads one error holder.
pub fn decode_error_holder(iter: &mut ForwardFrameIterator<'_>) -> Result<ServerError> {
    builtin::expect_begin(iter)?;
    let error_code = fixed::decode_i32(iter.next_frame()?.content(), ERROR_CODE_OFFSET)?;
    let class_name = builtin::decode_string(iter)?;
    let message = builtin::decode_nullable(iter, builtin::decode_string)?;
    let stack_trace = builtin::decode_list(iter, decode_stack_trace_element)?;
    iter.fast_forward_to_end_frame()?;
    Ok(ServerError {
        error_code,
        class_name,
        message,
        stack_trace,
        causes: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn after_header(message: &ClientMessage) -> ForwardFrameIterator<'_> {
        let mut iter = message.iter();
        iter.next_frame().unwrap();
        iter
    }

    fn sample_member() -> MemberInfo {
        let mut attributes = HashMap::new();
        attributes.insert("rack".to_string(), "r1".to_string());
        MemberInfo {
            uuid: Uuid::new_v4(),
            address: Address::new("10.0.0.5", 5701),
            lite_member: false,
            attributes,
            version: MemberVersion {
                major: 5,
                minor: 3,
                patch: 1,
            },
        }
    }

    #[test]
    fn test_member_info_roundtrip() {
        let member = sample_member();
        let mut msg = ClientMessage::create_for_encode(CLIENT_PING, 0);
        encode_member_info(&mut msg, &member);

        let mut iter = after_header(&msg);
        assert_eq!(decode_member_info(&mut iter).unwrap(), member);
        assert!(!iter.has_next());
    }

    #[test]
    fn test_member_info_skips_unknown_trailing_fields() {
        let member = sample_member();
        let mut msg = ClientMessage::create_for_encode(CLIENT_PING, 0);
        encode_member_info(&mut msg, &member);
        let mut frames = msg.into_frames();
        let end = frames.pop().unwrap();
        frames.push(Frame::with_content(&b"future field"[..]));
        frames.push(Frame::new_begin_frame());
        frames.push(Frame::new_end_frame());
        frames.push(end);
        frames.push(Frame::with_content(&b"next"[..]));
        let msg = ClientMessage::from_frames(frames);

        let mut iter = after_header(&msg);
        assert_eq!(decode_member_info(&mut iter).unwrap(), member);
        assert_eq!(builtin::decode_string(&mut iter).unwrap(), "next");
    }

    #[test]
    fn test_address_display() {
        assert_eq!(Address::new("localhost", 5701).to_string(), "localhost:5701");
    }

    #[test]
    fn test_error_holder_roundtrip() {
        let mut error = ServerError::new(39, "PartitionMigratingException", Some("moving".into()));
        error.stack_trace.push(StackTraceElement {
            class_name: "Op".into(),
            method_name: "run".into(),
            file_name: None,
            line_number: -1,
        });

        let mut msg = ClientMessage::create_for_encode(CLIENT_PING, 0);
        encode_error_holder(&mut msg, &error);

        let mut iter = after_header(&msg);
        assert_eq!(decode_error_holder(&mut iter).unwrap(), error);
    }
}
