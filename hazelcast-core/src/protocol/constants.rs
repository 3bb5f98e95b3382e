//! Protocol constants for the Hazelcast Open Binary Protocol.

/// Bytes sent once by the client before any message on a new connection.
pub const CLIENT_BINARY_PROTOCOL: &[u8; 3] = b"CP2";

/// Size of the frame length field in bytes.
pub const SIZE_OF_FRAME_LENGTH_FIELD: usize = 4;

/// Size of the frame flags field in bytes.
pub const SIZE_OF_FRAME_FLAGS_FIELD: usize = 2;

/// Total frame header size (length + flags). The length field counts it.
pub const FRAME_HEADER_SIZE: usize = SIZE_OF_FRAME_LENGTH_FIELD + SIZE_OF_FRAME_FLAGS_FIELD;

/// Largest frame length the protocol can express; the length field is a
/// signed 32-bit integer.
pub const MAX_FRAME_LENGTH: usize = i32::MAX as usize;

/// Marks the first frame of a fragment sequence.
pub const BEGIN_FRAGMENT_FLAG: u16 = 1 << 15;

/// Marks the first frame of the last fragment of a sequence.
pub const END_FRAGMENT_FLAG: u16 = 1 << 14;

/// Marks the last frame of a wire message.
pub const IS_FINAL_FLAG: u16 = 1 << 13;

/// Opens a nested data structure.
pub const BEGIN_DATA_STRUCTURE_FLAG: u16 = 1 << 12;

/// Closes a nested data structure.
pub const END_DATA_STRUCTURE_FLAG: u16 = 1 << 11;

/// The frame stands for a null value.
pub const IS_NULL_FLAG: u16 = 1 << 10;

/// The message is an event pushed by a member.
pub const IS_EVENT_FLAG: u16 = 1 << 9;

/// The request asks for backup acknowledgements.
pub const BACKUP_AWARE_FLAG: u16 = 1 << 8;

/// The message is a backup acknowledgement event.
pub const BACKUP_EVENT_FLAG: u16 = 1 << 7;

/// Initial frame flags of a message that is not fragmented.
pub const UNFRAGMENTED_MESSAGE: u16 = BEGIN_FRAGMENT_FLAG | END_FRAGMENT_FLAG;

/// Default frame flags (no special flags set).
pub const DEFAULT_FLAGS: u16 = 0;

/// Size of a serialized byte.
pub const BYTE_SIZE_IN_BYTES: usize = 1;

/// Size of a serialized boolean.
pub const BOOLEAN_SIZE_IN_BYTES: usize = 1;

/// Size of a serialized int.
pub const INT_SIZE_IN_BYTES: usize = 4;

/// Size of a serialized long.
pub const LONG_SIZE_IN_BYTES: usize = 8;

/// Size of a serialized UUID: null flag followed by two longs.
pub const UUID_SIZE_IN_BYTES: usize = BOOLEAN_SIZE_IN_BYTES + 2 * LONG_SIZE_IN_BYTES;

/// Offset of message type in initial frame content.
pub const TYPE_FIELD_OFFSET: usize = 0;

/// Offset of correlation ID in initial frame content.
pub const CORRELATION_ID_OFFSET: usize = TYPE_FIELD_OFFSET + INT_SIZE_IN_BYTES;

/// Offset of partition ID in request and event initial frames.
pub const PARTITION_ID_OFFSET: usize = CORRELATION_ID_OFFSET + LONG_SIZE_IN_BYTES;

/// Size of the request initial frame header.
pub const REQUEST_HEADER_SIZE: usize = PARTITION_ID_OFFSET + INT_SIZE_IN_BYTES;

/// Size of the event initial frame header.
pub const EVENT_HEADER_SIZE: usize = REQUEST_HEADER_SIZE;

/// Offset of backup acks count in response initial frame.
pub const RESPONSE_BACKUP_ACKS_OFFSET: usize = CORRELATION_ID_OFFSET + LONG_SIZE_IN_BYTES;

/// Size of the response initial frame header.
pub const RESPONSE_HEADER_SIZE: usize = RESPONSE_BACKUP_ACKS_OFFSET + BYTE_SIZE_IN_BYTES;

/// Smallest initial frame that still carries type and correlation id.
pub const MIN_INITIAL_FRAME_SIZE: usize = CORRELATION_ID_OFFSET + LONG_SIZE_IN_BYTES;

/// Offset of the fragmentation id in a fragment header frame.
pub const FRAGMENTATION_ID_OFFSET: usize = 0;

/// Partition ID indicating no specific partition (-1).
pub const PARTITION_ID_ANY: i32 = -1;

/// Serialization version negotiated during authentication.
pub const SERIALIZATION_VERSION: u8 = 1;

// Message types handled by the invocation engine itself.

/// Error response message type.
pub const ERROR_MESSAGE_TYPE: i32 = 0x000000;

/// Client authentication request.
pub const CLIENT_AUTHENTICATION: i32 = 0x000100;

/// Client authentication response.
pub const CLIENT_AUTHENTICATION_RESPONSE: i32 = 0x000101;

/// Add cluster view listener request.
pub const CLIENT_ADD_CLUSTER_VIEW_LISTENER: i32 = 0x000300;

/// Add cluster view listener response.
pub const CLIENT_ADD_CLUSTER_VIEW_LISTENER_RESPONSE: i32 = 0x000301;

/// Members view event.
pub const CLIENT_MEMBERS_VIEW_EVENT: i32 = 0x000302;

/// Partitions view event.
pub const CLIENT_PARTITIONS_VIEW_EVENT: i32 = 0x000303;

/// Client ping request.
pub const CLIENT_PING: i32 = 0x000B00;

/// Client ping response.
pub const CLIENT_PING_RESPONSE: i32 = 0x000B01;
