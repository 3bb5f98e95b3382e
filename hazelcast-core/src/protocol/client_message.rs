//! ClientMessage type for multi-frame Hazelcast protocol messages.

use bytes::{BufMut, BytesMut};

use super::constants::*;
use super::frame::Frame;
use crate::error::{HazelcastError, Result};

/// A client message composed of one or more frames.
///
/// The first frame is the "initial frame" containing the message header
/// (type, correlation ID, then partition ID for requests and events or the
/// backup acks count for responses) followed by the message-specific fixed
/// size fields. Additional frames carry the variable-size payload.
///
/// Two messages are equal when their frames are equal; the retryable flag is
/// local metadata that never reaches the wire.
#[derive(Debug, Clone, Default)]
pub struct ClientMessage {
    frames: Vec<Frame>,
    retryable: bool,
}

impl PartialEq for ClientMessage {
    fn eq(&self, other: &Self) -> bool {
        self.frames == other.frames
    }
}

impl Eq for ClientMessage {}

impl ClientMessage {
    /// Creates a new empty client message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a request whose initial frame holds only the header.
    pub fn create_for_encode(message_type: i32, partition_id: i32) -> Self {
        Self::new_request(message_type, partition_id, BytesMut::zeroed(REQUEST_HEADER_SIZE))
    }

    /// Creates a request from initial frame content laid out as
    /// `[header | fixed fields]`. The header region is overwritten; the
    /// correlation id is left at zero until the invocation assigns one.
    pub fn new_request(message_type: i32, partition_id: i32, content: BytesMut) -> Self {
        let mut content = with_min_len(content, REQUEST_HEADER_SIZE);
        write_i32(&mut content, TYPE_FIELD_OFFSET, message_type);
        write_i64(&mut content, CORRELATION_ID_OFFSET, 0);
        write_i32(&mut content, PARTITION_ID_OFFSET, partition_id);
        Self::from_frames(vec![Frame::new(content, UNFRAGMENTED_MESSAGE)])
    }

    /// Creates a response from initial frame content laid out as
    /// `[response header | fixed fields]`.
    pub fn new_response(message_type: i32, content: BytesMut) -> Self {
        let mut content = with_min_len(content, RESPONSE_HEADER_SIZE);
        write_i32(&mut content, TYPE_FIELD_OFFSET, message_type);
        write_i64(&mut content, CORRELATION_ID_OFFSET, 0);
        content[RESPONSE_BACKUP_ACKS_OFFSET] = 0;
        Self::from_frames(vec![Frame::new(content, UNFRAGMENTED_MESSAGE)])
    }

    /// Creates an event from initial frame content laid out as
    /// `[event header | fixed fields]`.
    pub fn new_event(message_type: i32, content: BytesMut) -> Self {
        let mut content = with_min_len(content, EVENT_HEADER_SIZE);
        write_i32(&mut content, TYPE_FIELD_OFFSET, message_type);
        write_i64(&mut content, CORRELATION_ID_OFFSET, 0);
        write_i32(&mut content, PARTITION_ID_OFFSET, PARTITION_ID_ANY);
        Self::from_frames(vec![Frame::new(
            content,
            UNFRAGMENTED_MESSAGE | IS_EVENT_FLAG,
        )])
    }

    /// Creates a client message from received frames.
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            retryable: false,
        }
    }

    /// Returns the message type from the initial frame.
    ///
    /// Returns `None` if there is no initial frame or if the frame content
    /// is too short to contain a message type field.
    pub fn message_type(&self) -> Option<i32> {
        self.initial_content()
            .and_then(|c| read_i32(c, TYPE_FIELD_OFFSET))
    }

    /// Returns the correlation ID from the initial frame. For events this
    /// slot carries the correlation id of the listener registration.
    pub fn correlation_id(&self) -> Option<i64> {
        self.initial_content()
            .and_then(|c| read_i64(c, CORRELATION_ID_OFFSET))
    }

    /// Sets the correlation ID in the initial frame.
    ///
    /// A no-op when the initial frame is too short to carry one.
    pub fn set_correlation_id(&mut self, correlation_id: i64) {
        self.patch_initial(CORRELATION_ID_OFFSET, &correlation_id.to_le_bytes());
    }

    /// Returns the partition ID from the initial frame of a request or event.
    pub fn partition_id(&self) -> Option<i32> {
        self.initial_content()
            .and_then(|c| read_i32(c, PARTITION_ID_OFFSET))
    }

    /// Sets the partition ID in the initial frame of a request.
    pub fn set_partition_id(&mut self, partition_id: i32) {
        self.patch_initial(PARTITION_ID_OFFSET, &partition_id.to_le_bytes());
    }

    /// Returns the number of backup acks a response expects.
    pub fn number_of_backup_acks(&self) -> Option<u8> {
        self.initial_content()
            .and_then(|c| c.get(RESPONSE_BACKUP_ACKS_OFFSET).copied())
    }

    /// Returns `true` if the operation may be re-sent after the connection
    /// carrying it was lost (idempotent or read-only).
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Marks the message as safe to re-send after a connection loss.
    pub fn set_retryable(&mut self, retryable: bool) {
        self.retryable = retryable;
    }

    /// Adds a frame to the message.
    pub fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Returns a reference to the initial (first) frame, if present.
    pub fn initial_frame(&self) -> Option<&Frame> {
        self.frames.first()
    }

    /// Returns the flags of the initial frame.
    pub fn header_flags(&self) -> u16 {
        self.frames.first().map(Frame::flags).unwrap_or(DEFAULT_FLAGS)
    }

    /// Returns a reference to all frames.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Consumes the message, returning its frames.
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Returns the number of frames in the message.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if the message has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Calculates the total size of the message on the wire.
    pub fn wire_size(&self) -> usize {
        self.frames.iter().map(Frame::wire_size).sum()
    }

    /// Returns true if this message is flagged as an event.
    pub fn is_event(&self) -> bool {
        self.frames
            .first()
            .map(|f| f.is_event_frame())
            .unwrap_or(false)
    }

    /// Returns true if this message is an error response.
    pub fn is_error(&self) -> bool {
        !self.is_event() && self.message_type() == Some(ERROR_MESSAGE_TYPE)
    }

    /// Returns a cursor over the frames, positioned on the initial frame.
    pub fn iter(&self) -> ForwardFrameIterator<'_> {
        ForwardFrameIterator::new(&self.frames)
    }

    fn initial_content(&self) -> Option<&[u8]> {
        self.frames.first().map(|f| &f.content()[..])
    }

    fn patch_initial(&mut self, offset: usize, bytes: &[u8]) {
        if let Some(frame) = self.frames.first_mut() {
            if frame.content().len() >= offset + bytes.len() {
                let mut content = frame.content_mut();
                content[offset..offset + bytes.len()].copy_from_slice(bytes);
                frame.set_content(content);
            }
        }
    }
}

/// A forward-only cursor over the frames of a message.
///
/// Decoders pull frames in order; [`fast_forward_to_end_frame`] skips any
/// trailing fields of a nested structure that this client does not know.
///
/// [`fast_forward_to_end_frame`]: ForwardFrameIterator::fast_forward_to_end_frame
#[derive(Debug, Clone)]
pub struct ForwardFrameIterator<'a> {
    frames: &'a [Frame],
    position: usize,
}

impl<'a> ForwardFrameIterator<'a> {
    fn new(frames: &'a [Frame]) -> Self {
        Self {
            frames,
            position: 0,
        }
    }

    /// Returns the next frame, or a protocol error if the message ended.
    pub fn next_frame(&mut self) -> Result<&'a Frame> {
        let frame = self.frames.get(self.position).ok_or_else(|| {
            HazelcastError::Protocol(format!(
                "message ended after {} frames while more were expected",
                self.frames.len()
            ))
        })?;
        self.position += 1;
        Ok(frame)
    }

    /// Returns the next frame without consuming it.
    pub fn peek(&self) -> Option<&'a Frame> {
        self.frames.get(self.position)
    }

    /// Returns `true` if frames remain.
    pub fn has_next(&self) -> bool {
        self.position < self.frames.len()
    }

    /// Skips to just past the frame that closes the current data structure.
    pub fn fast_forward_to_end_frame(&mut self) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 {
            let frame = self.next_frame()?;
            if frame.is_end_frame() {
                depth -= 1;
            } else if frame.is_begin_frame() {
                depth += 1;
            }
        }
        Ok(())
    }
}

fn with_min_len(mut content: BytesMut, len: usize) -> BytesMut {
    if content.len() < len {
        content.put_bytes(0, len - content.len());
    }
    content
}

fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + INT_SIZE_IN_BYTES].copy_from_slice(&value.to_le_bytes());
}

fn write_i64(buf: &mut [u8], offset: usize, value: i64) {
    buf[offset..offset + LONG_SIZE_IN_BYTES].copy_from_slice(&value.to_le_bytes());
}

fn read_i32(buf: &[u8], offset: usize) -> Option<i32> {
    buf.get(offset..offset + INT_SIZE_IN_BYTES)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_le_bytes)
}

fn read_i64(buf: &[u8], offset: usize) -> Option<i64> {
    buf.get(offset..offset + LONG_SIZE_IN_BYTES)
        .and_then(|b| b.try_into().ok())
        .map(i64::from_le_bytes)
}
