//! Frame type for the Hazelcast Open Binary Protocol.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::constants::*;
use crate::error::{HazelcastError, Result};

/// A single frame in the Hazelcast protocol.
///
/// On the wire each frame consists of:
/// - A 4-byte little-endian length counting the whole frame, header included
/// - A 2-byte little-endian flags field
/// - Variable-length content
///
/// A frame never changes once built; header fields of a message are patched
/// through [`ClientMessage`](super::ClientMessage) before the frame is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    content: Bytes,
    flags: u16,
}

impl Frame {
    /// Creates a new frame with the given content and flags.
    pub fn new(content: impl Into<Bytes>, flags: u16) -> Self {
        Self {
            content: content.into(),
            flags,
        }
    }

    /// Creates a new frame with content and default flags.
    pub fn with_content(content: impl Into<Bytes>) -> Self {
        Self::new(content, DEFAULT_FLAGS)
    }

    /// Creates a new empty frame with the given flags.
    pub fn with_flags(flags: u16) -> Self {
        Self::new(Bytes::new(), flags)
    }

    /// Creates a frame that opens a nested data structure.
    pub fn new_begin_frame() -> Self {
        Self::with_flags(BEGIN_DATA_STRUCTURE_FLAG)
    }

    /// Creates a frame that closes a nested data structure.
    pub fn new_end_frame() -> Self {
        Self::with_flags(END_DATA_STRUCTURE_FLAG)
    }

    /// Creates a null frame (represents a null value).
    pub fn new_null_frame() -> Self {
        Self::with_flags(IS_NULL_FLAG)
    }

    /// Returns the frame content.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Returns the frame flags.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Returns `true` if every bit of `flag` is set.
    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag == flag
    }

    /// Returns true if this frame opens a nested data structure.
    pub fn is_begin_frame(&self) -> bool {
        self.has_flag(BEGIN_DATA_STRUCTURE_FLAG)
    }

    /// Returns true if this frame closes a nested data structure.
    pub fn is_end_frame(&self) -> bool {
        self.has_flag(END_DATA_STRUCTURE_FLAG)
    }

    /// Returns true if this frame has the NULL flag set.
    pub fn is_null_frame(&self) -> bool {
        self.has_flag(IS_NULL_FLAG)
    }

    /// Returns true if this frame has the FINAL flag set.
    pub fn is_final_frame(&self) -> bool {
        self.has_flag(IS_FINAL_FLAG)
    }

    /// Returns true if this frame has the EVENT flag set.
    pub fn is_event_frame(&self) -> bool {
        self.has_flag(IS_EVENT_FLAG)
    }

    /// Returns true if this frame has the BACKUP_EVENT flag set.
    pub fn is_backup_event_frame(&self) -> bool {
        self.has_flag(BACKUP_EVENT_FLAG)
    }

    /// Returns the size of this frame on the wire, which is also the value
    /// written into its length field.
    pub fn wire_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.content.len()
    }

    /// Returns a copy of this frame with `flags` replacing the current flags.
    pub(crate) fn with_replaced_flags(&self, flags: u16) -> Self {
        Self {
            content: self.content.clone(),
            flags,
        }
    }

    /// Returns the content as a mutable buffer, copying if it is shared.
    pub(crate) fn content_mut(&mut self) -> BytesMut {
        BytesMut::from(&self.content[..])
    }

    pub(crate) fn set_content(&mut self, content: BytesMut) {
        self.content = content.freeze();
    }

    /// Writes this frame to the given buffer with `extra_flags` or-ed in.
    pub fn write_to(&self, dst: &mut BytesMut, extra_flags: u16) {
        dst.reserve(self.wire_size());
        dst.put_u32_le(self.wire_size() as u32);
        dst.put_u16_le(self.flags | extra_flags);
        dst.put_slice(&self.content);
    }

    /// Reads a frame from the given buffer.
    ///
    /// Returns `Ok(None)` and leaves `src` untouched if there isn't enough
    /// data for a complete frame. A length shorter than the frame header or
    /// above [`MAX_FRAME_LENGTH`] is a framing error.
    pub fn read_from(src: &mut BytesMut) -> Result<Option<Self>> {
        Self::read_from_limited(src, MAX_FRAME_LENGTH)
    }

    /// Like [`read_from`](Self::read_from), but rejects frames longer than
    /// `max_length` bytes as soon as their length field is readable.
    pub fn read_from_limited(src: &mut BytesMut, max_length: usize) -> Result<Option<Self>> {
        if src.len() < SIZE_OF_FRAME_LENGTH_FIELD {
            return Ok(None);
        }

        let frame_length = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if frame_length < FRAME_HEADER_SIZE {
            return Err(HazelcastError::Protocol(format!(
                "frame length {} is shorter than the {}-byte frame header",
                frame_length, FRAME_HEADER_SIZE
            )));
        }
        let max_length = max_length.min(MAX_FRAME_LENGTH);
        if frame_length > max_length {
            return Err(HazelcastError::Protocol(format!(
                "frame length {} exceeds the limit of {} bytes",
                frame_length, max_length
            )));
        }

        if src.len() < frame_length {
            return Ok(None);
        }

        src.advance(SIZE_OF_FRAME_LENGTH_FIELD);
        let flags = src.get_u16_le();
        let content = src.split_to(frame_length - FRAME_HEADER_SIZE).freeze();

        Ok(Some(Self { content, flags }))
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::with_flags(DEFAULT_FLAGS)
    }
}
