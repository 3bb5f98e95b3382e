//! Codec implementation for encoding/decoding Hazelcast protocol messages.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use super::constants::*;
use super::fragmentation::{self, FragmentAssembler};
use super::frame::Frame;
use super::ClientMessage;
use crate::error::{HazelcastError, Result};

/// Default fragmentation threshold in bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Default limit on the size of a message being read, fragments included.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 128 * 1024 * 1024;

/// Codec for encoding and decoding Hazelcast client messages.
///
/// Implements the `tokio_util::codec::{Encoder, Decoder}` traits for use
/// with tokio's framed I/O. Messages larger than the configured maximum are
/// written as fragments, and fragments read back are reassembled before a
/// message is yielded. Inbound data is bounded by the maximum message size:
/// a longer frame, wire message or set of unfinished fragments is a
/// protocol error. A decode error leaves the stream unusable; the caller is
/// expected to close the connection.
#[derive(Debug)]
pub struct ClientMessageCodec {
    max_frame_size: usize,
    max_message_size: usize,
    next_fragment_id: i64,
    /// Frames of the wire message currently being read.
    pending_frames: Vec<Frame>,
    pending_size: usize,
    assembler: FragmentAssembler,
}

impl ClientMessageCodec {
    /// Creates a new codec with the default fragmentation threshold.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates a codec that fragments messages above `max_frame_size` bytes.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            next_fragment_id: 0,
            pending_frames: Vec::new(),
            pending_size: 0,
            assembler: FragmentAssembler::with_max_buffered(DEFAULT_MAX_MESSAGE_SIZE),
        }
    }

    /// Limits inbound messages to `max_message_size` bytes on the wire.
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self.assembler = FragmentAssembler::with_max_buffered(max_message_size);
        self
    }

    /// Returns the fragmentation threshold.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Returns the inbound message size limit.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    fn write_wire_message(frames: &[Frame], dst: &mut BytesMut) {
        let last = frames.len().saturating_sub(1);
        for (index, frame) in frames.iter().enumerate() {
            let extra = if index == last { IS_FINAL_FLAG } else { DEFAULT_FLAGS };
            frame.write_to(dst, extra);
        }
    }
}

impl Default for ClientMessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<ClientMessage> for ClientMessageCodec {
    type Error = HazelcastError;

    fn encode(&mut self, item: ClientMessage, dst: &mut BytesMut) -> Result<()> {
        if item.is_empty() {
            return Err(HazelcastError::Protocol(
                "cannot encode empty message".to_string(),
            ));
        }

        dst.reserve(item.wire_size());
        let fragment_id = self.next_fragment_id;
        let fragments = fragmentation::split(item, self.max_frame_size, fragment_id);
        if fragments.len() > 1 {
            self.next_fragment_id = self.next_fragment_id.wrapping_add(1);
        }
        for fragment in &fragments {
            Self::write_wire_message(fragment, dst);
        }
        Ok(())
    }
}

impl Decoder for ClientMessageCodec {
    type Item = ClientMessage;
    type Error = HazelcastError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let remaining = self.max_message_size.saturating_sub(self.pending_size);
            let Some(frame) = Frame::read_from_limited(src, remaining)? else {
                return Ok(None);
            };
            self.pending_size += frame.wire_size();
            if !frame.is_final_frame() {
                self.pending_frames.push(frame);
                continue;
            }

            self.pending_frames
                .push(frame.with_replaced_flags(frame.flags() & !IS_FINAL_FLAG));
            self.pending_size = 0;
            let frames = std::mem::take(&mut self.pending_frames);
            if let Some(message) = self.assembler.accept(frames)? {
                return Ok(Some(message));
            }
        }
    }
}

/// Encodes a message into a standalone buffer.
pub fn encode_message(message: ClientMessage, max_frame_size: usize) -> Result<BytesMut> {
    let mut codec = ClientMessageCodec::with_max_frame_size(max_frame_size);
    let mut buf = BytesMut::new();
    codec.encode(message, &mut buf)?;
    Ok(buf)
}

/// Decodes exactly one message from `bytes`.
///
/// Truncated input or trailing bytes are framing errors.
pub fn decode_message(bytes: &[u8]) -> Result<ClientMessage> {
    let mut codec = ClientMessageCodec::new();
    let mut buf = BytesMut::from(bytes);
    let message = codec
        .decode(&mut buf)?
        .ok_or_else(|| HazelcastError::Protocol("truncated message".to_string()))?;
    if !buf.is_empty() {
        return Err(HazelcastError::Protocol(format!(
            "{} trailing bytes after message",
            buf.len()
        )));
    }
    Ok(message)
}
