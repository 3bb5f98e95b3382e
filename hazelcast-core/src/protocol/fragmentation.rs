//! Splitting of large messages into fragments and their reassembly.
//!
//! A fragmented message travels as several wire messages. Each one starts
//! with a fragment header frame whose content is the 8-byte fragmentation id
//! and whose flags mark the first (`BEGIN_FRAGMENT_FLAG`), last
//! (`END_FRAGMENT_FLAG`) or a middle (no flag) fragment. The frames of the
//! original message follow unchanged; a frame is never cut in two.

use std::collections::HashMap;

use bytes::{BufMut, BytesMut};

use super::client_message::ClientMessage;
use super::codec::DEFAULT_MAX_MESSAGE_SIZE;
use super::constants::*;
use super::frame::Frame;
use crate::error::{HazelcastError, Result};

const FRAGMENT_HEADER_WIRE_SIZE: usize = FRAME_HEADER_SIZE + LONG_SIZE_IN_BYTES;

/// Splits `message` into fragments whose wire size stays at or below
/// `max_frame_size` where frame boundaries allow it.
///
/// Returns the message's frames as a single element when it fits, or when
/// splitting would still produce just one fragment.
pub fn split(message: ClientMessage, max_frame_size: usize, fragment_id: i64) -> Vec<Vec<Frame>> {
    if message.wire_size() <= max_frame_size || message.frame_count() < 2 {
        return vec![message.into_frames()];
    }

    let mut fragments: Vec<Vec<Frame>> = Vec::new();
    let mut current: Vec<Frame> = Vec::new();
    let mut current_size = FRAGMENT_HEADER_WIRE_SIZE;

    for frame in message.into_frames() {
        let size = frame.wire_size();
        if !current.is_empty() && current_size + size > max_frame_size {
            fragments.push(std::mem::take(&mut current));
            current_size = FRAGMENT_HEADER_WIRE_SIZE;
        }
        current_size += size;
        current.push(frame);
    }
    fragments.push(current);

    if fragments.len() == 1 {
        return fragments;
    }

    let last = fragments.len() - 1;
    fragments
        .into_iter()
        .enumerate()
        .map(|(index, frames)| {
            let flags = match index {
                0 => BEGIN_FRAGMENT_FLAG,
                i if i == last => END_FRAGMENT_FLAG,
                _ => DEFAULT_FLAGS,
            };
            let mut fragment = Vec::with_capacity(frames.len() + 1);
            fragment.push(fragment_header(fragment_id, flags));
            fragment.extend(frames);
            fragment
        })
        .collect()
}

fn fragment_header(fragment_id: i64, flags: u16) -> Frame {
    let mut content = BytesMut::with_capacity(LONG_SIZE_IN_BYTES);
    content.put_i64_le(fragment_id);
    Frame::new(content, flags)
}

#[derive(Debug, Default)]
struct Partial {
    frames: Vec<Frame>,
    size: usize,
}

/// Collects fragments by fragmentation id until the last one arrives.
///
/// The frames held for unfinished messages, summed over all fragmentation
/// ids, never exceed the buffer limit.
#[derive(Debug)]
pub struct FragmentAssembler {
    in_progress: HashMap<i64, Partial>,
    buffered: usize,
    max_buffered: usize,
}

impl Default for FragmentAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentAssembler {
    /// Creates an assembler with no fragments in progress.
    pub fn new() -> Self {
        Self::with_max_buffered(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Creates an assembler that holds at most `max_buffered` bytes of
    /// unfinished messages.
    pub fn with_max_buffered(max_buffered: usize) -> Self {
        Self {
            in_progress: HashMap::new(),
            buffered: 0,
            max_buffered,
        }
    }

    /// Returns the number of messages still missing fragments.
    pub fn pending(&self) -> usize {
        self.in_progress.len()
    }

    /// Returns the wire size of the frames held for unfinished messages.
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// Accepts the frames of one wire message.
    ///
    /// Returns the complete message when `frames` is unfragmented or carries
    /// the last fragment, and `None` while fragments are still missing.
    pub fn accept(&mut self, frames: Vec<Frame>) -> Result<Option<ClientMessage>> {
        let first = frames
            .first()
            .ok_or_else(|| HazelcastError::Protocol("wire message without frames".to_string()))?;

        if first.has_flag(UNFRAGMENTED_MESSAGE) {
            check_initial_frame(first)?;
            return Ok(Some(ClientMessage::from_frames(frames)));
        }

        let fragment_id = fragment_id_of(first)?;
        let is_begin = first.has_flag(BEGIN_FRAGMENT_FLAG);
        let is_end = first.has_flag(END_FRAGMENT_FLAG);
        let body: Vec<Frame> = frames.into_iter().skip(1).collect();
        let body_size: usize = body.iter().map(Frame::wire_size).sum();

        if is_begin && self.in_progress.contains_key(&fragment_id) {
            return Err(HazelcastError::Protocol(format!(
                "fragmentation id {} started twice",
                fragment_id
            )));
        }
        if !is_begin && !self.in_progress.contains_key(&fragment_id) {
            return Err(HazelcastError::Protocol(format!(
                "fragment for unknown fragmentation id {}",
                fragment_id
            )));
        }
        if body_size > self.max_buffered.saturating_sub(self.buffered) {
            return Err(HazelcastError::Protocol(format!(
                "fragment of {} bytes for id {} exceeds the {}-byte reassembly limit ({} bytes buffered)",
                body_size, fragment_id, self.max_buffered, self.buffered
            )));
        }

        self.buffered += body_size;
        let partial = self.in_progress.entry(fragment_id).or_default();
        partial.frames.extend(body);
        partial.size += body_size;

        if !is_end {
            return Ok(None);
        }

        let Partial { frames, size } = self.in_progress.remove(&fragment_id).unwrap_or_default();
        self.buffered -= size;
        match frames.first() {
            Some(initial) => check_initial_frame(initial)?,
            None => {
                return Err(HazelcastError::Protocol(format!(
                    "fragmented message {} has no frames",
                    fragment_id
                )))
            }
        }
        Ok(Some(ClientMessage::from_frames(frames)))
    }
}

fn fragment_id_of(frame: &Frame) -> Result<i64> {
    frame
        .content()
        .get(FRAGMENTATION_ID_OFFSET..FRAGMENTATION_ID_OFFSET + LONG_SIZE_IN_BYTES)
        .and_then(|b| b.try_into().ok())
        .map(i64::from_le_bytes)
        .ok_or_else(|| {
            HazelcastError::Protocol(format!(
                "fragment header frame of {} bytes is too short",
                frame.content().len()
            ))
        })
}

fn check_initial_frame(frame: &Frame) -> Result<()> {
    if frame.content().len() < MIN_INITIAL_FRAME_SIZE {
        return Err(HazelcastError::Protocol(format!(
            "initial frame of {} bytes cannot hold a message header",
            frame.content().len()
        )));
    }
    Ok(())
}
