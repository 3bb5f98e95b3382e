//! Built-in field codecs shared by the message codecs.
//!
//! Fixed-size values live at offsets inside a frame's content; everything
//! else occupies whole frames, with nested structures bracketed by begin and
//! end data-structure frames.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use super::client_message::{ClientMessage, ForwardFrameIterator};
use super::constants::*;
use super::frame::Frame;
use crate::error::{HazelcastError, Result};

fn out_of_bounds(what: &str, offset: usize, len: usize) -> HazelcastError {
    HazelcastError::Protocol(format!(
        "{} at offset {} is outside a {}-byte frame",
        what, offset, len
    ))
}

/// Encoding and decoding of fixed-size values at frame offsets.
pub mod fixed {
    use super::*;

    fn slice<'a>(buf: &'a [u8], offset: usize, size: usize, what: &str) -> Result<&'a [u8]> {
        buf.get(offset..offset + size)
            .ok_or_else(|| out_of_bounds(what, offset, buf.len()))
    }

    /// Writes a byte.
    pub fn encode_u8(buf: &mut [u8], offset: usize, value: u8) {
        buf[offset] = value;
    }

    /// Reads a byte.
    pub fn decode_u8(buf: &[u8], offset: usize) -> Result<u8> {
        Ok(slice(buf, offset, BYTE_SIZE_IN_BYTES, "byte")?[0])
    }

    /// Writes a boolean as one byte.
    pub fn encode_bool(buf: &mut [u8], offset: usize, value: bool) {
        buf[offset] = u8::from(value);
    }

    /// Reads a boolean.
    pub fn decode_bool(buf: &[u8], offset: usize) -> Result<bool> {
        Ok(decode_u8(buf, offset)? != 0)
    }

    /// Writes a little-endian i32.
    pub fn encode_i32(buf: &mut [u8], offset: usize, value: i32) {
        buf[offset..offset + INT_SIZE_IN_BYTES].copy_from_slice(&value.to_le_bytes());
    }

    /// Reads a little-endian i32.
    pub fn decode_i32(buf: &[u8], offset: usize) -> Result<i32> {
        let bytes = slice(buf, offset, INT_SIZE_IN_BYTES, "int")?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Writes a little-endian i64.
    pub fn encode_i64(buf: &mut [u8], offset: usize, value: i64) {
        buf[offset..offset + LONG_SIZE_IN_BYTES].copy_from_slice(&value.to_le_bytes());
    }

    /// Reads a little-endian i64.
    pub fn decode_i64(buf: &[u8], offset: usize) -> Result<i64> {
        let bytes = slice(buf, offset, LONG_SIZE_IN_BYTES, "long")?;
        let mut array = [0u8; LONG_SIZE_IN_BYTES];
        array.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(array))
    }

    /// Writes a nullable UUID: a null flag, then the most and least
    /// significant halves.
    pub fn encode_uuid(buf: &mut [u8], offset: usize, value: Option<Uuid>) {
        encode_bool(buf, offset, value.is_none());
        let (msb, lsb) = value.map(|u| u.as_u64_pair()).unwrap_or((0, 0));
        encode_i64(buf, offset + BOOLEAN_SIZE_IN_BYTES, msb as i64);
        encode_i64(
            buf,
            offset + BOOLEAN_SIZE_IN_BYTES + LONG_SIZE_IN_BYTES,
            lsb as i64,
        );
    }

    /// Reads a nullable UUID.
    pub fn decode_uuid(buf: &[u8], offset: usize) -> Result<Option<Uuid>> {
        slice(buf, offset, UUID_SIZE_IN_BYTES, "uuid")?;
        if decode_bool(buf, offset)? {
            return Ok(None);
        }
        let msb = decode_i64(buf, offset + BOOLEAN_SIZE_IN_BYTES)? as u64;
        let lsb = decode_i64(buf, offset + BOOLEAN_SIZE_IN_BYTES + LONG_SIZE_IN_BYTES)? as u64;
        Ok(Some(Uuid::from_u64_pair(msb, lsb)))
    }
}

/// Appends a UTF-8 string frame.
pub fn encode_string(message: &mut ClientMessage, value: &str) {
    message.add_frame(Frame::with_content(Bytes::copy_from_slice(value.as_bytes())));
}

/// Reads a UTF-8 string frame.
pub fn decode_string(iter: &mut ForwardFrameIterator<'_>) -> Result<String> {
    let frame = iter.next_frame()?;
    String::from_utf8(frame.content().to_vec())
        .map_err(|e| HazelcastError::Protocol(format!("invalid UTF-8 in string frame: {}", e)))
}

/// Appends a frame holding opaque serialized data.
pub fn encode_data(message: &mut ClientMessage, value: &[u8]) {
    message.add_frame(Frame::with_content(Bytes::copy_from_slice(value)));
}

/// Reads a frame holding opaque serialized data.
pub fn decode_data(iter: &mut ForwardFrameIterator<'_>) -> Result<Bytes> {
    Ok(iter.next_frame()?.content().clone())
}

/// Appends `value` with `encode`, or a null frame when absent.
pub fn encode_nullable<T: ?Sized>(
    message: &mut ClientMessage,
    value: Option<&T>,
    encode: impl FnOnce(&mut ClientMessage, &T),
) {
    match value {
        Some(v) => encode(message, v),
        None => message.add_frame(Frame::new_null_frame()),
    }
}

/// Consumes a null frame and returns `None`, or decodes the value.
pub fn decode_nullable<'a, T>(
    iter: &mut ForwardFrameIterator<'a>,
    decode: impl FnOnce(&mut ForwardFrameIterator<'a>) -> Result<T>,
) -> Result<Option<T>> {
    if iter.peek().map(Frame::is_null_frame).unwrap_or(false) {
        iter.next_frame()?;
        return Ok(None);
    }
    decode(iter).map(Some)
}

/// Appends a list as begin frame, one entry per item, end frame.
pub fn encode_list<T>(
    message: &mut ClientMessage,
    items: &[T],
    mut encode: impl FnMut(&mut ClientMessage, &T),
) {
    message.add_frame(Frame::new_begin_frame());
    for item in items {
        encode(message, item);
    }
    message.add_frame(Frame::new_end_frame());
}

/// Reads a list written by [`encode_list`].
pub fn decode_list<'a, T>(
    iter: &mut ForwardFrameIterator<'a>,
    mut decode: impl FnMut(&mut ForwardFrameIterator<'a>) -> Result<T>,
) -> Result<Vec<T>> {
    expect_begin(iter)?;
    let mut items = Vec::new();
    while !next_is_end(iter) {
        items.push(decode(iter)?);
    }
    iter.next_frame()?;
    Ok(items)
}

/// Appends a list of ints as a single frame.
pub fn encode_int_list(message: &mut ClientMessage, values: &[i32]) {
    let mut content = BytesMut::with_capacity(values.len() * INT_SIZE_IN_BYTES);
    for value in values {
        content.put_i32_le(*value);
    }
    message.add_frame(Frame::with_content(content));
}

/// Reads a single-frame list of ints.
pub fn decode_int_list(iter: &mut ForwardFrameIterator<'_>) -> Result<Vec<i32>> {
    let content = iter.next_frame()?.content();
    if content.len() % INT_SIZE_IN_BYTES != 0 {
        return Err(HazelcastError::Protocol(format!(
            "int list frame of {} bytes is not a multiple of {}",
            content.len(),
            INT_SIZE_IN_BYTES
        )));
    }
    (0..content.len() / INT_SIZE_IN_BYTES)
        .map(|i| fixed::decode_i32(content, i * INT_SIZE_IN_BYTES))
        .collect()
}

/// Appends a list of UUIDs as a single frame.
pub fn encode_uuid_list(message: &mut ClientMessage, values: &[Uuid]) {
    let mut content = BytesMut::zeroed(values.len() * UUID_SIZE_IN_BYTES);
    for (i, value) in values.iter().enumerate() {
        fixed::encode_uuid(&mut content, i * UUID_SIZE_IN_BYTES, Some(*value));
    }
    message.add_frame(Frame::with_content(content));
}

/// Reads a single-frame list of UUIDs. Null entries are a protocol error.
pub fn decode_uuid_list(iter: &mut ForwardFrameIterator<'_>) -> Result<Vec<Uuid>> {
    let content = iter.next_frame()?.content();
    if content.len() % UUID_SIZE_IN_BYTES != 0 {
        return Err(HazelcastError::Protocol(format!(
            "uuid list frame of {} bytes is not a multiple of {}",
            content.len(),
            UUID_SIZE_IN_BYTES
        )));
    }
    (0..content.len() / UUID_SIZE_IN_BYTES)
        .map(|i| {
            fixed::decode_uuid(content, i * UUID_SIZE_IN_BYTES)?
                .ok_or_else(|| HazelcastError::Protocol("null uuid in uuid list".to_string()))
        })
        .collect()
}

/// Appends a string-to-string map as alternating key and value frames.
pub fn encode_string_map(message: &mut ClientMessage, map: &HashMap<String, String>) {
    message.add_frame(Frame::new_begin_frame());
    for (key, value) in map {
        encode_string(message, key);
        encode_string(message, value);
    }
    message.add_frame(Frame::new_end_frame());
}

/// Reads a string-to-string map.
pub fn decode_string_map(iter: &mut ForwardFrameIterator<'_>) -> Result<HashMap<String, String>> {
    expect_begin(iter)?;
    let mut map = HashMap::new();
    while !next_is_end(iter) {
        let key = decode_string(iter)?;
        let value = decode_string(iter)?;
        map.insert(key, value);
    }
    iter.next_frame()?;
    Ok(map)
}

/// Consumes the frame that opens a nested structure.
pub fn expect_begin(iter: &mut ForwardFrameIterator<'_>) -> Result<()> {
    let frame = iter.next_frame()?;
    if !frame.is_begin_frame() {
        return Err(HazelcastError::Protocol(format!(
            "expected begin frame, found flags {:#06x}",
            frame.flags()
        )));
    }
    Ok(())
}

fn next_is_end(iter: &ForwardFrameIterator<'_>) -> bool {
    iter.peek().map(Frame::is_end_frame).unwrap_or(true)
}

/// Allocates zeroed initial frame content of `size` bytes.
pub fn initial_content(size: usize) -> BytesMut {
    BytesMut::zeroed(size)
}
