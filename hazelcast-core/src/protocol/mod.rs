//! Hazelcast Open Binary Protocol implementation.
//!
//! This module provides the frame and message model, the framed codec with
//! fragmentation, the built-in field codecs and the message codecs used by
//! the client core.

pub mod builtin;
mod client_message;
mod codec;
pub mod codecs;
pub mod constants;
pub mod error_codes;
mod fragmentation;
mod frame;

pub use client_message::{ClientMessage, ForwardFrameIterator};
pub use codec::{
    decode_message, encode_message, ClientMessageCodec, DEFAULT_MAX_FRAME_SIZE,
    DEFAULT_MAX_MESSAGE_SIZE,
};
pub use constants::*;
pub use fragmentation::FragmentAssembler;
pub use frame::Frame;
