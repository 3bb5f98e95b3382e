//! Core types and protocols for Hazelcast.
//!
//! This crate holds everything the client core shares with the wire: the
//! frame and message model with its framed codec, the message codecs, the
//! error taxonomy, the opaque serialization capability and partition hashing.

#![warn(missing_docs)]

pub mod error;
pub mod partition_aware;
pub mod protocol;
pub mod serialization;

pub use error::{HazelcastError, Result, ServerError, StackTraceElement};
pub use partition_aware::{compute_partition_hash, PartitionAware};
pub use protocol::{ClientMessage, ClientMessageCodec, Frame};
pub use serialization::{Data, Deserializable, Serializable};
