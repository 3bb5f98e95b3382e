//! Opaque serialization capability consumed by the client core.
//!
//! The core never looks inside keys or values: it moves [`Data`] blobs and
//! hashes their payload to find the owning partition.

mod data;
mod traits;

pub use data::Data;
pub use traits::{type_ids, Deserializable, Serializable};
