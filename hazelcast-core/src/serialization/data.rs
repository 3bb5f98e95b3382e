//! Serialized value blob.

use bytes::{BufMut, Bytes, BytesMut};

use super::traits::Serializable;
use crate::error::{HazelcastError, Result};
use crate::partition_aware::compute_partition_hash;

const PARTITION_HASH_OFFSET: usize = 0;
const TYPE_OFFSET: usize = PARTITION_HASH_OFFSET + 4;
const DATA_OFFSET: usize = TYPE_OFFSET + 4;

/// A serialized value: `[partition hash | type id | payload]`, big endian.
///
/// A zero partition hash means "hash the payload".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Data {
    bytes: Bytes,
}

impl Data {
    /// Serializes `value` with no explicit partition hash.
    pub fn from_value<T: Serializable + ?Sized>(value: &T) -> Result<Self> {
        Self::build(value, 0)
    }

    /// Serializes `value` routed by the hash of `partition_key` instead of
    /// its own payload.
    pub fn with_partition_key<T: Serializable + ?Sized>(
        value: &T,
        partition_key: &[u8],
    ) -> Result<Self> {
        Self::build(value, compute_partition_hash(partition_key))
    }

    fn build<T: Serializable + ?Sized>(value: &T, partition_hash: i32) -> Result<Self> {
        let mut buf = BytesMut::with_capacity(DATA_OFFSET + 16);
        buf.put_i32(partition_hash);
        buf.put_i32(value.type_id());
        value.write_payload(&mut buf)?;
        Ok(Self {
            bytes: buf.freeze(),
        })
    }

    /// Wraps bytes received from the cluster.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < DATA_OFFSET {
            return Err(HazelcastError::Serialization(format!(
                "data blob of {} bytes is shorter than its {}-byte header",
                bytes.len(),
                DATA_OFFSET
            )));
        }
        Ok(Self { bytes })
    }

    /// Type id of the serialized value.
    pub fn type_id(&self) -> i32 {
        read_i32_be(&self.bytes[TYPE_OFFSET..DATA_OFFSET])
    }

    /// Serialized payload without the header.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[DATA_OFFSET..]
    }

    /// Hash that decides the owning partition.
    pub fn partition_hash(&self) -> i32 {
        let explicit = read_i32_be(&self.bytes[PARTITION_HASH_OFFSET..TYPE_OFFSET]);
        if explicit != 0 {
            explicit
        } else {
            compute_partition_hash(self.payload())
        }
    }

    /// Full blob as sent on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the blob, returning its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

fn read_i32_be(bytes: &[u8]) -> i32 {
    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
