//! Partition key hashing.
//!
//! Keys hash with MurmurHash3 (x86, 32-bit) over their serialized payload, or
//! over a custom partition key for types implementing [`PartitionAware`]. The
//! [`PartitionAware`] trait lets related entries land on the same partition:
//!
//! ```
//! use hazelcast_core::PartitionAware;
//!
//! struct OrderKey {
//!     order_id: String,
//!     customer_id: String,
//! }
//!
//! impl PartitionAware for OrderKey {
//!     fn partition_key_bytes(&self) -> Vec<u8> {
//!         self.customer_id.as_bytes().to_vec()
//!     }
//! }
//! ```

use crate::error::Result;
use crate::serialization::{Data, Serializable};

const MURMUR_SEED: u32 = 0x0100_0193;

/// Trait for keys routed by a partition key different from the key itself.
pub trait PartitionAware: Send + Sync {
    /// Returns the serialized bytes of the partition key.
    fn partition_key_bytes(&self) -> Vec<u8>;
}

/// Serializes a partition-aware key so that it routes by its partition key.
pub fn to_partition_aware_data<K>(key: &K) -> Result<Data>
where
    K: Serializable + PartitionAware,
{
    Data::with_partition_key(key, &key.partition_key_bytes())
}

/// Computes a partition hash for the given key bytes.
pub fn compute_partition_hash(key: &[u8]) -> i32 {
    murmur_hash3_x86_32(key, MURMUR_SEED)
}

fn mix_k1(k1: u32) -> u32 {
    k1.wrapping_mul(0xcc9e_2d51)
        .rotate_left(15)
        .wrapping_mul(0x1b87_3593)
}

fn murmur_hash3_x86_32(data: &[u8], seed: u32) -> i32 {
    let mut h1 = seed;
    let mut blocks = data.chunks_exact(4);

    for block in &mut blocks {
        let k1 = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        h1 ^= mix_k1(k1);
        h1 = h1.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let k1 = tail
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, byte)| acc ^ (u32::from(*byte) << (8 * i)));
        h1 ^= mix_k1(k1);
    }

    h1 ^= data.len() as u32;
    h1 ^= h1 >> 16;
    h1 = h1.wrapping_mul(0x85eb_ca6b);
    h1 ^= h1 >> 13;
    h1 = h1.wrapping_mul(0xc2b2_ae35);
    h1 ^= h1 >> 16;

    h1 as i32
}
