//! Serialization traits and implementations for primitive types.
//!
//! Values serialize into the payload of a [`Data`](super::Data) blob, big
//! endian, behind a type id that the member uses to pick a deserializer.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{HazelcastError, Result};

/// Type ids of the built-in serializers.
pub mod type_ids {
    /// Null value.
    pub const NULL: i32 = 0;
    /// Boolean.
    pub const BOOLEAN: i32 = -4;
    /// 32-bit integer.
    pub const INTEGER: i32 = -7;
    /// 64-bit integer.
    pub const LONG: i32 = -8;
    /// UTF-8 string.
    pub const STRING: i32 = -11;
    /// Raw byte array.
    pub const BYTE_ARRAY: i32 = -12;
}

/// Trait for types that can be serialized to Hazelcast's binary format.
pub trait Serializable {
    /// Type id written in front of the payload.
    fn type_id(&self) -> i32;

    /// Appends the payload to `output`.
    fn write_payload(&self, output: &mut BytesMut) -> Result<()>;

    /// Serializes this value into a complete [`Data`](super::Data) blob.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(super::Data::from_value(self)?.into_bytes().to_vec())
    }
}

/// Trait for types that can be deserialized from Hazelcast's binary format.
pub trait Deserializable: Sized {
    /// Type id this type reads.
    const TYPE_ID: i32;

    /// Reads a value from its payload.
    fn read_payload(payload: &[u8]) -> Result<Self>;

    /// Deserializes a value from a complete [`Data`](super::Data) blob.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let data = super::Data::from_bytes(data.to_vec())?;
        if data.type_id() != Self::TYPE_ID {
            return Err(HazelcastError::Serialization(format!(
                "expected type id {}, found {}",
                Self::TYPE_ID,
                data.type_id()
            )));
        }
        Self::read_payload(data.payload())
    }
}

fn need(payload: &[u8], size: usize, what: &str) -> Result<()> {
    if payload.len() < size {
        return Err(HazelcastError::Serialization(format!(
            "{} needs {} bytes, payload has {}",
            what,
            size,
            payload.len()
        )));
    }
    Ok(())
}

impl Serializable for i32 {
    fn type_id(&self) -> i32 {
        type_ids::INTEGER
    }

    fn write_payload(&self, output: &mut BytesMut) -> Result<()> {
        output.put_i32(*self);
        Ok(())
    }
}

impl Deserializable for i32 {
    const TYPE_ID: i32 = type_ids::INTEGER;

    fn read_payload(mut payload: &[u8]) -> Result<Self> {
        need(payload, 4, "int")?;
        Ok(payload.get_i32())
    }
}

impl Serializable for i64 {
    fn type_id(&self) -> i32 {
        type_ids::LONG
    }

    fn write_payload(&self, output: &mut BytesMut) -> Result<()> {
        output.put_i64(*self);
        Ok(())
    }
}

impl Deserializable for i64 {
    const TYPE_ID: i32 = type_ids::LONG;

    fn read_payload(mut payload: &[u8]) -> Result<Self> {
        need(payload, 8, "long")?;
        Ok(payload.get_i64())
    }
}

impl Serializable for bool {
    fn type_id(&self) -> i32 {
        type_ids::BOOLEAN
    }

    fn write_payload(&self, output: &mut BytesMut) -> Result<()> {
        output.put_u8(u8::from(*self));
        Ok(())
    }
}

impl Deserializable for bool {
    const TYPE_ID: i32 = type_ids::BOOLEAN;

    fn read_payload(payload: &[u8]) -> Result<Self> {
        need(payload, 1, "boolean")?;
        Ok(payload[0] != 0)
    }
}

impl Serializable for str {
    fn type_id(&self) -> i32 {
        type_ids::STRING
    }

    fn write_payload(&self, output: &mut BytesMut) -> Result<()> {
        let len = i32::try_from(self.len())
            .map_err(|_| HazelcastError::Serialization("string too long".to_string()))?;
        output.put_i32(len);
        output.put_slice(self.as_bytes());
        Ok(())
    }
}

impl Serializable for String {
    fn type_id(&self) -> i32 {
        type_ids::STRING
    }

    fn write_payload(&self, output: &mut BytesMut) -> Result<()> {
        self.as_str().write_payload(output)
    }
}

impl Deserializable for String {
    const TYPE_ID: i32 = type_ids::STRING;

    fn read_payload(mut payload: &[u8]) -> Result<Self> {
        need(payload, 4, "string length")?;
        let len = payload.get_i32();
        let len = usize::try_from(len)
            .map_err(|_| HazelcastError::Serialization(format!("negative string length {}", len)))?;
        need(payload, len, "string")?;
        String::from_utf8(payload[..len].to_vec())
            .map_err(|e| HazelcastError::Serialization(format!("invalid UTF-8: {}", e)))
    }
}

impl Serializable for [u8] {
    fn type_id(&self) -> i32 {
        type_ids::BYTE_ARRAY
    }

    fn write_payload(&self, output: &mut BytesMut) -> Result<()> {
        let len = i32::try_from(self.len())
            .map_err(|_| HazelcastError::Serialization("byte array too long".to_string()))?;
        output.put_i32(len);
        output.put_slice(self);
        Ok(())
    }
}

impl Serializable for Vec<u8> {
    fn type_id(&self) -> i32 {
        type_ids::BYTE_ARRAY
    }

    fn write_payload(&self, output: &mut BytesMut) -> Result<()> {
        self.as_slice().write_payload(output)
    }
}

impl Deserializable for Vec<u8> {
    const TYPE_ID: i32 = type_ids::BYTE_ARRAY;

    fn read_payload(mut payload: &[u8]) -> Result<Self> {
        need(payload, 4, "byte array length")?;
        let len = payload.get_i32();
        let len = usize::try_from(len).map_err(|_| {
            HazelcastError::Serialization(format!("negative byte array length {}", len))
        })?;
        need(payload, len, "byte array")?;
        Ok(payload[..len].to_vec())
    }
}
