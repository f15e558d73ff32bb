use crate::{Error, Result};
use chrono::Utc;
use rand::Rng;
use serde::{de, ser};
use std::{
    convert,
    fmt::{Debug, Display},
    ops,
};

/// Identifier shared by every segment of one trace. 16 bytes; the leading 4
/// carry the big-endian epoch seconds of the moment the trace began, the
/// rest are random.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceId([u8; 16]);

impl TraceId {
    pub const fn zero() -> Self {
        Self([0u8; 16])
    }

    pub fn is_zero(&self) -> bool {
        self == &Self::zero()
    }

    pub fn generate() -> Self {
        let mut id = [0u8; 16];
        let epoch = Utc::now().timestamp() as u32;
        id[..4].copy_from_slice(&epoch.to_be_bytes());
        rand::thread_rng().fill(&mut id[4..]);
        Self(id)
    }

    /// Epoch seconds recorded in the id when the trace began.
    pub fn epoch_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn hex(&self) -> String {
        hex::encode(self)
    }

    pub fn from_hex(s: impl AsRef<str>) -> Result<Self> {
        let data = hex::decode(s.as_ref()).map_err(|err| Error::InvalidInput(err.to_string()))?;
        Self::from_slice(&data)
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let id: [u8; 16] = slice
            .try_into()
            .map_err(|_| Error::InvalidInput(format!("trace id needs 16 bytes, got {}", slice.len())))?;
        Ok(Self(id))
    }
}

impl Debug for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self, f)
    }
}

impl Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self))
    }
}

impl From<[u8; 16]> for TraceId {
    fn from(value: [u8; 16]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for TraceId {
    type Error = Error;
    fn try_from(b: &[u8]) -> std::result::Result<Self, Self::Error> {
        TraceId::from_slice(b)
    }
}

impl ops::Deref for TraceId {
    type Target = [u8; 16];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl convert::AsRef<[u8]> for TraceId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<'de> de::Deserialize<'de> for TraceId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct IdVisitor;
        impl<'de> de::Visitor<'de> for IdVisitor {
            type Value = TraceId;
            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "trace id as 32 hex characters")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                TraceId::from_hex(v).map_err(|e| de::Error::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(IdVisitor)
    }
}

impl ser::Serialize for TraceId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.hex())
    }
}

/// Identifier of a single segment within a trace. 8 random bytes.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId([u8; 8]);

impl SegmentId {
    pub const fn zero() -> Self {
        Self([0u8; 8])
    }

    pub fn generate() -> Self {
        let mut id = [0u8; 8];
        rand::thread_rng().fill(&mut id[..]);
        Self(id)
    }

    pub fn hex(&self) -> String {
        hex::encode(self)
    }

    pub fn from_hex(s: impl AsRef<str>) -> Result<Self> {
        let data = hex::decode(s.as_ref()).map_err(|err| Error::InvalidInput(err.to_string()))?;
        let id: [u8; 8] = data
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidInput(format!("segment id needs 8 bytes, got {}", data.len())))?;
        Ok(Self(id))
    }
}

impl Debug for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self, f)
    }
}

impl Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self))
    }
}

impl From<[u8; 8]> for SegmentId {
    fn from(value: [u8; 8]) -> Self {
        Self(value)
    }
}

impl ops::Deref for SegmentId {
    type Target = [u8; 8];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl convert::AsRef<[u8]> for SegmentId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<'de> de::Deserialize<'de> for SegmentId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct IdVisitor;
        impl<'de> de::Visitor<'de> for IdVisitor {
            type Value = SegmentId;
            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "segment id as 16 hex characters")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                SegmentId::from_hex(v).map_err(|e| de::Error::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(IdVisitor)
    }
}

impl ser::Serialize for SegmentId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.hex())
    }
}
