use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::TypeError;

/// Length of an object id in bytes.
pub const OBJECT_ID_LEN: usize = 20;

/// Length of an object id in hex digits.
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

/// Number of hex digits used as the shard directory / archive path prefix.
pub const SHARD_PREFIX_LEN: usize = 2;

/// Content-addressed identifier for a stored blob.
///
/// An `ObjectId` is the SHA-1 digest of a blob's bytes. Identical content
/// always produces the same `ObjectId`. The textual form is exactly 40
/// lowercase hex digits; anything else is rejected by [`ObjectId::from_hex`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Compute the `ObjectId` of raw bytes.
    pub fn compute(data: &[u8]) -> Self {
        let digest = Sha1::digest(data);
        let mut arr = [0u8; OBJECT_ID_LEN];
        arr.copy_from_slice(&digest);
        Self(arr)
    }

    /// Create an `ObjectId` from a pre-computed digest.
    pub const fn from_digest(digest: [u8; OBJECT_ID_LEN]) -> Self {
        Self(digest)
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 40-digit lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != OBJECT_ID_HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: OBJECT_ID_HEX_LEN,
                actual: s.len(),
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(TypeError::InvalidHex(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let mut arr = [0u8; OBJECT_ID_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Split the hex form into the shard prefix and the remainder,
    /// e.g. `("ab", "cdef…")`.
    pub fn shard_parts(&self) -> (String, String) {
        let hex = self.to_hex();
        let rest = hex[SHARD_PREFIX_LEN..].to_string();
        let mut prefix = hex;
        prefix.truncate(SHARD_PREFIX_LEN);
        (prefix, rest)
    }

    /// The sharded name `ab/cdef…` used as a directory path and as an
    /// archive member name.
    pub fn shard_name(&self) -> String {
        let (prefix, rest) = self.shard_parts();
        format!("{prefix}/{rest}")
    }

    /// Parse a sharded name of the form `ab/cdef…`.
    pub fn from_shard_name(name: &str) -> Result<Self, TypeError> {
        let (prefix, rest) = name
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidShardName(name.to_string()))?;
        if prefix.len() != SHARD_PREFIX_LEN || rest.contains('/') {
            return Err(TypeError::InvalidShardName(name.to_string()));
        }
        Self::from_hex(&format!("{prefix}{rest}"))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.to_hex()
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }
}
