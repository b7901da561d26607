// Path: crates/types/src/app/hash.rs

//! The 256-bit hash type used for participant ids, block hashes and property keys.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte hash. Ordering is plain byte order, which is also the numeric
/// order of the value read as a big-endian 256-bit integer.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The all-zero hash, used as the "null" value.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    /// Returns true if every byte is zero.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Builds a hash from an arbitrary slice, failing unless it is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| format!("invalid hash length: expected 32, got {}", bytes.len()))?;
        Ok(Hash256(arr))
    }

    /// Parses a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|e| e.to_string())?;
        Self::from_slice(&bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns a short hex prefix, convenient for log lines.
    pub fn short(&self) -> String {
        hex::encode(self.0.get(..6).unwrap_or_default())
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(value: [u8; 32]) -> Self {
        Hash256(value)
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", hex::encode(self.0))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash256::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// SHA-256 of an arbitrary byte string.
pub fn sha256<T: AsRef<[u8]>>(data: T) -> Hash256 {
    let digest = Sha256::digest(data.as_ref());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash256(out)
}

/// SHA-256 of the canonical SCALE encoding of a value.
pub fn hash_encoded<T: Encode>(value: &T) -> Hash256 {
    sha256(value.encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip_and_ordering() {
        let a = Hash256::from_hex(&format!("{}01", "00".repeat(31))).unwrap();
        let b = Hash256::from_hex(&format!("01{}", "00".repeat(31))).unwrap();
        assert!(a < b, "byte order must match big-endian numeric order");
        assert_eq!(Hash256::from_hex(&a.to_string()).unwrap(), a);
        assert!(Hash256::from_slice(&[0u8; 31]).is_err());
    }

    #[test]
    fn json_uses_hex_strings() {
        let h = sha256(b"participant");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h));
        let back: Hash256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
