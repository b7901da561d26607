// Path: crates/types/src/codec.rs

//! The canonical binary codec for everything the registry persists.
//!
//! Diffs, snapshot rows and property hashes all go through these wrappers
//! around `parity-scale-codec`, so every node derives identical bytes (and
//! therefore identical hashes) from identical registry content.

use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical SCALE representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Result<Vec<u8>, String> {
    Ok(v.encode())
}

/// Decodes a value from its canonical SCALE representation.
///
/// Trailing bytes are an error, so a truncated or padded row never decodes
/// into something that looks valid.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, String> {
    T::decode_all(&mut &*b).map_err(|e| format!("canonical decode failed: {}", e))
}
