//! # Hashing Utilities
//!
//! Two hash functions, two jobs:
//!
//! - **Keccak-256** names things. Label hashes, namehash nodes, commitment
//!   hashes, envelope signing digests and address derivation all use it, so
//!   FNS identifiers line up bit-for-bit with the rest of the ENS-style world.
//!
//! - **BLAKE3** guards storage. Snapshot checksums in `FnsDb` use it because
//!   nothing outside this process ever needs to reproduce them, and it is
//!   several times faster than Keccak.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// A generic 32-byte digest: commitment hashes, registration secrets,
/// envelope digests.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash32([u8; 32]);

crate::impl_hex_identifier!(Hash32, 32);

/// Keccak-256 of the input.
///
/// # Example
///
/// ```
/// use fns_protocol::crypto::keccak256;
///
/// let digest = keccak256(b"frax");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Keccak-256 over the concatenation of several slices, without building the
/// concatenated buffer first.
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// BLAKE3 of the input. Storage checksums only.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Serializable checksum wrapper so callers can persist and compare it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum(pub [u8; 32]);

impl Checksum {
    pub fn of(data: &[u8]) -> Self {
        Self(blake3_hash(data))
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        self.0 == blake3_hash(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_empty_vector() {
        // Keccak-256, not NIST SHA3-256. The two differ in padding.
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn keccak_label_vector() {
        assert_eq!(
            hex::encode(keccak256(b"eth")),
            "4f5b812789fc606be1b3b16908db13fc7a9adf7ca72641f84d75b47069d3d7f0"
        );
    }

    #[test]
    fn concat_matches_single_buffer() {
        let joined = keccak256(b"helloworld");
        let parts = keccak256_concat(&[b"hello", b"world"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn blake3_deterministic() {
        assert_eq!(blake3_hash(b"fns"), blake3_hash(b"fns"));
        assert_ne!(blake3_hash(b"fns"), blake3_hash(b"fnS"));
    }

    #[test]
    fn checksum_detects_tampering() {
        let sum = Checksum::of(b"snapshot");
        assert!(sum.matches(b"snapshot"));
        assert!(!sum.matches(b"snapshoT"));
    }

    #[test]
    fn hash32_hex_roundtrip() {
        let h = Hash32::from_bytes(keccak256(b"secret"));
        let parsed: Hash32 = h.to_hex().parse().unwrap();
        assert_eq!(h, parsed);
        assert!(h.to_hex().starts_with("0x"));
        assert!(Hash32::default().is_zero());
    }
}
