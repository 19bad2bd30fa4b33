//! # Cryptographic Primitives
//!
//! Keccak-256 for names and digests, BLAKE3 for storage checksums, Ed25519
//! for wallet signatures. Everything here wraps an audited crate; nothing is
//! hand-rolled.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, keccak256, keccak256_concat, Checksum, Hash32};
pub use keys::{FnsKeypair, FnsPublicKey, FnsSignature};
pub use signatures::{sign, verify, verify_strict, SignatureError};
