//! # Wallet Keys
//!
//! Ed25519 keypairs for the identities that drive FNS: registrants, renewers,
//! the treasury administrator. A key never appears on the ledger directly;
//! callers are known by the [`Address`](crate::identity::Address) derived
//! from their public key.
//!
//! Key bytes are never logged. `FnsKeypair` has no serde impls; a secret
//! leaves the process only through an explicit `secret_hex()` call.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

use crate::encoding::{decode_fixed, to_prefixed_hex};

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// An Ed25519 wallet keypair.
///
/// ```
/// use fns_protocol::crypto::keys::FnsKeypair;
///
/// let kp = FnsKeypair::generate();
/// let sig = kp.sign(b"commit 0x01");
/// assert!(kp.public_key().verify(b"commit 0x01", &sig));
/// ```
pub struct FnsKeypair {
    signing_key: SigningKey,
}

/// The public half of a wallet key. Serializes as `0x` hex.
#[derive(Clone, PartialEq, Eq)]
pub struct FnsPublicKey {
    bytes: [u8; 32],
}

/// A 64-byte Ed25519 signature. Serializes as `0x` hex.
#[derive(Clone, PartialEq, Eq)]
pub struct FnsSignature {
    bytes: [u8; 64],
}

impl FnsKeypair {
    /// Fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Tests and fixtures only;
    /// a weak seed gives a weak key.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Loads a keypair from the hex secret written by `fns-node init`.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let seed = decode_fixed::<32>(s.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    pub fn public_key(&self) -> FnsPublicKey {
        FnsPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    pub fn sign(&self, message: &[u8]) -> FnsSignature {
        FnsSignature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }

    /// Exports the secret as hex. Handle with care.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }
}

impl Clone for FnsKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for FnsKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Public half only.
        write!(f, "FnsKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// FnsPublicKey
// ---------------------------------------------------------------------------

impl FnsPublicKey {
    /// Validates that the bytes are a usable Ed25519 point.
    pub fn try_from_bytes(bytes: [u8; 32]) -> Result<Self, KeyError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Strict verification. Returns `false` on any failure, including a key
    /// that does not decode.
    pub fn verify(&self, message: &[u8], signature: &FnsSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig = DalekSignature::from_bytes(&signature.bytes);
        verifying_key.verify(message, &sig).is_ok()
    }

    pub fn to_hex(&self) -> String {
        to_prefixed_hex(&self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = decode_fixed::<32>(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_bytes(bytes)
    }
}

impl Hash for FnsPublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for FnsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FnsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnsPublicKey({})", &self.to_hex()[..18])
    }
}

impl serde::Serialize for FnsPublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for FnsPublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// FnsSignature
// ---------------------------------------------------------------------------

impl FnsSignature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        to_prefixed_hex(&self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, crate::encoding::HexError> {
        decode_fixed::<64>(s).map(Self::from_bytes)
    }
}

impl fmt::Debug for FnsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnsSignature({}...)", &self.to_hex()[..18])
    }
}

impl serde::Serialize for FnsSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for FnsSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
