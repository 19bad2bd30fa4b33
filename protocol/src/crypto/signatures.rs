//! # Digital Signatures
//!
//! Thin wrappers over the keypair methods so every signing and verification
//! path in FNS goes through one auditable place. The node only ever calls
//! [`verify_strict`]; the boolean [`verify`] is for callers that just want a
//! yes/no answer.

use thiserror::Error;

use super::keys::{FnsKeypair, FnsPublicKey, FnsSignature};

/// Intentionally vague: we don't tell anyone why verification failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,
}

pub fn sign(keypair: &FnsKeypair, message: &[u8]) -> FnsSignature {
    keypair.sign(message)
}

pub fn verify(public_key: &FnsPublicKey, message: &[u8], signature: &FnsSignature) -> bool {
    public_key.verify(message, signature)
}

/// `Result` flavoured verification for `?`-style call sites.
pub fn verify_strict(
    public_key: &FnsPublicKey,
    message: &[u8],
    signature: &FnsSignature,
) -> Result<(), SignatureError> {
    if public_key.verify(message, signature) {
        Ok(())
    } else {
        Err(SignatureError::VerificationFailed)
    }
}
