//! # Signed Call Envelopes
//!
//! Every state-changing request reaching a node is wrapped in a
//! [`SignedEnvelope`]: the caller's public key, a nonce, an arbitrary JSON
//! payload and an Ed25519 signature over
//!
//! ```text
//! keccak256(nonce as 8 bytes big-endian ‖ canonical JSON of payload)
//! ```
//!
//! "Canonical" means `serde_json`'s default output for a `Value`: object keys
//! sorted, no whitespace. The envelope knows nothing about what the payload
//! means; the node decodes it into a call after verification.
//!
//! Nonces must strictly increase per address. The envelope layer only
//! signs them; the node's ledger enforces the ordering.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hash::{keccak256_concat, Hash32};
use crate::crypto::keys::{FnsKeypair, FnsPublicKey, FnsSignature};
use crate::crypto::signatures::{verify_strict, SignatureError};
use crate::identity::Address;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("bad envelope signature: {0}")]
    Signature(#[from] SignatureError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub signer: FnsPublicKey,
    pub nonce: u64,
    pub payload: serde_json::Value,
    pub signature: FnsSignature,
}

/// The digest a signer commits to.
pub fn signing_digest(nonce: u64, payload: &serde_json::Value) -> Result<Hash32, EnvelopeError> {
    let body = serde_json::to_vec(payload)?;
    Ok(Hash32::from_bytes(keccak256_concat(&[
        &nonce.to_be_bytes(),
        &body,
    ])))
}

/// Signs `payload` at `nonce` with `keypair`.
pub fn sign_envelope(
    keypair: &FnsKeypair,
    nonce: u64,
    payload: serde_json::Value,
) -> Result<SignedEnvelope, EnvelopeError> {
    let digest = signing_digest(nonce, &payload)?;
    Ok(SignedEnvelope {
        signer: keypair.public_key(),
        nonce,
        signature: keypair.sign(digest.as_bytes()),
        payload,
    })
}

/// Checks the signature and returns the caller's address.
pub fn verify_envelope(envelope: &SignedEnvelope) -> Result<Address, EnvelopeError> {
    let digest = signing_digest(envelope.nonce, &envelope.payload)?;
    verify_strict(&envelope.signer, digest.as_bytes(), &envelope.signature)?;
    Ok(Address::from_public_key(&envelope.signer))
}
