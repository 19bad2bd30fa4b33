// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # FNS Protocol: Core Library
//!
//! Primitives for the FNS name service: who is calling, what a name hashes
//! to, how a request is signed, and where state lands on disk. The name
//! lifecycle itself (registry, registrar, wrapper, pricing, controller) lives
//! in `fns-contracts` and builds on the types here.
//!
//! ## Modules
//!
//! - **config**: Protocol constants and the deployable `ServiceConfig`.
//! - **crypto**: Keccak-256 for names, BLAKE3 for checksums, Ed25519 for wallets.
//! - **encoding**: `0x` hex identifiers and string-encoded `u128` amounts.
//! - **envelope**: Signed call envelopes with per-address nonces.
//! - **identity**: 20-byte addresses for wallets and contracts.
//! - **name**: Labels, label hashes, namehash nodes, label validity.
//! - **storage**: sled snapshot, event log and nonce table.
//!
//! ## Ground Rules
//!
//! 1. Identifiers are fixed-width newtypes, never bare byte arrays.
//! 2. Anything that touches money is `u128` and checked.
//! 3. Nothing in here panics on user input.

pub mod config;
pub mod crypto;
pub mod encoding;
pub mod envelope;
pub mod identity;
pub mod name;
pub mod storage;

pub use crypto::Hash32;
pub use identity::Address;
pub use name::{LabelHash, Node};
