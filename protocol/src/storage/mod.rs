//! # Storage
//!
//! sled persistence for the node: one checksummed state snapshot, an
//! append-only event log and the per-address nonce table. bincode on disk,
//! JSON only at the API edge.

pub mod db;

pub use db::{DbError, DbResult, FnsDb};
