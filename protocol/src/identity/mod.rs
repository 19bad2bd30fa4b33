//! # Identity
//!
//! Who is calling. Every FNS operation runs on behalf of an [`Address`],
//! derived either from a wallet key or from a contract tag.

pub mod address;

pub use address::Address;
