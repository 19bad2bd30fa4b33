//! # Addresses
//!
//! A 20-byte identity. Wallets get theirs from the last 20 bytes of
//! `keccak256(public_key)`; contracts get a fixed one from a tag so every
//! node that bootstraps the same configuration agrees on who owns what.

use crate::crypto::hash::keccak256;
use crate::crypto::keys::FnsPublicKey;

/// Prefix mixed into contract address derivation.
const CONTRACT_TAG_PREFIX: &str = "fns.contract.";

/// A ledger identity. `Address::ZERO` means "unowned".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

crate::impl_hex_identifier!(Address, 20);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Address of a wallet key.
    pub fn from_public_key(public_key: &FnsPublicKey) -> Self {
        let digest = keccak256(public_key.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Self(bytes)
    }

    /// Deterministic contract address for a component tag, e.g. `"registry"`.
    pub fn derive(tag: &str) -> Self {
        let digest = keccak256(format!("{CONTRACT_TAG_PREFIX}{tag}").as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Self(bytes)
    }

    /// Lowercase hex without the prefix. This is the label used under
    /// `addr.reverse`.
    pub fn to_plain_hex(&self) -> String {
        hex::encode(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::FnsKeypair;
    use std::collections::HashMap;

    #[test]
    fn zero_is_zero() {
        assert!(Address::ZERO.is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn derive_is_stable_and_distinct() {
        assert_eq!(Address::derive("registry"), Address::derive("registry"));
        assert_ne!(Address::derive("registry"), Address::derive("root"));
        assert!(!Address::derive("registry").is_zero());
    }

    #[test]
    fn public_key_addresses_differ_per_key() {
        let a = FnsKeypair::from_seed(&[1u8; 32]);
        let b = FnsKeypair::from_seed(&[2u8; 32]);
        assert_ne!(
            Address::from_public_key(&a.public_key()),
            Address::from_public_key(&b.public_key())
        );
    }

    #[test]
    fn hex_forms() {
        let addr = Address::from_bytes([0xab; 20]);
        assert_eq!(addr.to_hex(), format!("0x{}", "ab".repeat(20)));
        assert_eq!(addr.to_plain_hex(), "ab".repeat(20));
        assert_eq!(Address::from_hex(&addr.to_plain_hex()).unwrap(), addr);
    }

    #[test]
    fn usable_as_json_map_key() {
        let mut balances = HashMap::new();
        balances.insert(Address::from_bytes([1u8; 20]), 5u64);
        let json = serde_json::to_string(&balances).unwrap();
        let back: HashMap<Address, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, balances);
    }

    #[test]
    fn bincode_roundtrip() {
        let addr = Address::derive("controller");
        let bytes = bincode::serialize(&addr).unwrap();
        let back: Address = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, addr);
    }
}
