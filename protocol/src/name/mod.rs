//! # Names, Labels and Nodes
//!
//! A name like `alice.frax` is a path of labels. Each label hashes to a
//! [`LabelHash`]; each name folds its label hashes right-to-left into a
//! [`Node`]:
//!
//! ```text
//! node("")           = 0x00…00
//! node("frax")       = keccak256(node("") ‖ keccak256("frax"))
//! node("alice.frax") = keccak256(node("frax") ‖ keccak256("alice"))
//! ```
//!
//! The parent of a node is never stored. It is always recomputed from the
//! parent node and the label hash, so there is no back-link to keep in sync.

use crate::config::MIN_LABEL_LENGTH;
use crate::crypto::hash::{keccak256, keccak256_concat};
use crate::identity::Address;

/// Identifier of a full hierarchical name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Node([u8; 32]);

crate::impl_hex_identifier!(Node, 32);

/// Hash of a single label. Doubles as the registrar token id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LabelHash([u8; 32]);

crate::impl_hex_identifier!(LabelHash, 32);

impl Node {
    /// The root of the tree.
    pub const ROOT: Node = Node([0u8; 32]);

    /// The node of `label` directly under `self`.
    pub fn child(&self, label: &LabelHash) -> Node {
        Node(keccak256_concat(&[&self.0, &label.0]))
    }
}

impl LabelHash {
    pub fn of(label: &str) -> Self {
        Self(keccak256(label.as_bytes()))
    }
}

/// Hash of a single label.
pub fn labelhash(label: &str) -> LabelHash {
    LabelHash::of(label)
}

/// Recursive name hash. The empty name is the root.
pub fn namehash(name: &str) -> Node {
    if name.is_empty() {
        return Node::ROOT;
    }
    name.rsplit('.')
        .fold(Node::ROOT, |node, label| node.child(&LabelHash::of(label)))
}

/// Length of a label in Unicode scalar values.
///
/// A glyph outside the Basic Multilingual Plane (most emoji) counts once,
/// however many UTF-8 bytes or UTF-16 units it takes.
pub fn label_length(label: &str) -> usize {
    label.chars().count()
}

/// A label is registrable when it is at least [`MIN_LABEL_LENGTH`] long.
pub fn is_valid_label(label: &str) -> bool {
    label_length(label) >= MIN_LABEL_LENGTH
}

/// Joins a label onto a parent name: `("alice", "frax") -> "alice.frax"`.
pub fn join(label: &str, parent: &str) -> String {
    if parent.is_empty() {
        label.to_string()
    } else {
        format!("{label}.{parent}")
    }
}

/// The reverse name for an address, `<hex>.addr.reverse`.
pub fn reverse_name(addr: &Address) -> String {
    format!("{}.addr.reverse", addr.to_plain_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_root() {
        assert_eq!(namehash(""), Node::ROOT);
        assert!(Node::ROOT.is_zero());
    }

    #[test]
    fn known_namehash_vectors() {
        assert_eq!(
            namehash("eth").to_hex(),
            "0x93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
        );
        assert_eq!(
            namehash("foo.eth").to_hex(),
            "0xde9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
        );
    }

    #[test]
    fn child_matches_namehash() {
        let tld = namehash("frax");
        assert_eq!(tld.child(&labelhash("alice")), namehash("alice.frax"));
    }

    #[test]
    fn label_length_counts_scalar_values() {
        assert_eq!(label_length("abc"), 3);
        assert_eq!(label_length("你好吗"), 3);
        assert_eq!(label_length("💩💩💩"), 3);
        assert_eq!(label_length("💩💩"), 2);
        assert_eq!(label_length(""), 0);
    }

    #[test]
    fn validity_threshold() {
        for ok in ["testing", "longname12345678", "sixsix", "five5", "four", "iii", "你好吗", "💩💩💩"] {
            assert!(is_valid_label(ok), "{ok} should be valid");
        }
        for bad in ["ii", "i", "", "たこ", "💩💩"] {
            assert!(!is_valid_label(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn join_and_reverse_names() {
        assert_eq!(join("alice", "frax"), "alice.frax");
        assert_eq!(join("frax", ""), "frax");
        let addr = Address::from_bytes([0x11; 20]);
        assert_eq!(reverse_name(&addr), format!("{}.addr.reverse", "11".repeat(20)));
    }

    #[test]
    fn node_serializes_as_json_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(namehash("frax"), 1u8);
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("0x"));
        let back: std::collections::HashMap<Node, u8> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
