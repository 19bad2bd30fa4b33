//! # Wire Encodings
//!
//! Small helpers shared by every fixed-width identifier in FNS. Addresses,
//! nodes, label hashes and commitments all travel as `0x`-prefixed lowercase
//! hex strings, both in JSON and in the bincode snapshots, so a node key in a
//! `HashMap` serializes the same way everywhere.
//!
//! Token amounts are `u128`. JSON numbers above `u64::MAX` do not survive a
//! round trip through `serde_json::Value`, so amounts that cross the API use
//! the [`u128_string`] adapter and are rendered as decimal strings.

use thiserror::Error;

/// Errors raised while parsing a hex-encoded identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexError {
    #[error("invalid hex: {0}")]
    Decode(String),

    #[error("wrong length: expected {expected} bytes, got {actual}")]
    Length {
        /// Byte length the target type needs.
        expected: usize,
        /// Byte length that was actually decoded.
        actual: usize,
    },
}

/// Renders bytes as `0x`-prefixed lowercase hex.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decodes a hex string (with or without the `0x` prefix) into exactly `N` bytes.
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], HexError> {
    let trimmed = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(trimmed).map_err(|e| HexError::Decode(e.to_string()))?;
    if bytes.len() != N {
        return Err(HexError::Length {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Implements `Display`, `Debug`, `FromStr`, `Serialize` and `Deserialize`
/// for a `[u8; N]` newtype in terms of its `0x` hex form.
#[macro_export]
macro_rules! impl_hex_identifier {
    ($name:ident, $len:expr) => {
        impl $name {
            /// Wraps raw bytes.
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Returns the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// `0x`-prefixed lowercase hex.
            pub fn to_hex(&self) -> String {
                $crate::encoding::to_prefixed_hex(&self.0)
            }

            /// Parses hex with or without the `0x` prefix.
            pub fn from_hex(s: &str) -> Result<Self, $crate::encoding::HexError> {
                $crate::encoding::decode_fixed::<$len>(s).map(Self)
            }

            /// True for the all-zero value.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::encoding::HexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Serde adapter that writes a `u128` as a decimal string and reads either a
/// string or a plain JSON integer.
///
/// Use with `#[serde(with = "fns_protocol::encoding::u128_string")]`.
pub mod u128_string {
    use serde::{de, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        // bincode cannot drive `deserialize_any`; it always sees the string form.
        if !deserializer.is_human_readable() {
            let s = <String as serde::Deserialize>::deserialize(deserializer)?;
            return s.parse::<u128>().map_err(de::Error::custom);
        }

        struct AmountVisitor;

        impl<'de> de::Visitor<'de> for AmountVisitor {
            type Value = u128;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal string or an unsigned integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
                Ok(v as u128)
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
                Ok(v)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
                v.parse::<u128>().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}
