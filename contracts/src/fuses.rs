//! # Fuses
//!
//! A fuse is a permission bit that, once burned, stays burned. The bitmask
//! newtype has exactly one write path, [`Fuses::burn`], which ORs bits in.
//! There is no clearing path on the type at all; the wrapper forgets fuses
//! only by reading an expired record as empty.
//!
//! The low 16 bits are owner-controlled (the name's owner may burn them).
//! The high 16 bits are parent-controlled and can only be burned by the
//! parent on a child, or by the wrapper itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fuses(u32);

impl Fuses {
    pub const NONE: Fuses = Fuses(0);
    pub const CANNOT_UNWRAP: Fuses = Fuses(1);
    pub const CANNOT_BURN_FUSES: Fuses = Fuses(2);
    pub const CANNOT_TRANSFER: Fuses = Fuses(4);
    pub const CANNOT_SET_RESOLVER: Fuses = Fuses(8);
    pub const CANNOT_SET_TTL: Fuses = Fuses(16);
    pub const CANNOT_CREATE_SUBDOMAIN: Fuses = Fuses(32);
    pub const PARENT_CANNOT_CONTROL: Fuses = Fuses(64);
    /// Marks a second-level name under the registrar's TLD.
    pub const IS_BASE_NAME: Fuses = Fuses(1 << 17);
    pub const CAN_EXTEND_EXPIRY: Fuses = Fuses(1 << 18);

    pub const OWNER_CONTROLLED: u32 = 0x0000_FFFF;
    pub const PARENT_CONTROLLED: u32 = 0xFFFF_0000;

    const NAMED: [(Fuses, &'static str); 9] = [
        (Fuses::CANNOT_UNWRAP, "CANNOT_UNWRAP"),
        (Fuses::CANNOT_BURN_FUSES, "CANNOT_BURN_FUSES"),
        (Fuses::CANNOT_TRANSFER, "CANNOT_TRANSFER"),
        (Fuses::CANNOT_SET_RESOLVER, "CANNOT_SET_RESOLVER"),
        (Fuses::CANNOT_SET_TTL, "CANNOT_SET_TTL"),
        (Fuses::CANNOT_CREATE_SUBDOMAIN, "CANNOT_CREATE_SUBDOMAIN"),
        (Fuses::PARENT_CANNOT_CONTROL, "PARENT_CANNOT_CONTROL"),
        (Fuses::IS_BASE_NAME, "IS_BASE_NAME"),
        (Fuses::CAN_EXTEND_EXPIRY, "CAN_EXTEND_EXPIRY"),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        Fuses(bits)
    }

    /// Owner-controlled fuses from the 16-bit form clients send.
    pub const fn from_owner_bits(bits: u16) -> Self {
        Fuses(bits as u32)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is burned here.
    pub fn contains(&self, other: Fuses) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is burned here.
    pub fn intersects(&self, other: Fuses) -> bool {
        self.0 & other.0 != 0
    }

    /// The only write path: add bits, never remove them.
    #[must_use]
    pub fn burn(self, added: Fuses) -> Fuses {
        Fuses(self.0 | added.0)
    }

    pub fn is_owner_controlled(&self) -> bool {
        self.0 & !Self::OWNER_CONTROLLED == 0
    }

    pub fn has_parent_controlled(&self) -> bool {
        self.0 & Self::PARENT_CONTROLLED != 0
    }

    /// Owner-controlled bits other than `PARENT_CANNOT_CONTROL`.
    pub fn has_restrictive_owner_bits(&self) -> bool {
        self.0 & Self::OWNER_CONTROLLED & !Self::PARENT_CANNOT_CONTROL.0 != 0
    }
}

impl BitOr for Fuses {
    type Output = Fuses;

    fn bitor(self, rhs: Fuses) -> Fuses {
        self.burn(rhs)
    }
}

impl fmt::Debug for Fuses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fuses({:#x} {})", self.0, self)
    }
}

impl fmt::Display for Fuses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        let mut known = 0u32;
        for (fuse, name) in Self::NAMED {
            if self.contains(fuse) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
                known |= fuse.0;
            }
        }
        let unknown = self.0 & !known;
        if unknown != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "{unknown:#x}")?;
        }
        Ok(())
    }
}
