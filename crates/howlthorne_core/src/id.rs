//! Identifiers for users, character slots and the keys they form on disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// A chat-platform user id (Discord snowflake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl UserId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    /// Snowflakes are never zero, so `"0"` is rejected too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(id) if id != 0 => Ok(UserId(id)),
            _ => Err(ValidationError::InvalidUser {
                given: s.to_string(),
            }),
        }
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One of the three character slots a user owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(u8);

impl Slot {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 3;
    pub const ALL: [Slot; 3] = [Slot(1), Slot(2), Slot(3)];

    pub fn new(n: u8) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&n) {
            Ok(Self(n))
        } else {
            Err(ValidationError::InvalidSlot {
                given: n.to_string(),
            })
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Name shown for a slot nobody has renamed.
    pub fn default_name(&self) -> String {
        format!("Character {}", self.0)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Slot {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidSlot {
            given: s.to_string(),
        };
        let n = s.trim().parse::<u8>().map_err(|_| invalid())?;
        Self::new(n).map_err(|_| invalid())
    }
}

impl TryFrom<u8> for Slot {
    type Error = ValidationError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

/// Addresses one character's point profile: `"{user}_slot{slot}"` on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LedgerKey {
    pub user: UserId,
    pub slot: Slot,
}

impl LedgerKey {
    pub fn new(user: UserId, slot: Slot) -> Self {
        Self { user, slot }
    }

    pub fn to_document_key(&self) -> String {
        format!("{}_slot{}", self.user, self.slot)
    }

    /// Parses `"{user}_slot{slot}"`. Returns `None` for anything else,
    /// including slot-name keys.
    pub fn from_document_key(key: &str) -> Option<Self> {
        let (user, slot) = key.split_once("_slot")?;
        Some(Self {
            user: user.parse().ok()?,
            slot: slot.parse().ok()?,
        })
    }

    /// Key of the display name belonging to the same slot.
    pub fn slot_name_key(&self) -> String {
        format!("{}_slotname{}", self.user, self.slot)
    }

    /// Parses `"{user}_slotname{slot}"`.
    pub fn from_slot_name_key(key: &str) -> Option<Self> {
        let (user, slot) = key.split_once("_slotname")?;
        Some(Self {
            user: user.parse().ok()?,
            slot: slot.parse().ok()?,
        })
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_document_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_bounds() {
        assert!(Slot::new(0).is_err());
        assert!(Slot::new(4).is_err());
        assert_eq!("2".parse::<Slot>().unwrap().get(), 2);
        assert!("two".parse::<Slot>().is_err());
        assert!("-1".parse::<Slot>().is_err());
    }

    #[test]
    fn test_document_keys() {
        let key = LedgerKey::new(UserId(42), Slot::new(3).unwrap());
        assert_eq!(key.to_document_key(), "42_slot3");
        assert_eq!(key.slot_name_key(), "42_slotname3");
        assert_eq!(LedgerKey::from_document_key("42_slot3"), Some(key));
        assert_eq!(LedgerKey::from_slot_name_key("42_slotname3"), Some(key));
    }

    #[test]
    fn test_zero_user_is_rejected() {
        assert!("0".parse::<UserId>().is_err());
        assert_eq!("17".parse::<UserId>(), Ok(UserId(17)));
        assert_eq!(LedgerKey::from_document_key("0_slot1"), None);
        assert_eq!(LedgerKey::from_slot_name_key("0_slotname2"), None);
    }

    #[test]
    fn test_slot_name_key_is_not_a_ledger_key() {
        assert_eq!(LedgerKey::from_document_key("42_slotname3"), None);
        assert_eq!(LedgerKey::from_document_key("42_slot9"), None);
        assert_eq!(LedgerKey::from_document_key("garbage"), None);
    }
}
