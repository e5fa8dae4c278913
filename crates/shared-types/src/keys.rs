//! Wallet key references.

use crate::errors::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wallet key chain a key was derived from.
///
/// Relationship initiators spend from `RelateOut` keys and are contacted
/// on `RelateIn` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum KeyType {
    External = 0,
    Internal = 1,
    RelateOut = 2,
    RelateIn = 3,
}

impl KeyType {
    /// Whether relationships may be keyed on this chain.
    pub fn is_relationship(self) -> bool {
        matches!(self, KeyType::RelateOut | KeyType::RelateIn)
    }
}

impl From<KeyType> for u32 {
    fn from(key_type: KeyType) -> Self {
        key_type as u32
    }
}

impl TryFrom<u32> for KeyType {
    type Error = TypesError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyType::External),
            1 => Ok(KeyType::Internal),
            2 => Ok(KeyType::RelateOut),
            3 => Ok(KeyType::RelateIn),
            other => Err(TypesError::UnknownKeyType(other)),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::External => "external",
            KeyType::Internal => "internal",
            KeyType::RelateOut => "relate-out",
            KeyType::RelateIn => "relate-in",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_numbering() {
        for (value, key_type) in [
            (0u32, KeyType::External),
            (1, KeyType::Internal),
            (2, KeyType::RelateOut),
            (3, KeyType::RelateIn),
        ] {
            assert_eq!(u32::from(key_type), value);
            assert_eq!(KeyType::try_from(value), Ok(key_type));
        }
    }

    #[test]
    fn test_unknown_key_type() {
        assert_eq!(KeyType::try_from(9), Err(TypesError::UnknownKeyType(9)));
    }

    #[test]
    fn test_relationship_chains() {
        assert!(KeyType::RelateIn.is_relationship());
        assert!(KeyType::RelateOut.is_relationship());
        assert!(!KeyType::External.is_relationship());
    }
}
