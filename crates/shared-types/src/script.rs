//! # Scripts and Addresses
//!
//! Locking scripts are a closed set of templates. Anything that is not one
//! of them never reaches relationship code.

use crate::errors::TypesError;
use serde::{Deserialize, Serialize};
use shared_crypto::{key_hash, PublicKey};
use std::fmt;

/// 20-byte public key hash.
pub type KeyHash = [u8; 20];

/// Wallet-resolvable address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawAddress {
    /// Address committing to a key hash.
    PublicKeyHash(KeyHash),
    /// Address naming the key itself.
    PublicKey(PublicKey),
}

impl RawAddress {
    /// Hash address for `public_key`.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        RawAddress::PublicKeyHash(key_hash(public_key.as_bytes()))
    }

    /// Key hash implied by the address. Both variants resolve to the same
    /// hash for the same key.
    pub fn key_hash(&self) -> KeyHash {
        match self {
            RawAddress::PublicKeyHash(hash) => *hash,
            RawAddress::PublicKey(public_key) => key_hash(public_key.as_bytes()),
        }
    }
}

impl fmt::Display for RawAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.key_hash()))
    }
}

/// Output locking script templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockingScript {
    /// Pay to a bare public key. Relationship receivers are addressed this
    /// way so every observer can read the receiver key.
    PayToPublicKey(PublicKey),
    /// Pay to a key hash (change and funding outputs).
    PayToPublicKeyHash(KeyHash),
    /// Unspendable relationship flag marker.
    Flag(Vec<u8>),
    /// Unspendable data carrier holding a serialized envelope.
    Data(Vec<u8>),
}

impl LockingScript {
    /// Public key named by the script (P2PK only).
    pub fn public_key(&self) -> Result<PublicKey, TypesError> {
        match self {
            LockingScript::PayToPublicKey(public_key) => Ok(*public_key),
            _ => Err(TypesError::NoPublicKey),
        }
    }

    /// Address the script pays to.
    pub fn raw_address(&self) -> Result<RawAddress, TypesError> {
        match self {
            LockingScript::PayToPublicKey(public_key) => Ok(RawAddress::PublicKey(*public_key)),
            LockingScript::PayToPublicKeyHash(hash) => Ok(RawAddress::PublicKeyHash(*hash)),
            LockingScript::Flag(_) | LockingScript::Data(_) => Err(TypesError::NotAddress),
        }
    }

    /// Locking script paying to `address`.
    pub fn for_address(address: &RawAddress) -> Self {
        match address {
            RawAddress::PublicKey(public_key) => LockingScript::PayToPublicKey(*public_key),
            RawAddress::PublicKeyHash(hash) => LockingScript::PayToPublicKeyHash(*hash),
        }
    }
}

/// Input unlocking script.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnlockingScript {
    pub signature: Vec<u8>,
    pub public_key: Option<PublicKey>,
}

impl UnlockingScript {
    /// Public key revealed by the spend.
    pub fn public_key(&self) -> Result<PublicKey, TypesError> {
        self.public_key.ok_or(TypesError::NoPublicKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::PrivateKey;

    fn public_key() -> PublicKey {
        PrivateKey::from_bytes([0x33u8; 32]).unwrap().public_key()
    }

    #[test]
    fn test_address_variants_share_key_hash() {
        let key = public_key();
        assert_eq!(
            RawAddress::PublicKey(key).key_hash(),
            RawAddress::from_public_key(&key).key_hash()
        );
    }

    #[test]
    fn test_p2pk_exposes_key_and_address() {
        let key = public_key();
        let script = LockingScript::PayToPublicKey(key);

        assert_eq!(script.public_key(), Ok(key));
        assert_eq!(script.raw_address(), Ok(RawAddress::PublicKey(key)));
    }

    #[test]
    fn test_data_scripts_have_no_address() {
        assert_eq!(
            LockingScript::Flag(vec![1, 2]).raw_address(),
            Err(TypesError::NotAddress)
        );
        assert_eq!(
            LockingScript::Data(vec![]).public_key(),
            Err(TypesError::NoPublicKey)
        );
    }

    #[test]
    fn test_p2pkh_has_no_public_key() {
        let script = LockingScript::for_address(&RawAddress::from_public_key(&public_key()));
        assert_eq!(script.public_key(), Err(TypesError::NoPublicKey));
        assert!(script.raw_address().is_ok());
    }

    #[test]
    fn test_unsigned_input_has_no_key() {
        assert_eq!(
            UnlockingScript::default().public_key(),
            Err(TypesError::NoPublicKey)
        );
    }
}
