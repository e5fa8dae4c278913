//! # Domain Entities
//!
//! A `Relationship` is one shared channel; each counterparty is a `Member`.
//! Chain state (`next_hash`, `next_index`) is private so it can only move
//! forward through [`Relationship::advance`] / [`Member::advance`] or jump
//! ahead through `adopt`, and the cached one-time key is recomputed on every
//! move.

use serde::{Deserialize, Serialize};
use shared_crypto::{chain::ChainWalk, seed_hash, tweak_public, CryptoError, Hash32, PublicKey};
use shared_types::{KeyType, TxId};

/// How payloads inside a relationship are encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionType {
    /// Two parties; every message is keyed per recipient one-time key.
    Direct,
    /// Group channel; shared secret plus the sender's chain hash.
    Indirect,
}

impl EncryptionType {
    pub fn as_u32(self) -> u32 {
        match self {
            EncryptionType::Direct => 0,
            EncryptionType::Indirect => 1,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(EncryptionType::Direct),
            1 => Some(EncryptionType::Indirect),
            _ => None,
        }
    }
}

/// A located position on a key chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPosition {
    pub index: u64,
    pub hash: Hash32,
}

/// Scan `walk` up to and including `last_index` for the position whose
/// one-time key equals `target`.
fn search_chain(
    base: &PublicKey,
    walk: impl Iterator<Item = (u64, Hash32)>,
    last_index: u64,
    target: &PublicKey,
) -> Result<Option<ChainPosition>, CryptoError> {
    for (index, hash) in walk {
        if index > last_index {
            break;
        }
        if tweak_public(base, &hash)? == *target {
            return Ok(Some(ChainPosition { index, hash }));
        }
    }
    Ok(None)
}

/// One counterparty of a relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Counterparty static key, fixed for the life of the relationship.
    pub base_key: PublicKey,
    /// Whether this member has sent an accept.
    pub accepted: bool,
    next_hash: Hash32,
    next_index: u64,
    next_key: PublicKey,
}

impl Member {
    /// New member at the start of the chain rooted at `seed_hash`.
    pub fn new(base_key: PublicKey, seed_hash: Hash32) -> Result<Self, CryptoError> {
        Self::at_position(base_key, seed_hash, 1, false)
    }

    /// Member restored at an arbitrary chain position.
    pub fn at_position(
        base_key: PublicKey,
        next_hash: Hash32,
        next_index: u64,
        accepted: bool,
    ) -> Result<Self, CryptoError> {
        let next_key = tweak_public(&base_key, &next_hash)?;
        Ok(Self {
            base_key,
            accepted,
            next_hash,
            next_index,
            next_key,
        })
    }

    pub fn next_hash(&self) -> &Hash32 {
        &self.next_hash
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// One-time key this member will use next.
    pub fn next_key(&self) -> &PublicKey {
        &self.next_key
    }

    /// Step the chain once.
    pub fn advance(&mut self) -> Result<(), CryptoError> {
        let next_hash = shared_crypto::advance(&self.next_hash);
        self.next_key = tweak_public(&self.base_key, &next_hash)?;
        self.next_hash = next_hash;
        self.next_index += 1;
        Ok(())
    }

    /// Jump to a position found by a forward search.
    pub fn adopt(&mut self, position: ChainPosition) -> Result<(), CryptoError> {
        debug_assert!(position.index >= self.next_index);
        self.next_key = tweak_public(&self.base_key, &position.hash)?;
        self.next_hash = position.hash;
        self.next_index = position.index;
        Ok(())
    }

    /// Search positions `next_index + 1 ..= next_index + window`.
    pub fn find_forward(
        &self,
        target: &PublicKey,
        window: u32,
    ) -> Result<Option<ChainPosition>, CryptoError> {
        let walk = ChainWalk::from_position(self.next_hash, self.next_index).skip(1);
        search_chain(&self.base_key, walk, self.next_index + window as u64, target)
    }

    /// Search positions `1 ..= next_index + window` of the chain rooted at
    /// `seed_hash`.
    pub fn find_key(
        &self,
        seed_hash: Hash32,
        target: &PublicKey,
        window: u32,
    ) -> Result<Option<ChainPosition>, CryptoError> {
        search_chain(
            &self.base_key,
            ChainWalk::from_seed_hash(seed_hash),
            self.next_index + window as u64,
            target,
        )
    }
}

/// One shared secure channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Transaction that created the relationship; zero until known.
    pub tx_id: TxId,
    /// Reference to our static base key.
    pub key_type: KeyType,
    pub key_index: u32,
    /// Root of the chain, revealed to all parties in the initiate message.
    pub seed: Vec<u8>,
    /// Correlation tag, non-empty only for group channels.
    pub flag: Vec<u8>,
    pub encryption_type: EncryptionType,
    /// Shared secret; present if and only if `encryption_type` is `Indirect`.
    pub encryption_key: Option<Hash32>,
    pub accepted: bool,
    pub members: Vec<Member>,
    next_hash: Hash32,
    next_index: u64,
    base_key: PublicKey,
    next_key: PublicKey,
}

impl Relationship {
    /// New relationship at the start of the chain rooted at `seed`.
    pub fn new(
        key_type: KeyType,
        key_index: u32,
        base_key: PublicKey,
        seed: Vec<u8>,
        flag: Vec<u8>,
        encryption_type: EncryptionType,
    ) -> Result<Self, CryptoError> {
        let next_hash = seed_hash(&seed);
        let next_key = tweak_public(&base_key, &next_hash)?;
        Ok(Self {
            tx_id: TxId::ZERO,
            key_type,
            key_index,
            seed,
            flag,
            encryption_type,
            encryption_key: None,
            accepted: false,
            members: Vec::new(),
            next_hash,
            next_index: 1,
            base_key,
            next_key,
        })
    }

    /// Restore chain state loaded from storage; the one-time key is
    /// recomputed from `base_key`.
    pub(crate) fn restore_chain(
        &mut self,
        next_hash: Hash32,
        next_index: u64,
    ) -> Result<(), CryptoError> {
        self.next_key = tweak_public(&self.base_key, &next_hash)?;
        self.next_hash = next_hash;
        self.next_index = next_index;
        Ok(())
    }

    pub fn seed_hash(&self) -> Hash32 {
        seed_hash(&self.seed)
    }

    pub fn next_hash(&self) -> &Hash32 {
        &self.next_hash
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Our static base public key.
    pub fn base_key(&self) -> &PublicKey {
        &self.base_key
    }

    /// Our current one-time key.
    pub fn next_key(&self) -> &PublicKey {
        &self.next_key
    }

    /// Step our chain once.
    pub fn advance(&mut self) -> Result<(), CryptoError> {
        let next_hash = shared_crypto::advance(&self.next_hash);
        self.next_key = tweak_public(&self.base_key, &next_hash)?;
        self.next_hash = next_hash;
        self.next_index += 1;
        Ok(())
    }

    /// Jump our chain to a position found by a forward search.
    pub fn adopt(&mut self, position: ChainPosition) -> Result<(), CryptoError> {
        debug_assert!(position.index >= self.next_index);
        self.next_key = tweak_public(&self.base_key, &position.hash)?;
        self.next_hash = position.hash;
        self.next_index = position.index;
        Ok(())
    }

    /// Search our positions `next_index + 1 ..= next_index + window`.
    pub fn find_forward(
        &self,
        target: &PublicKey,
        window: u32,
    ) -> Result<Option<ChainPosition>, CryptoError> {
        let walk = ChainWalk::from_position(self.next_hash, self.next_index).skip(1);
        search_chain(&self.base_key, walk, self.next_index + window as u64, target)
    }

    /// Search our positions `1 ..= next_index + window`.
    pub fn find_key(
        &self,
        target: &PublicKey,
        window: u32,
    ) -> Result<Option<ChainPosition>, CryptoError> {
        search_chain(
            &self.base_key,
            ChainWalk::from_seed_hash(self.seed_hash()),
            self.next_index + window as u64,
            target,
        )
    }

    /// Index of the member whose current one-time key is `key`.
    pub fn member_with_next_key(&self, key: &PublicKey) -> Option<usize> {
        self.members.iter().position(|m| m.next_key() == key)
    }

    /// Index of the member with static key `key`.
    pub fn member_with_base_key(&self, key: &PublicKey) -> Option<usize> {
        self.members.iter().position(|m| &m.base_key == key)
    }
}
