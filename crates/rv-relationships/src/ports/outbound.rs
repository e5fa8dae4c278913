//! # Outbound Ports (Driven Ports / SPI)
//!
//! Collaborators the relationship engine depends on but does not implement:
//! the wallet (key derivation, funding), the broadcaster, the envelope
//! transport (wire format and payload encryption) and a byte-blob store.

use crate::domain::envelope::{EncryptedPayload, Envelope};
use crate::domain::errors::{EnvelopeError, KVStoreError, WalletError};
use crate::domain::messages::MessageAction;
use shared_crypto::{Hash32, PrivateKey, PublicKey};
use shared_types::{KeyType, RawAddress, Transaction};

/// A wallet address resolved to the key that controls it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub address: RawAddress,
    /// Key controlling the address (a one-time key when `key_hash` is set).
    pub public_key: PublicKey,
    pub key_type: KeyType,
    pub key_index: u32,
    /// Chain hash the base key was tweaked by, for one-time keys.
    pub key_hash: Option<Hash32>,
}

/// Wallet collaborator.
pub trait Wallet: Send + Sync {
    /// Static private key at `(key_type, key_index)`.
    fn get_key(&self, key_type: KeyType, key_index: u32) -> Result<PrivateKey, WalletError>;

    /// Next unused address on `key_type`, reserving it.
    fn get_unused_address(&self, key_type: KeyType) -> Result<AddressRecord, WalletError>;

    /// Resolve an address (or the address implied by a public key) to one of
    /// our keys.
    fn find_address(&self, address: &RawAddress) -> Result<Option<AddressRecord>, WalletError>;

    /// Register a derived one-time key so transactions paying to it are
    /// recognised.
    fn add_independent_key(
        &self,
        public_key: &PublicKey,
        key_type: KeyType,
        key_index: u32,
        hash: Hash32,
    ) -> Result<(), WalletError>;

    /// Fund `tx` from the key at `(key_type, key_index)` tweaked by `hash`,
    /// sign it and hand it to `broadcaster`. The funding key's input is
    /// placed at index 0.
    fn add_key_funding(
        &self,
        key_type: KeyType,
        key_index: u32,
        hash: Option<&Hash32>,
        tx: &mut Transaction,
        broadcaster: &dyn Broadcaster,
    ) -> Result<(), WalletError>;
}

/// Transaction broadcaster.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, tx: &Transaction) -> Result<(), WalletError>;
}

/// Envelope transport: wire format and payload encryption.
pub trait EnvelopeTransport: Send + Sync {
    /// Start an envelope carrying the public `action` header.
    fn wrap_action(&self, action: MessageAction) -> Envelope;

    /// Encrypt `payload` from the key of input `sender_index` to every
    /// receiver key. Receivers must already have P2PK outputs in `tx`.
    /// Returns the symmetric secret every receiver recovers.
    fn add_encrypted_payload_direct(
        &self,
        envelope: &mut Envelope,
        payload: &[u8],
        tx: &Transaction,
        sender_index: u32,
        sender_key: &PrivateKey,
        receiver_keys: &[PublicKey],
    ) -> Result<Hash32, EnvelopeError>;

    /// Encrypt `payload` under a shared `key`.
    fn add_encrypted_payload_indirect(
        &self,
        envelope: &mut Envelope,
        payload: &[u8],
        tx: &Transaction,
        key: &Hash32,
    ) -> Result<(), EnvelopeError>;

    fn serialize(&self, envelope: &Envelope) -> Result<Vec<u8>, EnvelopeError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Envelope, EnvelopeError>;

    /// Open a direct payload as its sender. Returns plaintext and secret.
    fn sender_decrypt(
        &self,
        payload: &EncryptedPayload,
        tx: &Transaction,
        sender_key: &PrivateKey,
    ) -> Result<(Vec<u8>, Hash32), EnvelopeError>;

    /// Open a direct payload as one of its receivers. Returns plaintext and
    /// secret.
    fn receiver_decrypt(
        &self,
        payload: &EncryptedPayload,
        tx: &Transaction,
        receiver_key: &PrivateKey,
    ) -> Result<(Vec<u8>, Hash32), EnvelopeError>;

    /// Open an indirect payload with a shared key.
    fn indirect_decrypt(
        &self,
        payload: &EncryptedPayload,
        key: &Hash32,
    ) -> Result<Vec<u8>, EnvelopeError>;
}

/// Byte-blob key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError>;

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.get(key)?.is_some())
    }
}
