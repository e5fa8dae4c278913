//! # Error Types
//!
//! One discriminant per failure kind. Scanning code uses
//! [`RelationshipError::is_skippable`] rather than comparing messages.

use shared_crypto::CryptoError;
use shared_types::TypesError;
use std::fmt;
use thiserror::Error;

/// Errors raised by the relationship engine.
#[derive(Debug, Error)]
pub enum RelationshipError {
    /// Bad caller input (for example zero receivers).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A transaction or message does not have the expected shape.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// More than one sender declared; only single-sender messages are handled.
    #[error("Unsupported topology: {senders} sender indexes")]
    UnsupportedTopology { senders: usize },

    /// Transaction references a relationship but none of our keys.
    #[error("Not a member of the relationship")]
    NotAMember,

    /// No relationship matches the flag, tx id or key reference.
    #[error("Relationship not found")]
    NotFound,

    /// Bounded chain search exhausted.
    #[error("Key not found within lookahead window")]
    KeyNotFound,

    #[error("Relationship already accepted")]
    AlreadyAccepted,

    #[error("Relationship not accepted")]
    NotAccepted,

    /// Key tweak or encryption primitive failure.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Persisted record carries an unknown format version.
    #[error("Unsupported version: found {found}, supported {supported}")]
    UnsupportedVersion { found: u8, supported: u8 },

    /// Output is not relationship traffic or no local key opens it.
    #[error("Not tokenized or undecryptable: {0}")]
    NotTokenizedOrUndecryptable(String),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("Storage error: {0}")]
    Storage(#[from] KVStoreError),
}

impl RelationshipError {
    /// Whether a scanner should move on to the next candidate instead of
    /// failing the surrounding batch.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            RelationshipError::NotFound
                | RelationshipError::KeyNotFound
                | RelationshipError::NotTokenizedOrUndecryptable(_)
        )
    }

    pub(crate) fn malformed(context: &str, err: impl fmt::Display) -> Self {
        RelationshipError::MalformedMessage(format!("{}: {}", context, err))
    }
}

impl From<TypesError> for RelationshipError {
    fn from(err: TypesError) -> Self {
        RelationshipError::MalformedMessage(err.to_string())
    }
}

/// Wallet collaborator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Key {key_type}/{key_index} not available")]
    KeyUnavailable { key_type: u32, key_index: u32 },

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    #[error("Wallet crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Wallet failure: {0}")]
    Other(String),
}

/// Envelope transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Bytes are not an envelope at all.
    #[error("Not an envelope")]
    NotEnvelope,

    #[error("Wrong protocol: expected {expected}, found {found}")]
    WrongProtocol { expected: String, found: String },

    #[error("Malformed envelope: {0}")]
    Malformed(String),

    #[error("Direct payload requires at least one receiver")]
    NoReceivers,

    /// A receiver key has no P2PK output in the transaction.
    #[error("Receiver {0} has no output in the transaction")]
    ReceiverNotInTransaction(String),

    /// Payload uses the other encryption scheme.
    #[error("Payload encryption scheme mismatch")]
    SchemeMismatch,

    #[error("Payload could not be decrypted with the given key")]
    Undecryptable,

    #[error("Envelope crypto failure: {0}")]
    Crypto(#[from] CryptoError),
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}
