//! # Relationship Engine (rv-relationships)
//!
//! Private, unlinkable channels between wallets, carried entirely by
//! ordinary transactions. Parties share a seed once; after that every
//! message is sent from and addressed to one-time keys derived from each
//! party's static base key and a hash chain rooted at the seed.
//!
//! ## Key Ratchet
//!
//! ```text
//! h_1     = SHA256(seed)
//! h_{n+1} = SHA256(h_n)
//! key_n   = base_key + h_n·G
//! ```
//!
//! Every party knows every other party's base key and the seed, so each can
//! compute everyone's next one-time key without communicating. Observing a
//! one-time key on chain is the only synchronization signal; when a key is
//! not the expected one, a bounded forward search (`lookahead_window`
//! positions) tolerates reordered or missed traffic.
//!
//! ## Encryption Modes
//!
//! | Mode | Parties | Payload key |
//! |------|---------|-------------|
//! | `Direct` | 2 | Per-message secret wrapped by ECDH to each receiver's one-time key |
//! | `Indirect` | 3+ | `encryption_key + h` for the sender's chain position `h` |
//!
//! Indirect relationships publish a 32-byte flag output on every message so
//! members find the relationship without trying keys.
//!
//! ## Message Flow
//!
//! ```text
//! Initiator                         Receiver(s)
//!   initiate_relationship ──tx──→   process_transaction → Relationship
//!                         ←──tx──   accept_relationship
//!   process_transaction (accepted)
//!   send_message          ──tx──→   process_transaction → ReceivedMessage
//! ```
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, messages, store, persisted codec, configuration
//! - `ports/` - Inbound API and outbound wallet/envelope/storage traits
//! - `service/` - Application service implementing the API
//! - `adapters/` - Envelope transport and in-memory key-value store
//!
//! ## Usage
//!
//! ```ignore
//! use rv_relationships::{RelationshipApi, RelationshipService, RelationshipsConfig};
//!
//! let service = RelationshipService::new(deps, RelationshipsConfig::from_env())?;
//! let (relationship, _) = service.initiate_relationship(&[bob_key], None)?;
//!
//! // For every transaction seen on chain:
//! if service.is_relevant(&tx)? {
//!     let outcome = service.process_transaction(&tx)?;
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export key types for convenience
pub use adapters::{InMemoryKVStore, SealedEnvelope};
pub use domain::config::{ConfigError, RelationshipsConfig, PROTOCOL_ID, TEST_PROTOCOL_ID};
pub use domain::entities::{ChainPosition, EncryptionType, Member, Relationship};
pub use domain::envelope::{EncryptedPayload, Envelope, WrappedKey};
pub use domain::errors::{EnvelopeError, KVStoreError, RelationshipError, WalletError};
pub use domain::messages::{
    AcceptRelationship, InitiateKind, InitiateRelationship, MessageAction, PrivateMessage,
    ProofOfIdentity, ProofOfIdentityKind, RelationshipMessage,
};
pub use ports::inbound::{
    DecryptedAction, ProcessOutcome, ReceivedMessage, RelationshipApi, SentMessage,
};
pub use ports::outbound::{AddressRecord, Broadcaster, EnvelopeTransport, KeyValueStore, Wallet};
pub use service::{RelationshipDependencies, RelationshipService, STORE_KEY};
