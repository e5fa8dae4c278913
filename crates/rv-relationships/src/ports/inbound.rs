//! # Inbound Ports (Driving Ports)
//!
//! The API this crate exposes to a command layer or transaction listener.

use crate::domain::entities::Relationship;
use crate::domain::errors::RelationshipError;
use crate::domain::messages::{
    AcceptRelationship, InitiateRelationship, MessageAction, PrivateMessage, ProofOfIdentity,
    RelationshipMessage,
};
use crate::ports::outbound::KeyValueStore;
use shared_crypto::{Hash32, PublicKey};
use shared_types::{Transaction, TxId};

/// A message we broadcast, with the id of the carrying transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage<M> {
    pub tx_id: TxId,
    pub message: M,
}

/// Result of opening one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedAction {
    pub action: MessageAction,
    pub message: RelationshipMessage,
    /// Secret recovered by direct decryption; the base secret of an
    /// indirect relationship when the message is an initiate.
    pub encryption_key: Option<Hash32>,
}

/// A private message observed on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub relationship_tx_id: TxId,
    /// Whether the message is our own, observed back from the network.
    pub is_sender: bool,
    /// Base key of the member that sent it, when it was not us.
    pub sender: Option<PublicKey>,
    pub message: PrivateMessage,
}

/// Everything a transaction contributed to relationship state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Relationships created or confirmed by initiate messages.
    pub initiated: Vec<TxId>,
    /// Relationships whose acceptance state changed.
    pub accepted: Vec<TxId>,
    pub messages: Vec<ReceivedMessage>,
    /// Recent transactions should be re-fed through the filter.
    pub refeed: bool,
}

/// Primary API of the relationship engine.
pub trait RelationshipApi {
    /// Snapshot of every relationship.
    fn list_relationships(&self) -> Vec<Relationship>;

    fn find_relationship_for_tx_id(&self, tx_id: &TxId) -> Option<Relationship>;

    fn find_relationship_for_flag(&self, flag: &[u8]) -> Option<Relationship>;

    /// Open a relationship with `receivers`.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: no receivers, duplicate receivers, or a receiver
    ///   equal to our own base key
    /// - `Crypto`: key derivation failed; nothing is stored
    fn initiate_relationship(
        &self,
        receivers: &[PublicKey],
        proof_of_identity: Option<ProofOfIdentity>,
    ) -> Result<(Relationship, InitiateRelationship), RelationshipError>;

    /// Accept a relationship someone else opened.
    ///
    /// ## Errors
    ///
    /// - `NotFound`: no relationship with that id
    /// - `AlreadyAccepted`
    fn accept_relationship(
        &self,
        relationship_tx_id: &TxId,
        proof_of_identity: Option<ProofOfIdentity>,
    ) -> Result<SentMessage<AcceptRelationship>, RelationshipError>;

    /// Send a private message over an accepted relationship.
    ///
    /// ## Errors
    ///
    /// - `NotFound`: no relationship with that id
    /// - `NotAccepted`
    fn send_message(
        &self,
        relationship_tx_id: &TxId,
        message: PrivateMessage,
    ) -> Result<SentMessage<PrivateMessage>, RelationshipError>;

    /// Open the envelope in output `output_index`.
    ///
    /// `NotTokenizedOrUndecryptable` means "not ours", not a failure.
    fn decrypt_action(
        &self,
        tx: &Transaction,
        output_index: u32,
        flag: &[u8],
    ) -> Result<DecryptedAction, RelationshipError>;

    /// Apply every relationship message in `tx`. A transaction is applied at
    /// most once.
    fn process_transaction(&self, tx: &Transaction) -> Result<ProcessOutcome, RelationshipError>;

    /// Whether `tx` could touch any relationship.
    fn is_relevant(&self, tx: &Transaction) -> Result<bool, RelationshipError>;

    /// Replace in-memory state with the collection stored in `store`.
    fn load(&self, store: &dyn KeyValueStore) -> Result<(), RelationshipError>;

    fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), RelationshipError>;
}
