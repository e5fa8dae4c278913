//! # Relationship Messages
//!
//! The decrypted payload of every relationship transaction is one of these
//! kinds. The public part of a message (which inputs sent it, which outputs
//! receive it) travels unencrypted as a [`MessageAction`].

use super::entities::EncryptionType;
use super::errors::RelationshipError;
use serde::{Deserialize, Serialize};

/// Purpose of a new relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitiateKind {
    Conversation = 0,
}

/// How an identity proof should be interpreted. The proof itself is carried
/// opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofOfIdentityKind {
    Paymail = 1,
    IdentityOracle = 2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfIdentity {
    pub kind: ProofOfIdentityKind,
    pub payload: Vec<u8>,
}

/// Opens a relationship and reveals its seed to every receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiateRelationship {
    pub kind: InitiateKind,
    pub seed: Vec<u8>,
    pub flag: Vec<u8>,
    pub encryption_type: EncryptionType,
    pub proof_of_identity: Option<ProofOfIdentity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptRelationship {
    pub proof_of_identity: Option<ProofOfIdentity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
    pub subject: String,
    pub body: Vec<u8>,
}

/// Decrypted payload carried by a relationship transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipMessage {
    Initiate(InitiateRelationship),
    Accept(AcceptRelationship),
    Private(PrivateMessage),
}

impl RelationshipMessage {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelationshipMessage::Initiate(_) => "initiate",
            RelationshipMessage::Accept(_) => "accept",
            RelationshipMessage::Private(_) => "private",
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RelationshipError> {
        bincode::serialize(self).map_err(|e| RelationshipError::malformed("encode message", e))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RelationshipError> {
        bincode::deserialize(bytes).map_err(|e| RelationshipError::malformed("decode message", e))
    }
}

/// Public header of a message: which inputs sent it and which outputs
/// receive it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageAction {
    pub sender_indexes: Vec<u32>,
    pub receiver_indexes: Vec<u32>,
}

impl MessageAction {
    /// Declared sender inputs; input 0 when none are declared.
    pub fn senders(&self) -> Vec<u32> {
        if self.sender_indexes.is_empty() {
            vec![0]
        } else {
            self.sender_indexes.clone()
        }
    }

    /// Declared receiver outputs; output 0 when none are declared.
    pub fn receivers(&self) -> Vec<u32> {
        if self.receiver_indexes.is_empty() {
            vec![0]
        } else {
            self.receiver_indexes.clone()
        }
    }
}
