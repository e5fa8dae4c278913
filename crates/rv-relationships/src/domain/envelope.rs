//! Envelope types exchanged with the envelope transport.

use super::messages::MessageAction;
use serde::{Deserialize, Serialize};

/// Symmetric key wrapped for one receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    pub nonce: [u8; 24],
    pub ciphertext: Vec<u8>,
}

/// One encrypted payload inside an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptedPayload {
    /// Keyed by agreement between the sender input key and each receiver
    /// output key. `wrapped_keys[i]` belongs to `receiver_indexes[i]`.
    Direct {
        sender_index: u32,
        receiver_indexes: Vec<u32>,
        wrapped_keys: Vec<WrappedKey>,
        nonce: [u8; 24],
        ciphertext: Vec<u8>,
    },
    /// Keyed by a secret every relationship member can derive.
    Indirect { nonce: [u8; 24], ciphertext: Vec<u8> },
}

/// Data-carrier payload of a relationship transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub protocol_id: Vec<u8>,
    pub action: MessageAction,
    pub payloads: Vec<EncryptedPayload>,
}
