//! # Sealed Envelope Transport
//!
//! Envelope wire format and payload encryption built on `shared-crypto`.
//!
//! ```text
//! wire := MAGIC bincode(Envelope)
//! ```
//!
//! Direct payloads are encrypted under a random 256-bit secret. The secret
//! is wrapped once per receiver with `ECDH(sender, receiver)`, so the sender
//! and every receiver recover the same secret; that secret becomes the base
//! key of indirect relationships. Indirect payloads are encrypted directly
//! under the caller's key.

use crate::domain::envelope::{EncryptedPayload, Envelope, WrappedKey};
use crate::domain::errors::EnvelopeError;
use crate::domain::messages::MessageAction;
use crate::ports::outbound::EnvelopeTransport;
use shared_crypto::{decrypt, encrypt, shared_secret, Hash32, Nonce, PrivateKey, PublicKey, SecretKey};
use shared_types::Transaction;

/// Prefix of every serialized envelope.
pub const MAGIC: &[u8; 4] = b"RVE\x00";

pub struct SealedEnvelope {
    protocol_id: Vec<u8>,
}

impl SealedEnvelope {
    pub fn new(protocol_id: impl Into<Vec<u8>>) -> Self {
        Self {
            protocol_id: protocol_id.into(),
        }
    }
}

fn unwrap_secret(
    kek: &Hash32,
    wrapped: &WrappedKey,
) -> Result<Hash32, EnvelopeError> {
    let bytes = decrypt(
        &SecretKey::from_bytes(*kek),
        &wrapped.ciphertext,
        &Nonce::from_bytes(wrapped.nonce),
    )
    .map_err(|_| EnvelopeError::Undecryptable)?;
    bytes
        .try_into()
        .map_err(|_| EnvelopeError::Malformed("wrapped key is not 32 bytes".to_string()))
}

fn open(secret: &Hash32, nonce: &[u8; 24], ciphertext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    decrypt(
        &SecretKey::from_bytes(*secret),
        ciphertext,
        &Nonce::from_bytes(*nonce),
    )
    .map_err(|_| EnvelopeError::Undecryptable)
}

impl EnvelopeTransport for SealedEnvelope {
    fn wrap_action(&self, action: MessageAction) -> Envelope {
        Envelope {
            protocol_id: self.protocol_id.clone(),
            action,
            payloads: Vec::new(),
        }
    }

    fn add_encrypted_payload_direct(
        &self,
        envelope: &mut Envelope,
        payload: &[u8],
        tx: &Transaction,
        sender_index: u32,
        sender_key: &PrivateKey,
        receiver_keys: &[PublicKey],
    ) -> Result<Hash32, EnvelopeError> {
        if receiver_keys.is_empty() {
            return Err(EnvelopeError::NoReceivers);
        }

        let mut receiver_indexes = Vec::with_capacity(receiver_keys.len());
        for receiver in receiver_keys {
            let index = tx
                .outputs
                .iter()
                .position(|output| output.locking_script.public_key().ok() == Some(*receiver))
                .ok_or_else(|| EnvelopeError::ReceiverNotInTransaction(receiver.to_string()))?;
            receiver_indexes.push(index as u32);
        }

        let secret = SecretKey::generate();
        let (ciphertext, nonce) = encrypt(&secret, payload)?;

        let mut wrapped_keys = Vec::with_capacity(receiver_keys.len());
        for receiver in receiver_keys {
            let kek = shared_secret(sender_key, receiver)?;
            let (wrapped, wrap_nonce) = encrypt(&SecretKey::from_bytes(kek), secret.as_bytes())?;
            wrapped_keys.push(WrappedKey {
                nonce: *wrap_nonce.as_bytes(),
                ciphertext: wrapped,
            });
        }

        envelope.payloads.push(EncryptedPayload::Direct {
            sender_index,
            receiver_indexes,
            wrapped_keys,
            nonce: *nonce.as_bytes(),
            ciphertext,
        });
        Ok(*secret.as_bytes())
    }

    fn add_encrypted_payload_indirect(
        &self,
        envelope: &mut Envelope,
        payload: &[u8],
        _tx: &Transaction,
        key: &Hash32,
    ) -> Result<(), EnvelopeError> {
        let (ciphertext, nonce) = encrypt(&SecretKey::from_bytes(*key), payload)?;
        envelope.payloads.push(EncryptedPayload::Indirect {
            nonce: *nonce.as_bytes(),
            ciphertext,
        });
        Ok(())
    }

    fn serialize(&self, envelope: &Envelope) -> Result<Vec<u8>, EnvelopeError> {
        let body =
            bincode::serialize(envelope).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
        let mut out = Vec::with_capacity(MAGIC.len() + body.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Envelope, EnvelopeError> {
        let body = bytes.strip_prefix(&MAGIC[..]).ok_or(EnvelopeError::NotEnvelope)?;
        let envelope: Envelope =
            bincode::deserialize(body).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
        if envelope.protocol_id != self.protocol_id {
            return Err(EnvelopeError::WrongProtocol {
                expected: String::from_utf8_lossy(&self.protocol_id).into_owned(),
                found: String::from_utf8_lossy(&envelope.protocol_id).into_owned(),
            });
        }
        Ok(envelope)
    }

    fn sender_decrypt(
        &self,
        payload: &EncryptedPayload,
        tx: &Transaction,
        sender_key: &PrivateKey,
    ) -> Result<(Vec<u8>, Hash32), EnvelopeError> {
        let EncryptedPayload::Direct {
            receiver_indexes,
            wrapped_keys,
            nonce,
            ciphertext,
            ..
        } = payload
        else {
            return Err(EnvelopeError::SchemeMismatch);
        };

        for (index, wrapped) in receiver_indexes.iter().zip(wrapped_keys) {
            let Ok(output) = tx.output(*index) else {
                continue;
            };
            let Ok(receiver) = output.locking_script.public_key() else {
                continue;
            };
            let kek = shared_secret(sender_key, &receiver)?;
            if let Ok(secret) = unwrap_secret(&kek, wrapped) {
                return Ok((open(&secret, nonce, ciphertext)?, secret));
            }
        }
        Err(EnvelopeError::Undecryptable)
    }

    fn receiver_decrypt(
        &self,
        payload: &EncryptedPayload,
        tx: &Transaction,
        receiver_key: &PrivateKey,
    ) -> Result<(Vec<u8>, Hash32), EnvelopeError> {
        let EncryptedPayload::Direct {
            sender_index,
            receiver_indexes,
            wrapped_keys,
            nonce,
            ciphertext,
        } = payload
        else {
            return Err(EnvelopeError::SchemeMismatch);
        };

        let sender = tx
            .input_public_key(*sender_index)
            .map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
        let kek = shared_secret(receiver_key, &sender)?;
        let own_key = receiver_key.public_key();

        for (index, wrapped) in receiver_indexes.iter().zip(wrapped_keys) {
            let addressed_to_us = tx
                .output(*index)
                .ok()
                .and_then(|output| output.locking_script.public_key().ok())
                == Some(own_key);
            if !addressed_to_us {
                continue;
            }
            let secret = unwrap_secret(&kek, wrapped)?;
            return Ok((open(&secret, nonce, ciphertext)?, secret));
        }
        Err(EnvelopeError::Undecryptable)
    }

    fn indirect_decrypt(
        &self,
        payload: &EncryptedPayload,
        key: &Hash32,
    ) -> Result<Vec<u8>, EnvelopeError> {
        match payload {
            EncryptedPayload::Indirect { nonce, ciphertext } => open(key, nonce, ciphertext),
            EncryptedPayload::Direct { .. } => Err(EnvelopeError::SchemeMismatch),
        }
    }
}
