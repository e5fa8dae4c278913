//! # Relationship Service - Encryption Dispatch
//!
//! Chooses the decryption path for an output and applies whole
//! transactions.
//!
//! Indirect relationships are tried first when the transaction's flag names
//! one: each input key is located on a chain of the relationship and the
//! payload is opened with `encryption_key + chain_hash`. Everything else
//! (and indirect traffic that did not open, such as the initiate itself)
//! goes through the direct path, which needs no relationship at all: any
//! sender or receiver key held by the wallet is tried against the payload.

use super::*;
use crate::domain::entities::{EncryptionType, Relationship};
use crate::domain::envelope::{EncryptedPayload, Envelope};
use crate::domain::messages::RelationshipMessage;
use crate::ports::inbound::{DecryptedAction, ProcessOutcome};
use rv_telemetry::metrics::{MESSAGES_RECEIVED, OUTPUTS_SKIPPED};
use shared_crypto::{add_hashes, Hash32, PublicKey};
use shared_types::{LockingScript, RawAddress, Transaction};

fn undecryptable(reason: impl ToString) -> RelationshipError {
    RelationshipError::NotTokenizedOrUndecryptable(reason.to_string())
}

impl<W, E, B> RelationshipService<W, E, B>
where
    W: Wallet,
    E: EnvelopeTransport,
    B: Broadcaster,
{
    /// Chain hash of `key` on any chain of `r`: our own or a member's,
    /// expected position first, then the bounded search from the seed.
    ///
    /// ## Errors
    ///
    /// - `KeyNotFound`: no chain of `r` produces `key` within the window
    pub(crate) fn find_hash(
        &self,
        r: &Relationship,
        key: &PublicKey,
    ) -> Result<Hash32, RelationshipError> {
        if r.next_key() == key {
            return Ok(*r.next_hash());
        }
        if let Some(member) = r.members.iter().find(|m| m.next_key() == key) {
            return Ok(*member.next_hash());
        }

        let window = self.config.lookahead_window;
        if let Some(position) = r.find_key(key, window)? {
            return Ok(position.hash);
        }
        let seed_hash = r.seed_hash();
        for member in &r.members {
            if let Some(position) = member.find_key(seed_hash, key, window)? {
                return Ok(position.hash);
            }
        }
        Err(RelationshipError::KeyNotFound)
    }

    /// Open an indirect payload sent from any input key of `tx`.
    fn decrypt_indirect(
        &self,
        r: &Relationship,
        tx: &Transaction,
        envelope: &Envelope,
    ) -> Result<Option<Vec<u8>>, RelationshipError> {
        let Some(encryption_key) = r.encryption_key else {
            return Ok(None);
        };

        for sender in tx.input_public_keys() {
            let hash = match self.find_hash(r, &sender) {
                Ok(hash) => hash,
                Err(e) if e.is_skippable() => continue,
                Err(e) => return Err(e),
            };
            let key = add_hashes(&encryption_key, &hash);
            for payload in &envelope.payloads {
                if let EncryptedPayload::Indirect { .. } = payload {
                    if let Ok(plaintext) = self.envelope.indirect_decrypt(payload, &key) {
                        return Ok(Some(plaintext));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Open a direct payload with any sender or receiver key the wallet
    /// holds. Returns the plaintext and the payload secret.
    fn decrypt_direct(
        &self,
        tx: &Transaction,
        envelope: &Envelope,
    ) -> Result<Option<(Vec<u8>, Hash32)>, RelationshipError> {
        for payload in &envelope.payloads {
            let EncryptedPayload::Direct {
                sender_index,
                receiver_indexes,
                ..
            } = payload
            else {
                continue;
            };

            if let Ok(sender) = tx.input_public_key(*sender_index) {
                if let Some(record) = self.relationship_record(&sender)? {
                    let key = self.private_key_for(&record)?;
                    if let Ok(opened) = self.envelope.sender_decrypt(payload, tx, &key) {
                        return Ok(Some(opened));
                    }
                }
            }

            for index in receiver_indexes {
                let Ok(output) = tx.output(*index) else {
                    continue;
                };
                let Ok(address) = output.locking_script.raw_address() else {
                    continue;
                };
                if let Some(record) = self.wallet.find_address(&address)? {
                    let key = self.private_key_for(&record)?;
                    if let Ok(opened) = self.envelope.receiver_decrypt(payload, tx, &key) {
                        return Ok(Some(opened));
                    }
                }
            }
        }
        Ok(None)
    }

    /// [`RelationshipApi::decrypt_action`] against an already locked store.
    ///
    /// [`RelationshipApi::decrypt_action`]: crate::ports::inbound::RelationshipApi::decrypt_action
    pub(crate) fn decrypt_locked(
        &self,
        store: &RelationshipStore,
        tx: &Transaction,
        output_index: u32,
        flag: &[u8],
    ) -> Result<DecryptedAction, RelationshipError> {
        let output = tx.output(output_index).map_err(undecryptable)?;
        let LockingScript::Data(bytes) = &output.locking_script else {
            return Err(undecryptable("output carries no data"));
        };
        let envelope = self.envelope.deserialize(bytes).map_err(undecryptable)?;

        if let Some(r) = store.find_by_flag(flag) {
            if r.encryption_type == EncryptionType::Indirect {
                if let Some(plaintext) = self.decrypt_indirect(r, tx, &envelope)? {
                    return Ok(DecryptedAction {
                        action: envelope.action,
                        message: RelationshipMessage::from_bytes(&plaintext)?,
                        encryption_key: None,
                    });
                }
            }
        }

        match self.decrypt_direct(tx, &envelope)? {
            Some((plaintext, secret)) => Ok(DecryptedAction {
                action: envelope.action,
                message: RelationshipMessage::from_bytes(&plaintext)?,
                encryption_key: Some(secret),
            }),
            None => Err(undecryptable("no local key opens the envelope")),
        }
    }

    /// [`RelationshipApi::process_transaction`] body.
    ///
    /// [`RelationshipApi::process_transaction`]: crate::ports::inbound::RelationshipApi::process_transaction
    pub(crate) fn process_transaction_inner(
        &self,
        tx: &Transaction,
    ) -> Result<ProcessOutcome, RelationshipError> {
        let tx_id = tx.id()?;
        let mut store = self.store.lock();
        if store.was_processed(&tx_id) {
            tracing::debug!(tx_id = %tx_id, "Transaction already processed");
            return Ok(ProcessOutcome::default());
        }

        let (outcome, applied) = self.apply_transaction(&mut store, tx)?;
        if applied {
            store.mark_processed(tx_id);
        }
        Ok(outcome)
    }

    /// Apply every relationship output of `tx`. The flag is `true` when at
    /// least one output changed relationship state.
    fn apply_transaction(
        &self,
        store: &mut RelationshipStore,
        tx: &Transaction,
    ) -> Result<(ProcessOutcome, bool), RelationshipError> {
        let flag = tx.flag().unwrap_or_default().to_vec();
        let mut outcome = ProcessOutcome::default();
        let mut applied = false;

        for (index, output) in tx.outputs.iter().enumerate() {
            if !matches!(output.locking_script, LockingScript::Data(_)) {
                continue;
            }
            let decrypted = match self.decrypt_locked(store, tx, index as u32, &flag) {
                Ok(decrypted) => decrypted,
                Err(e) if e.is_skippable() => {
                    tracing::trace!(output = index, error = %e, "Skipping output");
                    OUTPUTS_SKIPPED.inc();
                    continue;
                }
                Err(e) => return Err(e),
            };

            let DecryptedAction {
                action,
                message,
                encryption_key,
            } = decrypted;
            MESSAGES_RECEIVED.with_label_values(&[message.kind()]).inc();

            let result = match message {
                RelationshipMessage::Initiate(payload) => self
                    .process_initiate(store, tx, &action, payload, encryption_key)
                    .map(|r| outcome.initiated.push(r.tx_id)),
                RelationshipMessage::Accept(_) => self
                    .process_accept(store, tx, &flag, &action)
                    .map(|(relationship_tx_id, refeed)| {
                        outcome.accepted.push(relationship_tx_id);
                        outcome.refeed |= refeed;
                    }),
                RelationshipMessage::Private(message) => self
                    .process_private_message(store, tx, &flag, &action, message)
                    .map(|received| outcome.messages.push(received)),
            };
            match result {
                Ok(()) => applied = true,
                Err(e) if e.is_skippable() => {
                    tracing::debug!(output = index, error = %e, "Decrypted output matched no relationship");
                    OUTPUTS_SKIPPED.inc();
                }
                Err(e) => return Err(e),
            }
        }

        Ok((outcome, applied))
    }

    /// [`RelationshipApi::is_relevant`] body.
    ///
    /// [`RelationshipApi::is_relevant`]: crate::ports::inbound::RelationshipApi::is_relevant
    pub(crate) fn is_relevant_inner(&self, tx: &Transaction) -> Result<bool, RelationshipError> {
        let store = self.store.lock();
        if let Some(flag) = tx.flag() {
            if store.find_by_flag(flag).is_some() {
                return Ok(true);
            }
        }

        for key in tx.input_public_keys() {
            if self.wallet.find_address(&RawAddress::from_public_key(&key))?.is_some() {
                return Ok(true);
            }
            if self.position_by_member_key(&store, &key)?.is_some() {
                return Ok(true);
            }
        }
        for output in &tx.outputs {
            if let Ok(address) = output.locking_script.raw_address() {
                if self.wallet.find_address(&address)?.is_some() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
