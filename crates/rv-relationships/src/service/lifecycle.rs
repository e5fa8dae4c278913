//! # Relationship Service - Lifecycle
//!
//! Initiate, accept and send on the local side, and the matching
//! `process_*` handlers for messages observed on chain.
//!
//! Chain-advance rule for anything we send: our chain always advances after
//! broadcast; member chains advance only for direct relationships, where
//! every member's one-time key was consumed as a receiver address.

use super::helpers::advance_member;
use super::*;
use crate::domain::entities::{EncryptionType, Member, Relationship};
use crate::domain::messages::{
    AcceptRelationship, InitiateKind, InitiateRelationship, MessageAction, PrivateMessage,
    ProofOfIdentity, RelationshipMessage,
};
use crate::ports::inbound::{ReceivedMessage, SentMessage};
use rand::RngCore;
use rv_telemetry::metrics::{MESSAGES_SENT, RELATIONSHIPS_ACTIVE, RELATIONSHIPS_CREATED};
use shared_crypto::{add_hashes, tweak_private, Hash32, PublicKey};
use shared_types::{KeyType, LockingScript, Transaction, TxId};
use std::collections::HashSet;

/// Length of seeds and flags drawn at initiation.
const RANDOM_LEN: usize = 32;

fn random_bytes() -> Vec<u8> {
    let mut bytes = vec![0u8; RANDOM_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Our side of an initiate transaction.
struct LocalKey {
    key_type: KeyType,
    key_index: u32,
    base_key: PublicKey,
    is_sender: bool,
}

impl<W, E, B> RelationshipService<W, E, B>
where
    W: Wallet,
    E: EnvelopeTransport,
    B: Broadcaster,
{
    /// Open a relationship with `receivers` from a fresh `RelateOut` key.
    pub(crate) fn initiate(
        &self,
        receivers: &[PublicKey],
        proof_of_identity: Option<ProofOfIdentity>,
    ) -> Result<(Relationship, InitiateRelationship), RelationshipError> {
        if receivers.is_empty() {
            return Err(RelationshipError::InvalidArgument(
                "at least one receiver is required".to_string(),
            ));
        }
        let unique: HashSet<&PublicKey> = receivers.iter().collect();
        if unique.len() != receivers.len() {
            return Err(RelationshipError::InvalidArgument(
                "duplicate receiver".to_string(),
            ));
        }

        let mut store = self.store.lock();

        let address = self.wallet.get_unused_address(KeyType::RelateOut)?;
        if receivers.contains(&address.public_key) {
            return Err(RelationshipError::InvalidArgument(
                "receiver is our own key".to_string(),
            ));
        }

        let seed = random_bytes();
        let (flag, encryption_type) = if receivers.len() > 1 {
            (random_bytes(), EncryptionType::Indirect)
        } else {
            (Vec::new(), EncryptionType::Direct)
        };

        let mut relationship = Relationship::new(
            KeyType::RelateOut,
            address.key_index,
            address.public_key,
            seed.clone(),
            flag.clone(),
            encryption_type,
        )?;
        let seed_hash = relationship.seed_hash();
        relationship.members = receivers
            .iter()
            .map(|key| Member::new(*key, seed_hash))
            .collect::<Result<_, _>>()?;

        let message = InitiateRelationship {
            kind: InitiateKind::Conversation,
            seed,
            flag: flag.clone(),
            encryption_type,
            proof_of_identity,
        };
        let payload = RelationshipMessage::Initiate(message.clone()).to_bytes()?;
        let sender_key = self.wallet.get_key(KeyType::RelateOut, address.key_index)?;

        let mut tx = Transaction::new();
        let receiver_indexes = receivers
            .iter()
            .map(|key| tx.add_output(LockingScript::PayToPublicKey(*key), self.config.dust_limit))
            .collect();
        if encryption_type == EncryptionType::Indirect {
            tx.add_output(LockingScript::Flag(flag), 0);
        }

        let mut envelope = self.envelope.wrap_action(MessageAction {
            sender_indexes: vec![0],
            receiver_indexes,
        });
        let secret = self.envelope.add_encrypted_payload_direct(
            &mut envelope,
            &payload,
            &tx,
            0,
            &sender_key,
            receivers,
        )?;
        tx.add_output(LockingScript::Data(self.envelope.serialize(&envelope)?), 0);

        self.wallet.add_key_funding(
            KeyType::RelateOut,
            address.key_index,
            None,
            &mut tx,
            self.broadcaster.as_ref(),
        )?;

        relationship.tx_id = tx.id()?;
        if encryption_type == EncryptionType::Indirect {
            relationship.encryption_key = Some(secret);
        }
        relationship.accepted = true;

        self.register_window(&relationship)?;
        store.append(relationship.clone());

        RELATIONSHIPS_CREATED.with_label_values(&["initiator"]).inc();
        RELATIONSHIPS_ACTIVE.set(store.len() as i64);
        MESSAGES_SENT.with_label_values(&["initiate"]).inc();
        tracing::info!(
            tx_id = %relationship.tx_id,
            receivers = receivers.len(),
            encryption = ?encryption_type,
            "Initiated relationship"
        );

        Ok((relationship, message))
    }

    /// Apply an observed initiate message.
    pub(crate) fn process_initiate(
        &self,
        store: &mut RelationshipStore,
        tx: &Transaction,
        action: &MessageAction,
        payload: InitiateRelationship,
        encryption_key: Option<Hash32>,
    ) -> Result<Relationship, RelationshipError> {
        let tx_id = tx.id()?;
        if let Some(existing) = store.find_by_tx_id(&tx_id) {
            tracing::debug!(tx_id = %tx_id, "Initiate already applied");
            return Ok(existing.clone());
        }

        let senders = action.senders();
        if senders.len() > 1 {
            return Err(RelationshipError::UnsupportedTopology {
                senders: senders.len(),
            });
        }

        let mut local: Option<LocalKey> = None;
        let mut member_keys = Vec::new();

        for index in senders {
            let key = tx.input_public_key(index)?;
            match self.relationship_record(&key)? {
                Some(record) if record.key_type == KeyType::RelateOut && record.key_hash.is_none() => {
                    local = Some(LocalKey {
                        key_type: record.key_type,
                        key_index: record.key_index,
                        base_key: record.public_key,
                        is_sender: true,
                    });
                }
                Some(_) => {
                    return Err(RelationshipError::MalformedMessage(
                        "initiate sent from a key that is not a base RelateOut key".to_string(),
                    ))
                }
                None => member_keys.push(key),
            }
        }

        for index in action.receivers() {
            let key = tx
                .output(index)?
                .locking_script
                .public_key()
                .map_err(|e| RelationshipError::malformed("initiate receiver", e))?;
            match self.relationship_record(&key)? {
                Some(record)
                    if local.is_none()
                        && record.key_type == KeyType::RelateIn
                        && record.key_hash.is_none() =>
                {
                    local = Some(LocalKey {
                        key_type: record.key_type,
                        key_index: record.key_index,
                        base_key: record.public_key,
                        is_sender: false,
                    });
                }
                _ => member_keys.push(key),
            }
        }

        let local = local.ok_or(RelationshipError::NotAMember)?;
        if member_keys.contains(&local.base_key) {
            return Err(RelationshipError::MalformedMessage(
                "member key equals our own key".to_string(),
            ));
        }
        if payload.encryption_type == EncryptionType::Indirect && encryption_key.is_none() {
            return Err(RelationshipError::MalformedMessage(
                "indirect relationship without an encryption key".to_string(),
            ));
        }

        let mut relationship = Relationship::new(
            local.key_type,
            local.key_index,
            local.base_key,
            payload.seed,
            payload.flag,
            payload.encryption_type,
        )?;
        relationship.tx_id = tx_id;
        if payload.encryption_type == EncryptionType::Indirect {
            relationship.encryption_key = encryption_key;
        }
        relationship.accepted = local.is_sender;
        let seed_hash = relationship.seed_hash();
        relationship.members = member_keys
            .into_iter()
            .map(|key| Member::new(key, seed_hash))
            .collect::<Result<_, _>>()?;

        self.register_window(&relationship)?;
        store.append(relationship.clone());

        let role = if local.is_sender { "initiator" } else { "receiver" };
        RELATIONSHIPS_CREATED.with_label_values(&[role]).inc();
        RELATIONSHIPS_ACTIVE.set(store.len() as i64);
        tracing::info!(
            tx_id = %tx_id,
            role,
            members = relationship.members.len(),
            "Relationship created from initiate"
        );

        Ok(relationship)
    }

    /// Accept a relationship someone else opened.
    pub(crate) fn accept(
        &self,
        relationship_tx_id: &TxId,
        proof_of_identity: Option<ProofOfIdentity>,
    ) -> Result<SentMessage<AcceptRelationship>, RelationshipError> {
        let mut store = self.store.lock();
        let position = store
            .position_by_tx_id(relationship_tx_id)
            .ok_or(RelationshipError::NotFound)?;
        if store.get(position).map_or(false, |r| r.accepted) {
            return Err(RelationshipError::AlreadyAccepted);
        }

        let message = AcceptRelationship { proof_of_identity };
        let tx_id = self.broadcast_message(
            &mut store,
            position,
            &RelationshipMessage::Accept(message.clone()),
        )?;
        if let Some(r) = store.get_mut(position) {
            r.accepted = true;
        }

        tracing::info!(relationship = %relationship_tx_id, tx_id = %tx_id, "Accepted relationship");
        Ok(SentMessage { tx_id, message })
    }

    /// Send a private message over an accepted relationship.
    pub(crate) fn send(
        &self,
        relationship_tx_id: &TxId,
        message: PrivateMessage,
    ) -> Result<SentMessage<PrivateMessage>, RelationshipError> {
        let mut store = self.store.lock();
        let position = store
            .position_by_tx_id(relationship_tx_id)
            .ok_or(RelationshipError::NotFound)?;
        if !store.get(position).map_or(false, |r| r.accepted) {
            return Err(RelationshipError::NotAccepted);
        }

        let tx_id = self.broadcast_message(
            &mut store,
            position,
            &RelationshipMessage::Private(message.clone()),
        )?;

        tracing::info!(relationship = %relationship_tx_id, tx_id = %tx_id, "Sent private message");
        Ok(SentMessage { tx_id, message })
    }

    /// Encrypt `message` from our current one-time key, fund and broadcast
    /// it, then advance the chains it consumed.
    fn broadcast_message(
        &self,
        store: &mut RelationshipStore,
        position: usize,
        message: &RelationshipMessage,
    ) -> Result<TxId, RelationshipError> {
        let r = store.get(position).ok_or(RelationshipError::NotFound)?;
        let next_hash = *r.next_hash();
        let base = self.wallet.get_key(r.key_type, r.key_index)?;
        let sender_key = tweak_private(&base, &next_hash)?;
        let payload = message.to_bytes()?;

        let mut tx = Transaction::new();
        let envelope = match r.encryption_type {
            EncryptionType::Direct => {
                let receivers: Vec<PublicKey> = r.members.iter().map(|m| *m.next_key()).collect();
                let receiver_indexes = receivers
                    .iter()
                    .map(|key| {
                        tx.add_output(LockingScript::PayToPublicKey(*key), self.config.dust_limit)
                    })
                    .collect();
                let mut envelope = self.envelope.wrap_action(MessageAction {
                    sender_indexes: vec![0],
                    receiver_indexes,
                });
                self.envelope.add_encrypted_payload_direct(
                    &mut envelope,
                    &payload,
                    &tx,
                    0,
                    &sender_key,
                    &receivers,
                )?;
                envelope
            }
            EncryptionType::Indirect => {
                let encryption_key = r.encryption_key.ok_or_else(|| {
                    RelationshipError::MalformedMessage(
                        "indirect relationship without an encryption key".to_string(),
                    )
                })?;
                tx.add_output(LockingScript::Flag(r.flag.clone()), 0);
                let mut envelope = self.envelope.wrap_action(MessageAction {
                    sender_indexes: vec![0],
                    receiver_indexes: Vec::new(),
                });
                self.envelope.add_encrypted_payload_indirect(
                    &mut envelope,
                    &payload,
                    &tx,
                    &add_hashes(&encryption_key, &next_hash),
                )?;
                envelope
            }
        };
        tx.add_output(LockingScript::Data(self.envelope.serialize(&envelope)?), 0);

        self.wallet.add_key_funding(
            r.key_type,
            r.key_index,
            Some(&next_hash),
            &mut tx,
            self.broadcaster.as_ref(),
        )?;
        let tx_id = tx.id()?;

        let r = store.get_mut(position).ok_or(RelationshipError::NotFound)?;
        self.advance_local(r)?;
        if r.encryption_type == EncryptionType::Direct {
            for member in &mut r.members {
                advance_member(member)?;
            }
        }

        MESSAGES_SENT.with_label_values(&[message.kind()]).inc();
        Ok(tx_id)
    }

    /// Apply an observed accept. Returns the relationship id and whether
    /// recent transactions should be re-fed.
    pub(crate) fn process_accept(
        &self,
        store: &mut RelationshipStore,
        tx: &Transaction,
        flag: &[u8],
        action: &MessageAction,
    ) -> Result<(TxId, bool), RelationshipError> {
        let matched = self.match_transaction(store, tx, flag, action)?;
        let r = store
            .get_mut(matched.position)
            .ok_or(RelationshipError::NotFound)?;

        if matched.is_sender {
            r.accepted = true;
        } else if let Some(index) = matched.member_index {
            r.members[index].accepted = true;
        } else {
            return Err(RelationshipError::NotAMember);
        }

        let refeed = r.encryption_type == EncryptionType::Indirect && !matched.is_sender;
        tracing::info!(
            relationship = %r.tx_id,
            is_sender = matched.is_sender,
            refeed,
            "Accept applied"
        );
        Ok((r.tx_id, refeed))
    }

    /// Apply an observed private message.
    pub(crate) fn process_private_message(
        &self,
        store: &mut RelationshipStore,
        tx: &Transaction,
        flag: &[u8],
        action: &MessageAction,
        message: PrivateMessage,
    ) -> Result<ReceivedMessage, RelationshipError> {
        let matched = self.match_transaction(store, tx, flag, action)?;
        let r = store
            .get(matched.position)
            .ok_or(RelationshipError::NotFound)?;

        let sender = matched.member_index.map(|index| r.members[index].base_key);
        if !matched.is_sender && sender.is_none() {
            tracing::warn!(relationship = %r.tx_id, "Private message from unidentified member");
        }

        Ok(ReceivedMessage {
            relationship_tx_id: r.tx_id,
            is_sender: matched.is_sender,
            sender,
            message,
        })
    }
}
