//! # Relationship Service - Transaction Matcher
//!
//! Resolves an observed transaction to one relationship and advances every
//! chain whose one-time key it spends or pays to.
//!
//! Resolution order:
//! 1. the relationship flag carried by the transaction
//! 2. a sender input key that is one of our relationship keys (we sent it)
//! 3. a receiver output key that is one of our relationship keys
//! 4. a sender input key that is some member's one-time key
//!
//! Only forward searches are used when a key is not the expected one, so
//! observing our own broadcast after the local advance changes nothing.

use super::helpers::{adopt_member, advance_member};
use super::*;
use crate::domain::entities::Relationship;
use crate::domain::messages::MessageAction;
use crate::ports::outbound::AddressRecord;
use shared_crypto::PublicKey;
use shared_types::{RawAddress, Transaction};

/// Where an observed transaction belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TxMatch {
    /// Position of the relationship in the store.
    pub position: usize,
    /// Whether one of our keys sent the transaction.
    pub is_sender: bool,
    /// Member that sent the transaction, when it was not us.
    pub member_index: Option<usize>,
}

impl<W, E, B> RelationshipService<W, E, B>
where
    W: Wallet,
    E: EnvelopeTransport,
    B: Broadcaster,
{
    /// Our wallet record for `key`, if it is one of our relationship keys.
    pub(crate) fn relationship_record(
        &self,
        key: &PublicKey,
    ) -> Result<Option<AddressRecord>, RelationshipError> {
        let record = self.wallet.find_address(&RawAddress::from_public_key(key))?;
        Ok(record.filter(|r| r.key_type.is_relationship()))
    }

    /// Position of the relationship owning `record`, checked against a
    /// position already resolved by flag.
    ///
    /// A contact key may anchor several relationships; the one whose chain
    /// produces `key` wins.
    fn position_for_record(
        &self,
        store: &RelationshipStore,
        resolved: Option<usize>,
        record: &AddressRecord,
        key: &PublicKey,
    ) -> Result<usize, RelationshipError> {
        if let Some(position) = resolved {
            let r = store.get(position).ok_or(RelationshipError::NotFound)?;
            if r.key_type != record.key_type || r.key_index != record.key_index {
                return Err(RelationshipError::MalformedMessage(
                    "Wrong key for relationship".to_string(),
                ));
            }
            return Ok(position);
        }

        let candidates: Vec<usize> = store
            .iter()
            .enumerate()
            .filter(|(_, r)| r.key_type == record.key_type && r.key_index == record.key_index)
            .map(|(position, _)| position)
            .collect();
        match candidates.as_slice() {
            [] => Err(RelationshipError::NotFound),
            [position] => Ok(*position),
            _ => {
                for &position in &candidates {
                    let Some(r) = store.get(position) else {
                        continue;
                    };
                    if r.next_key() == key
                        || r.find_key(key, self.config.lookahead_window)?.is_some()
                    {
                        return Ok(position);
                    }
                }
                Err(RelationshipError::NotFound)
            }
        }
    }

    /// Advance our chain past `key` if it is our current or an upcoming
    /// one-time key.
    fn observe_local_key(
        &self,
        r: &mut Relationship,
        key: &PublicKey,
    ) -> Result<(), RelationshipError> {
        if r.next_key() == key {
            return self.advance_local(r);
        }
        if let Some(position) = r.find_forward(key, self.config.lookahead_window)? {
            return self.adopt_local(r, position);
        }
        Ok(())
    }

    /// Advance the member whose current or upcoming one-time key is `key`.
    /// Returns that member's index.
    fn observe_member_key(
        &self,
        r: &mut Relationship,
        key: &PublicKey,
    ) -> Result<Option<usize>, RelationshipError> {
        if let Some(index) = r.member_with_next_key(key) {
            advance_member(&mut r.members[index])?;
            return Ok(Some(index));
        }
        for index in 0..r.members.len() {
            if let Some(position) =
                r.members[index].find_forward(key, self.config.lookahead_window)?
            {
                adopt_member(&mut r.members[index], position)?;
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Position of a relationship in which `key` is some member's current or
    /// upcoming one-time key.
    pub(crate) fn position_by_member_key(
        &self,
        store: &RelationshipStore,
        key: &PublicKey,
    ) -> Result<Option<usize>, RelationshipError> {
        for (position, r) in store.iter().enumerate() {
            if r.member_with_next_key(key).is_some() {
                return Ok(Some(position));
            }
            for member in &r.members {
                if member.find_forward(key, self.config.lookahead_window)?.is_some() {
                    return Ok(Some(position));
                }
            }
        }
        Ok(None)
    }

    /// Resolve `tx` to a relationship and advance the chains it consumed.
    ///
    /// ## Errors
    ///
    /// - `NotFound`: nothing in the transaction resolves to a relationship
    /// - `MalformedMessage`: a declared index is out of range, or our key
    ///   belongs to a different relationship than the flag names
    pub(crate) fn match_transaction(
        &self,
        store: &mut RelationshipStore,
        tx: &Transaction,
        flag: &[u8],
        action: &MessageAction,
    ) -> Result<TxMatch, RelationshipError> {
        let mut position = store.position_by_flag(flag);
        let mut is_sender = false;

        let sender_keys = action
            .senders()
            .into_iter()
            .map(|index| tx.input_public_key(index))
            .collect::<Result<Vec<_>, _>>()?;
        let mut receiver_keys: Vec<PublicKey> = Vec::new();
        for index in action.receivers() {
            // Only P2PK receivers carry a key; indirect traffic points at the flag.
            if let Ok(key) = tx.output(index)?.locking_script.public_key() {
                receiver_keys.push(key);
            }
        }

        let mut own_keys = Vec::new();
        for key in &sender_keys {
            if let Some(record) = self.relationship_record(key)? {
                position = Some(self.position_for_record(store, position, &record, key)?);
                is_sender = true;
                own_keys.push(*key);
            }
        }
        if !is_sender {
            for key in &receiver_keys {
                if let Some(record) = self.relationship_record(key)? {
                    position = Some(self.position_for_record(store, position, &record, key)?);
                    own_keys.push(*key);
                }
            }
        }
        if position.is_none() {
            for key in &sender_keys {
                position = self.position_by_member_key(store, key)?;
                if position.is_some() {
                    break;
                }
            }
        }
        let position = position.ok_or(RelationshipError::NotFound)?;
        let r = store.get_mut(position).ok_or(RelationshipError::NotFound)?;

        for key in &own_keys {
            self.observe_local_key(r, key)?;
        }

        let mut member_index = None;
        if !is_sender {
            for key in &sender_keys {
                if let Some(index) = self.observe_member_key(r, key)? {
                    member_index.get_or_insert(index);
                }
            }
        }
        for key in &receiver_keys {
            if !own_keys.contains(key) {
                self.observe_member_key(r, key)?;
            }
        }

        tracing::debug!(
            relationship = %r.tx_id,
            is_sender,
            member_index = ?member_index,
            "Matched transaction to relationship"
        );

        Ok(TxMatch {
            position,
            is_sender,
            member_index,
        })
    }
}
