//! # Relationship Store
//!
//! The in-memory relationship collection plus the set of transactions already
//! applied to it. The store itself is not synchronized; the service keeps it
//! behind a single mutex so every lookup-and-advance is one critical section.

use super::entities::Relationship;
use shared_types::{KeyType, TxId};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct RelationshipStore {
    relationships: Vec<Relationship>,
    processed: HashSet<TxId>,
}

impl RelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// Position of the relationship tagged with `flag`. Empty flags never
    /// match.
    pub fn position_by_flag(&self, flag: &[u8]) -> Option<usize> {
        if flag.is_empty() {
            return None;
        }
        self.relationships.iter().position(|r| r.flag == flag)
    }

    pub fn position_by_key_ref(&self, key_type: KeyType, key_index: u32) -> Option<usize> {
        self.relationships
            .iter()
            .position(|r| r.key_type == key_type && r.key_index == key_index)
    }

    pub fn position_by_tx_id(&self, tx_id: &TxId) -> Option<usize> {
        self.relationships.iter().position(|r| &r.tx_id == tx_id)
    }

    pub fn find_by_flag(&self, flag: &[u8]) -> Option<&Relationship> {
        self.position_by_flag(flag).map(|i| &self.relationships[i])
    }

    pub fn find_by_key_ref(&self, key_type: KeyType, key_index: u32) -> Option<&Relationship> {
        self.position_by_key_ref(key_type, key_index)
            .map(|i| &self.relationships[i])
    }

    pub fn find_by_tx_id(&self, tx_id: &TxId) -> Option<&Relationship> {
        self.position_by_tx_id(tx_id).map(|i| &self.relationships[i])
    }

    pub fn get(&self, position: usize) -> Option<&Relationship> {
        self.relationships.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut Relationship> {
        self.relationships.get_mut(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    pub fn append(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Snapshot copy of every relationship.
    pub fn list(&self) -> Vec<Relationship> {
        self.relationships.clone()
    }

    /// Replace the collection (after a load). Processed-transaction history
    /// is kept.
    pub fn replace(&mut self, relationships: Vec<Relationship>) {
        self.relationships = relationships;
    }

    /// Record `tx_id` as applied to at least one relationship. Transactions
    /// that matched nothing are never recorded, so they can be fed again once
    /// the relationship they belong to is known.
    pub fn mark_processed(&mut self, tx_id: TxId) {
        self.processed.insert(tx_id);
    }

    pub fn was_processed(&self, tx_id: &TxId) -> bool {
        self.processed.contains(tx_id)
    }
}
