//! # Relationship API Implementation

use super::*;
use crate::domain::codec::{decode_relationships, encode_relationships};
use crate::domain::entities::Relationship;
use crate::domain::messages::{
    AcceptRelationship, InitiateRelationship, PrivateMessage, ProofOfIdentity,
};
use crate::ports::inbound::{DecryptedAction, ProcessOutcome, RelationshipApi, SentMessage};
use crate::ports::outbound::KeyValueStore;
use rv_telemetry::metrics::RELATIONSHIPS_ACTIVE;
use shared_crypto::PublicKey;
use shared_types::{Transaction, TxId};

impl<W, E, B> RelationshipApi for RelationshipService<W, E, B>
where
    W: Wallet,
    E: EnvelopeTransport,
    B: Broadcaster,
{
    fn list_relationships(&self) -> Vec<Relationship> {
        self.store.lock().list()
    }

    fn find_relationship_for_tx_id(&self, tx_id: &TxId) -> Option<Relationship> {
        self.store.lock().find_by_tx_id(tx_id).cloned()
    }

    fn find_relationship_for_flag(&self, flag: &[u8]) -> Option<Relationship> {
        self.store.lock().find_by_flag(flag).cloned()
    }

    #[tracing::instrument(skip(self, receivers, proof_of_identity), fields(receivers = receivers.len()))]
    fn initiate_relationship(
        &self,
        receivers: &[PublicKey],
        proof_of_identity: Option<ProofOfIdentity>,
    ) -> Result<(Relationship, InitiateRelationship), RelationshipError> {
        self.initiate(receivers, proof_of_identity)
    }

    #[tracing::instrument(skip(self, proof_of_identity))]
    fn accept_relationship(
        &self,
        relationship_tx_id: &TxId,
        proof_of_identity: Option<ProofOfIdentity>,
    ) -> Result<SentMessage<AcceptRelationship>, RelationshipError> {
        self.accept(relationship_tx_id, proof_of_identity)
    }

    #[tracing::instrument(skip(self, message))]
    fn send_message(
        &self,
        relationship_tx_id: &TxId,
        message: PrivateMessage,
    ) -> Result<SentMessage<PrivateMessage>, RelationshipError> {
        self.send(relationship_tx_id, message)
    }

    fn decrypt_action(
        &self,
        tx: &Transaction,
        output_index: u32,
        flag: &[u8],
    ) -> Result<DecryptedAction, RelationshipError> {
        let store = self.store.lock();
        self.decrypt_locked(&store, tx, output_index, flag)
    }

    #[tracing::instrument(skip(self, tx))]
    fn process_transaction(&self, tx: &Transaction) -> Result<ProcessOutcome, RelationshipError> {
        self.process_transaction_inner(tx)
    }

    fn is_relevant(&self, tx: &Transaction) -> Result<bool, RelationshipError> {
        self.is_relevant_inner(tx)
    }

    fn load(&self, kv_store: &dyn KeyValueStore) -> Result<(), RelationshipError> {
        let mut store = self.store.lock();
        let relationships = match kv_store.get(STORE_KEY)? {
            Some(bytes) => decode_relationships(&bytes, |key_type, key_index| {
                Ok(self.wallet.get_key(key_type, key_index)?.public_key())
            })?,
            None => Vec::new(),
        };

        for r in &relationships {
            self.register_window(r)?;
        }
        tracing::info!(count = relationships.len(), "Loaded relationships");
        store.replace(relationships);
        RELATIONSHIPS_ACTIVE.set(store.len() as i64);
        Ok(())
    }

    fn save(&self, kv_store: &mut dyn KeyValueStore) -> Result<(), RelationshipError> {
        let store = self.store.lock();
        let relationships = store.list();
        let bytes = encode_relationships(&relationships)?;
        kv_store.put(STORE_KEY, &bytes)?;
        tracing::debug!(count = relationships.len(), bytes = bytes.len(), "Saved relationships");
        Ok(())
    }
}
