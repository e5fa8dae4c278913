//! # Persistence Flows
//!
//! Relationship state saved through the key-value port and restored into a
//! fresh engine backed by the same wallet seed.

#[cfg(test)]
mod tests {
    use crate::integration::{chain_indexes, deliver, note};
    use rv_relationships::test_utils::TestParty;
    use rv_relationships::{InMemoryKVStore, KeyValueStore, RelationshipApi, STORE_KEY};

    #[test]
    fn test_restart_resumes_conversation() {
        let alice = TestParty::new("alice");
        let bob = TestParty::new("bob");
        let (relationship, _) = alice
            .service
            .initiate_relationship(&[bob.wallet.contact_key()], None)
            .unwrap();
        let tx_id = relationship.tx_id;
        deliver(&alice.last_sent(), &[&bob]);
        bob.service.accept_relationship(&tx_id, None).unwrap();
        deliver(&bob.last_sent(), &[&alice]);
        alice.service.send_message(&tx_id, note("before")).unwrap();
        deliver(&alice.last_sent(), &[&bob]);

        let mut kv = InMemoryKVStore::new();
        bob.service.save(&mut kv).unwrap();
        assert!(kv.exists(STORE_KEY).unwrap());

        let bob_again = TestParty::new("bob");
        bob_again.service.load(&kv).unwrap();
        assert_eq!(chain_indexes(&bob_again, &tx_id), chain_indexes(&bob, &tx_id));

        alice.service.send_message(&tx_id, note("after")).unwrap();
        let outcome = bob_again
            .service
            .process_transaction(&alice.last_sent())
            .unwrap();
        assert_eq!(outcome.messages[0].message, note("after"));

        bob_again.service.send_message(&tx_id, note("reply")).unwrap();
        let outcome = alice
            .service
            .process_transaction(&bob_again.last_sent())
            .unwrap();
        assert_eq!(outcome.messages[0].message, note("reply"));
    }

    #[test]
    fn test_group_state_survives_restart() {
        let alice = TestParty::new("alice");
        let bob = TestParty::new("bob");
        let carol = TestParty::new("carol");
        let keys = [bob.wallet.contact_key(), carol.wallet.contact_key()];
        let (relationship, _) = alice.service.initiate_relationship(&keys, None).unwrap();
        deliver(&alice.last_sent(), &[&bob, &carol]);

        let mut kv = InMemoryKVStore::new();
        carol.service.save(&mut kv).unwrap();
        let carol_again = TestParty::new("carol");
        carol_again.service.load(&kv).unwrap();

        let restored = carol_again
            .service
            .find_relationship_for_flag(&relationship.flag)
            .unwrap();
        assert_eq!(restored.encryption_key, relationship.encryption_key);
        assert_eq!(restored, carol.service.list_relationships()[0]);

        bob.service
            .accept_relationship(&relationship.tx_id, None)
            .unwrap();
        let outcome = carol_again
            .service
            .process_transaction(&bob.last_sent())
            .unwrap();
        assert_eq!(outcome.accepted, vec![relationship.tx_id]);
    }

    #[test]
    fn test_corrupt_store_is_rejected() {
        let mut kv = InMemoryKVStore::new();
        kv.put(STORE_KEY, &[1, 0, 0]).unwrap();

        let party = TestParty::new("dave");
        assert!(party.service.load(&kv).is_err());
        assert!(party.service.list_relationships().is_empty());
    }
}
