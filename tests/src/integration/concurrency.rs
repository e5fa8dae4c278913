//! # Concurrent Observers
//!
//! The engine is shared across threads: a transaction listener and local
//! commands may run at the same time against the same relationships.

#[cfg(test)]
mod tests {
    use crate::integration::{chain_indexes, deliver, note};
    use parking_lot::Mutex;
    use rv_relationships::test_utils::TestParty;
    use rv_relationships::RelationshipApi;
    use std::thread;

    #[test]
    fn test_same_transaction_applied_once() {
        let alice = TestParty::new("alice");
        let bob = TestParty::new("bob");
        alice
            .service
            .initiate_relationship(&[bob.wallet.contact_key()], None)
            .unwrap();
        let initiate = alice.last_sent();

        let outcomes = Mutex::new(Vec::new());
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let outcome = bob.service.process_transaction(&initiate).unwrap();
                    outcomes.lock().push(outcome);
                });
            }
        });

        let applied = outcomes
            .into_inner()
            .into_iter()
            .filter(|o| !o.initiated.is_empty())
            .count();
        assert_eq!(applied, 1);
        assert_eq!(bob.service.list_relationships().len(), 1);
    }

    #[test]
    fn test_concurrent_sends_stay_ordered() {
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
        alice.broadcaster.take();

        thread::scope(|s| {
            for worker in 0..4 {
                let alice = &alice;
                s.spawn(move || {
                    for i in 0..3 {
                        let subject = format!("worker {} message {}", worker, i);
                        alice.service.send_message(&tx_id, note(&subject)).unwrap();
                    }
                });
            }
        });

        let sent = alice.broadcaster.take();
        assert_eq!(sent.len(), 12);
        for tx in &sent {
            let outcome = bob.service.process_transaction(tx).unwrap();
            assert_eq!(outcome.messages.len(), 1);
            assert!(outcome.messages[0].sender.is_some());
        }

        let (a_own, _) = chain_indexes(&alice, &tx_id);
        let (_, b_members) = chain_indexes(&bob, &tx_id);
        assert_eq!(a_own, b_members[0]);
    }
}
