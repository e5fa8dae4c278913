//! # Relationship Lifecycle Flows
//!
//! ## Scenarios
//!
//! 1. **Direct (2 parties)**: initiate, accept, exchange messages
//! 2. **Indirect (3 parties)**: group initiate with flag, accepts, group
//!    messages, outsider exclusion
//! 3. **Resynchronization**: missed and reordered deliveries within the
//!    lookahead window

#[cfg(test)]
mod tests {
    use crate::integration::{chain_indexes, data_output, deliver, init_telemetry, note};
    use rv_relationships::test_utils::TestParty;
    use rv_relationships::{EncryptionType, RelationshipApi, RelationshipError};

    // =========================================================================
    // DIRECT
    // =========================================================================

    #[test]
    fn test_direct_scenario() {
        init_telemetry();
        let alice = TestParty::new("alice");
        let bob = TestParty::new("bob");
        let bob_key = bob.wallet.contact_key();

        let (relationship, _) = alice
            .service
            .initiate_relationship(&[bob_key], None)
            .unwrap();
        assert_eq!(alice.service.list_relationships().len(), 1);
        assert_eq!(relationship.encryption_type, EncryptionType::Direct);

        let initiate = alice.last_sent();
        let outcome = bob.service.process_transaction(&initiate).unwrap();
        assert_eq!(outcome.initiated, vec![relationship.tx_id]);
        assert_eq!(bob.service.list_relationships().len(), 1);

        bob.service
            .accept_relationship(&relationship.tx_id, None)
            .unwrap();
        let accept = bob.last_sent();
        let outcome = alice.service.process_transaction(&accept).unwrap();
        assert_eq!(outcome.accepted, vec![relationship.tx_id]);

        let ours = alice
            .service
            .find_relationship_for_tx_id(&relationship.tx_id)
            .unwrap();
        assert!(ours.accepted);
        assert!(ours.members.iter().all(|m| m.accepted));

        let metrics = rv_telemetry::encode_metrics().unwrap();
        assert!(metrics.contains("rv_relationships_created_total"));
        assert!(metrics.contains("rv_messages_sent_total"));
    }

    #[test]
    fn test_direct_conversation() {
        let alice = TestParty::new("alice");
        let bob = TestParty::new("bob");
        let (relationship, _) = alice
            .service
            .initiate_relationship(&[bob.wallet.contact_key()], None)
            .unwrap();
        let tx_id = relationship.tx_id;
        deliver(&alice.last_sent(), &[&alice, &bob]);
        bob.service.accept_relationship(&tx_id, None).unwrap();
        deliver(&bob.last_sent(), &[&alice, &bob]);

        for i in 0..5 {
            let (from, to) = if i % 2 == 0 { (&alice, &bob) } else { (&bob, &alice) };
            let subject = format!("message {}", i);
            from.service.send_message(&tx_id, note(&subject)).unwrap();
            let tx = from.last_sent();

            let echo = from.service.process_transaction(&tx).unwrap();
            assert!(echo.messages[0].is_sender);

            let outcome = to.service.process_transaction(&tx).unwrap();
            assert_eq!(outcome.messages.len(), 1);
            assert_eq!(outcome.messages[0].message, note(&subject));
            assert!(!outcome.messages[0].is_sender);
        }

        let (a_own, a_members) = chain_indexes(&alice, &tx_id);
        let (b_own, b_members) = chain_indexes(&bob, &tx_id);
        assert_eq!(a_own, b_members[0]);
        assert_eq!(b_own, a_members[0]);
    }

    // =========================================================================
    // INDIRECT
    // =========================================================================

    #[test]
    fn test_indirect_scenario() {
        init_telemetry();
        let alice = TestParty::new("alice");
        let bob = TestParty::new("bob");
        let carol = TestParty::new("carol");
        let eve = TestParty::new("eve");
        let keys = [bob.wallet.contact_key(), carol.wallet.contact_key()];

        let (relationship, message) = alice.service.initiate_relationship(&keys, None).unwrap();
        assert_eq!(message.flag.len(), 32);
        assert_eq!(
            alice.service.list_relationships()[0].encryption_type,
            EncryptionType::Indirect
        );

        let initiate = alice.last_sent();
        let output = data_output(&initiate);
        assert!(matches!(
            eve.service.decrypt_action(&initiate, output, &message.flag),
            Err(RelationshipError::NotTokenizedOrUndecryptable(_))
        ));
        for receiver in [&bob, &carol] {
            let decrypted = receiver
                .service
                .decrypt_action(&initiate, output, &message.flag)
                .unwrap();
            assert_eq!(decrypted.encryption_key, relationship.encryption_key);
        }

        deliver(&initiate, &[&bob, &carol]);
        for receiver in [&bob, &carol] {
            let r = receiver
                .service
                .find_relationship_for_flag(&message.flag)
                .unwrap();
            assert_eq!(r.tx_id, relationship.tx_id);
            assert_eq!(r.members.len(), 2);
            assert_eq!(r.encryption_key, relationship.encryption_key);
        }
    }

    #[test]
    fn test_indirect_group_traffic() {
        let alice = TestParty::new("alice");
        let bob = TestParty::new("bob");
        let carol = TestParty::new("carol");
        let keys = [bob.wallet.contact_key(), carol.wallet.contact_key()];
        let (relationship, _) = alice.service.initiate_relationship(&keys, None).unwrap();
        let tx_id = relationship.tx_id;
        let everyone = [&alice, &bob, &carol];
        deliver(&alice.last_sent(), &everyone);

        bob.service.accept_relationship(&tx_id, None).unwrap();
        let accept = bob.last_sent();
        assert_eq!(accept.flag(), Some(relationship.flag.as_slice()));

        let outcome = carol.service.process_transaction(&accept).unwrap();
        assert_eq!(outcome.accepted, vec![tx_id]);
        assert!(outcome.refeed);
        let echo = bob.service.process_transaction(&accept).unwrap();
        assert!(!echo.refeed);
        alice.service.process_transaction(&accept).unwrap();

        carol.service.accept_relationship(&tx_id, None).unwrap();
        deliver(&carol.last_sent(), &everyone);

        let alice_view = alice.service.find_relationship_for_tx_id(&tx_id).unwrap();
        assert!(alice_view.members.iter().all(|m| m.accepted));

        alice.service.send_message(&tx_id, note("to the group")).unwrap();
        let tx = alice.last_sent();
        for receiver in [&bob, &carol] {
            let outcome = receiver.service.process_transaction(&tx).unwrap();
            assert_eq!(outcome.messages[0].message, note("to the group"));
            assert_eq!(
                outcome.messages[0].sender,
                Some(*alice_view.base_key())
            );
        }

        let (a_own, _) = chain_indexes(&alice, &tx_id);
        for other in [&bob, &carol] {
            let r = other.service.find_relationship_for_tx_id(&tx_id).unwrap();
            let index = r.member_with_base_key(alice_view.base_key()).unwrap();
            assert_eq!(r.members[index].next_index(), a_own);
        }
    }

    // =========================================================================
    // RESYNCHRONIZATION
    // =========================================================================

    #[test]
    fn test_missed_message_within_window() {
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

        for i in 0..3 {
            alice.service.send_message(&tx_id, note(&format!("lost {}", i))).unwrap();
        }
        alice.service.send_message(&tx_id, note("arrives")).unwrap();

        let outcome = bob.service.process_transaction(&alice.last_sent()).unwrap();
        assert_eq!(outcome.messages[0].message, note("arrives"));

        let (a_own, a_members) = chain_indexes(&alice, &tx_id);
        let (b_own, b_members) = chain_indexes(&bob, &tx_id);
        assert_eq!(b_members[0], a_own);
        assert_eq!(b_own, a_members[0]);
    }

    #[test]
    fn test_reordered_messages() {
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

        alice.service.send_message(&tx_id, note("one")).unwrap();
        let one = alice.last_sent();
        alice.service.send_message(&tx_id, note("two")).unwrap();
        let two = alice.last_sent();
        alice.service.send_message(&tx_id, note("three")).unwrap();
        let three = alice.last_sent();

        let mut received = Vec::new();
        for tx in [&three, &one, &two] {
            let outcome = bob.service.process_transaction(tx).unwrap();
            received.push(outcome.messages[0].message.subject.clone());
        }
        assert_eq!(received, vec!["three", "one", "two"]);

        let (a_own, _) = chain_indexes(&alice, &tx_id);
        let (_, b_members) = chain_indexes(&bob, &tx_id);
        assert_eq!(b_members[0], a_own);
    }

    #[test]
    fn test_unrelated_transaction_is_ignored() {
        let alice = TestParty::new("alice");
        let bob = TestParty::new("bob");
        let carol = TestParty::new("carol");
        alice
            .service
            .initiate_relationship(&[bob.wallet.contact_key()], None)
            .unwrap();

        let tx = alice.last_sent();
        assert!(!carol.service.is_relevant(&tx).unwrap());
        let outcome = carol.service.process_transaction(&tx).unwrap();
        assert!(outcome.initiated.is_empty());
        assert!(carol.service.list_relationships().is_empty());
    }
}
