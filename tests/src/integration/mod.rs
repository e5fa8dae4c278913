//! Cross-party relationship scenarios.

pub mod concurrency;
pub mod flows;
pub mod persistence;

use rv_relationships::test_utils::TestParty;
use rv_relationships::{PrivateMessage, RelationshipApi};
use rv_telemetry::TelemetryConfig;
use shared_types::{LockingScript, Transaction, TxId};

/// Register metrics and install a debug subscriber once per process.
pub fn init_telemetry() {
    let config = TelemetryConfig {
        log_level: "rv_relationships=debug".to_string(),
        ..TelemetryConfig::default()
    };
    // Another test may already own the global subscriber.
    let _ = rv_telemetry::init_telemetry(&config);
}

pub fn note(subject: &str) -> PrivateMessage {
    PrivateMessage {
        subject: subject.to_string(),
        body: format!("body of {}", subject).into_bytes(),
    }
}

/// Index of the envelope output.
pub fn data_output(tx: &Transaction) -> u32 {
    tx.outputs
        .iter()
        .position(|o| matches!(o.locking_script, LockingScript::Data(_)))
        .expect("relationship transaction carries an envelope") as u32
}

/// Deliver `tx` to every party, in order.
pub fn deliver(tx: &Transaction, parties: &[&TestParty]) {
    for party in parties {
        party
            .service
            .process_transaction(tx)
            .expect("transaction applies");
    }
}

/// Our own chain index and every member's, by base key order.
pub fn chain_indexes(party: &TestParty, tx_id: &TxId) -> (u64, Vec<u64>) {
    let r = party
        .service
        .find_relationship_for_tx_id(tx_id)
        .expect("relationship exists");
    let mut members: Vec<_> = r
        .members
        .iter()
        .map(|m| (m.base_key, m.next_index()))
        .collect();
    members.sort();
    (r.next_index(), members.into_iter().map(|(_, i)| i).collect())
}
