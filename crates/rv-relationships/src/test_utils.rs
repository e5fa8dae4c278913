//! In-memory wallet and broadcaster used by unit and integration tests.

use crate::adapters::SealedEnvelope;
use crate::domain::config::RelationshipsConfig;
use crate::domain::errors::WalletError;
use crate::ports::outbound::{AddressRecord, Broadcaster, Wallet};
use crate::service::{RelationshipDependencies, RelationshipService};
use parking_lot::{Mutex, RwLock};
use shared_crypto::{sha256, tweak_private, Hash32, PrivateKey, PublicKey};
use shared_types::{
    KeyHash, KeyType, OutPoint, RawAddress, Transaction, TxId, TxInput, UnlockingScript,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct WalletState {
    next_unused: HashMap<KeyType, u32>,
    addresses: HashMap<KeyHash, AddressRecord>,
    fundings: u64,
}

/// Deterministic wallet deriving every key from a master secret.
pub struct MemoryWallet {
    master: Hash32,
    state: RwLock<WalletState>,
}

impl MemoryWallet {
    /// Wallet whose keys are derived from `name`.
    pub fn new(name: &str) -> Self {
        Self {
            master: sha256(name.as_bytes()),
            state: RwLock::new(WalletState::default()),
        }
    }

    /// Reserve the next unused `RelateIn` key and return its public key, the
    /// key a counterparty initiates to.
    pub fn contact_key(&self) -> PublicKey {
        self.get_unused_address(KeyType::RelateIn)
            .map(|record| record.public_key)
            .expect("memory wallet derives keys infallibly")
    }

    /// Number of addresses the wallet recognises.
    pub fn address_count(&self) -> usize {
        self.state.read().addresses.len()
    }

    fn derive(&self, key_type: KeyType, key_index: u32) -> Result<PrivateKey, WalletError> {
        for attempt in 0u8..=u8::MAX {
            let mut material = Vec::with_capacity(41);
            material.extend_from_slice(&self.master);
            material.extend_from_slice(&u32::from(key_type).to_le_bytes());
            material.extend_from_slice(&key_index.to_le_bytes());
            material.push(attempt);
            if let Ok(key) = PrivateKey::from_bytes(sha256(&material)) {
                return Ok(key);
            }
        }
        Err(WalletError::KeyUnavailable {
            key_type: key_type.into(),
            key_index,
        })
    }

    fn insert(&self, record: AddressRecord) {
        self.state
            .write()
            .addresses
            .insert(record.address.key_hash(), record);
    }
}

impl Wallet for MemoryWallet {
    fn get_key(&self, key_type: KeyType, key_index: u32) -> Result<PrivateKey, WalletError> {
        self.derive(key_type, key_index)
    }

    fn get_unused_address(&self, key_type: KeyType) -> Result<AddressRecord, WalletError> {
        let key_index = {
            let mut state = self.state.write();
            let next = state.next_unused.entry(key_type).or_insert(0);
            let index = *next;
            *next += 1;
            index
        };
        let public_key = self.derive(key_type, key_index)?.public_key();
        let record = AddressRecord {
            address: RawAddress::from_public_key(&public_key),
            public_key,
            key_type,
            key_index,
            key_hash: None,
        };
        self.insert(record.clone());
        Ok(record)
    }

    fn find_address(&self, address: &RawAddress) -> Result<Option<AddressRecord>, WalletError> {
        Ok(self.state.read().addresses.get(&address.key_hash()).cloned())
    }

    fn add_independent_key(
        &self,
        public_key: &PublicKey,
        key_type: KeyType,
        key_index: u32,
        hash: Hash32,
    ) -> Result<(), WalletError> {
        self.insert(AddressRecord {
            address: RawAddress::from_public_key(public_key),
            public_key: *public_key,
            key_type,
            key_index,
            key_hash: Some(hash),
        });
        Ok(())
    }

    fn add_key_funding(
        &self,
        key_type: KeyType,
        key_index: u32,
        hash: Option<&Hash32>,
        tx: &mut Transaction,
        broadcaster: &dyn Broadcaster,
    ) -> Result<(), WalletError> {
        let base = self.derive(key_type, key_index)?;
        let key = match hash {
            Some(hash) => tweak_private(&base, hash)?,
            None => base,
        };

        let funding = {
            let mut state = self.state.write();
            state.fundings += 1;
            state.fundings
        };
        let mut outpoint_material = self.master.to_vec();
        outpoint_material.extend_from_slice(&funding.to_le_bytes());

        tx.inputs.insert(
            0,
            TxInput {
                outpoint: OutPoint {
                    tx_id: TxId(sha256(&outpoint_material)),
                    index: 0,
                },
                unlocking_script: UnlockingScript {
                    signature: Vec::new(),
                    public_key: Some(key.public_key()),
                },
                sequence: u32::MAX,
            },
        );

        let digest = tx
            .signing_digest()
            .map_err(|e| WalletError::Other(e.to_string()))?;
        tx.inputs[0].unlocking_script.signature = key.sign(&digest).as_bytes().to_vec();

        broadcaster.broadcast(tx)
    }
}

/// Broadcaster that records every transaction instead of sending it.
#[derive(Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<Transaction>>,
    failing: bool,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcaster that rejects every transaction.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn last(&self) -> Option<Transaction> {
        self.sent.lock().last().cloned()
    }

    /// Drain every recorded transaction.
    pub fn take(&self) -> Vec<Transaction> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, tx: &Transaction) -> Result<(), WalletError> {
        if self.failing {
            return Err(WalletError::Broadcast("broadcaster offline".to_string()));
        }
        self.sent.lock().push(tx.clone());
        Ok(())
    }
}

pub type TestService = RelationshipService<MemoryWallet, SealedEnvelope, RecordingBroadcaster>;

/// One wallet with its engine, as a test participant.
pub struct TestParty {
    pub wallet: Arc<MemoryWallet>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub service: TestService,
}

impl TestParty {
    pub fn new(name: &str) -> Self {
        Self::with_broadcaster(name, RecordingBroadcaster::new())
    }

    pub fn with_broadcaster(name: &str, broadcaster: RecordingBroadcaster) -> Self {
        let config = RelationshipsConfig::for_testing();
        let wallet = Arc::new(MemoryWallet::new(name));
        let broadcaster = Arc::new(broadcaster);
        let service = RelationshipService::new(
            RelationshipDependencies {
                wallet: wallet.clone(),
                envelope: Arc::new(SealedEnvelope::new(config.protocol_id.clone())),
                broadcaster: broadcaster.clone(),
            },
            config,
        )
        .expect("test configuration is valid");
        Self {
            wallet,
            broadcaster,
            service,
        }
    }

    /// Last transaction this party broadcast.
    pub fn last_sent(&self) -> Transaction {
        self.broadcaster
            .last()
            .expect("party has broadcast a transaction")
    }
}
