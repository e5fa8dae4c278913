//! # Transactions
//!
//! Minimal UTXO transaction model. Relationship code only ever reads input
//! public keys, output scripts and the transaction id.

use crate::errors::TypesError;
use crate::script::{LockingScript, UnlockingScript};
use serde::{Deserialize, Serialize};
use shared_crypto::{double_sha256, Hash32, PublicKey};
use std::fmt;

/// Transaction identifier (double SHA-256 of the canonical encoding).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub Hash32);

impl TxId {
    /// All-zero id, used for relationships whose transaction is not yet known.
    pub const ZERO: TxId = TxId([0u8; 32]);

    pub fn as_bytes(&self) -> &Hash32 {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", hex::encode(self.0))
    }
}

/// Reference to a previous output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_id: TxId,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub outpoint: OutPoint,
    pub unlocking_script: UnlockingScript,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub locking_script: LockingScript,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    /// Compute the transaction id.
    pub fn id(&self) -> Result<TxId, TypesError> {
        let encoded = bincode::serialize(self).map_err(|e| TypesError::Encoding(e.to_string()))?;
        Ok(TxId(double_sha256(&encoded)))
    }

    /// Digest signed by every input: the id with all unlocking scripts
    /// cleared.
    pub fn signing_digest(&self) -> Result<Hash32, TypesError> {
        let mut unsigned = self.clone();
        for input in &mut unsigned.inputs {
            input.unlocking_script = UnlockingScript::default();
        }
        Ok(unsigned.id()?.0)
    }

    /// Append an output, returning its index.
    pub fn add_output(&mut self, locking_script: LockingScript, value: u64) -> u32 {
        self.outputs.push(TxOutput {
            value,
            locking_script,
        });
        (self.outputs.len() - 1) as u32
    }

    pub fn input(&self, index: u32) -> Result<&TxInput, TypesError> {
        self.inputs
            .get(index as usize)
            .ok_or(TypesError::InputOutOfRange {
                index,
                count: self.inputs.len(),
            })
    }

    pub fn output(&self, index: u32) -> Result<&TxOutput, TypesError> {
        self.outputs
            .get(index as usize)
            .ok_or(TypesError::OutputOutOfRange {
                index,
                count: self.outputs.len(),
            })
    }

    /// Public key revealed by the input at `index`.
    pub fn input_public_key(&self, index: u32) -> Result<PublicKey, TypesError> {
        self.input(index)?.unlocking_script.public_key()
    }

    /// Public keys of every input that reveals one.
    pub fn input_public_keys(&self) -> impl Iterator<Item = PublicKey> + '_ {
        self.inputs
            .iter()
            .filter_map(|input| input.unlocking_script.public_key)
    }

    /// First relationship flag carried by the outputs.
    pub fn flag(&self) -> Option<&[u8]> {
        self.outputs.iter().find_map(|output| match &output.locking_script {
            LockingScript::Flag(flag) => Some(flag.as_slice()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::PrivateKey;

    fn signed_input(key: &PrivateKey) -> TxInput {
        TxInput {
            outpoint: OutPoint {
                tx_id: TxId([9u8; 32]),
                index: 0,
            },
            unlocking_script: UnlockingScript {
                signature: vec![1, 2, 3],
                public_key: Some(key.public_key()),
            },
            sequence: u32::MAX,
        }
    }

    #[test]
    fn test_id_is_deterministic_and_content_bound() {
        let mut tx = Transaction::new();
        tx.add_output(LockingScript::Data(b"hello".to_vec()), 0);
        let first = tx.id().unwrap();

        assert_eq!(first, tx.clone().id().unwrap());

        tx.add_output(LockingScript::Flag(vec![7; 32]), 0);
        assert_ne!(first, tx.id().unwrap());
    }

    #[test]
    fn test_signing_digest_ignores_signatures() {
        let key = PrivateKey::generate();
        let mut tx = Transaction::new();
        tx.inputs.push(signed_input(&key));
        let digest = tx.signing_digest().unwrap();

        tx.inputs[0].unlocking_script.signature = vec![4, 5, 6];
        assert_eq!(digest, tx.signing_digest().unwrap());
    }

    #[test]
    fn test_input_public_key_bounds() {
        let key = PrivateKey::generate();
        let mut tx = Transaction::new();
        tx.inputs.push(signed_input(&key));

        assert_eq!(tx.input_public_key(0), Ok(key.public_key()));
        assert_eq!(
            tx.input_public_key(1),
            Err(TypesError::InputOutOfRange { index: 1, count: 1 })
        );
    }

    #[test]
    fn test_flag_extraction() {
        let mut tx = Transaction::new();
        assert!(tx.flag().is_none());

        tx.add_output(LockingScript::Data(vec![1]), 0);
        tx.add_output(LockingScript::Flag(vec![5; 32]), 0);
        assert_eq!(tx.flag(), Some(&[5u8; 32][..]));
    }

    #[test]
    fn test_tx_id_display_is_hex() {
        assert_eq!(TxId([0xABu8; 32]).to_string(), "ab".repeat(32));
        assert!(TxId::ZERO.is_zero());
    }
}
