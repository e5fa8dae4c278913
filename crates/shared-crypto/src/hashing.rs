//! # SHA-256 Hashing
//!
//! One-shot and incremental SHA-256, plus the double hash used for
//! transaction ids and the truncated hash used for key addresses.

use sha2::{Digest, Sha256};

/// SHA-256 output (256-bit).
pub type Hash = [u8; 32];

/// Stateful SHA-256 hasher.
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice.
pub fn double_sha256(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// 20-byte address hash of a serialized public key.
pub fn key_hash(data: &[u8]) -> [u8; 20] {
    let digest = sha256(data);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[..20]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256(b"abc");
        assert_eq!(
            hex::encode(hash),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = Sha256Hasher::new();
        hasher.update(b"rende").update(b"zvous");
        assert_eq!(hasher.finalize(), sha256(b"rendezvous"));
    }

    #[test]
    fn test_double_sha256_differs_from_single() {
        assert_ne!(double_sha256(b"tx"), sha256(b"tx"));
        assert_eq!(double_sha256(b"tx"), sha256(&sha256(b"tx")));
    }

    #[test]
    fn test_key_hash_is_prefix_of_sha256() {
        let full = sha256(b"key");
        assert_eq!(key_hash(b"key"), full[..20]);
    }
}
