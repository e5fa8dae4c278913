//! # Hash Chain and Key Tweaks
//!
//! The ratchet every relationship party runs in lock-step.
//!
//! ```text
//! next_hash_0     = SHA256(seed)            (index 1)
//! next_hash_{i+1} = SHA256(next_hash_i)     (index i + 2)
//! one_time_key    = base_key + next_hash·G
//! ```
//!
//! Hashes are interpreted as big-endian scalars reduced modulo the curve
//! order. The same reduction is used by [`add_hashes`], so combining a shared
//! secret with a chain position is ordinary scalar addition.

use crate::hashing::sha256;
use crate::keys::{PrivateKey, PublicKey};
use crate::CryptoError;
use k256::elliptic_curve::ops::Reduce;
use k256::{AffinePoint, FieldBytes, NonZeroScalar, ProjectivePoint, Scalar, U256};

/// 32-byte chain hash / shared secret.
pub type Hash32 = [u8; 32];

fn hash_scalar(hash: &Hash32) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::clone_from_slice(hash))
}

/// Advance a chain hash one step.
pub fn advance(hash: &Hash32) -> Hash32 {
    sha256(hash)
}

/// Chain hash at index 1 for `seed`.
pub fn seed_hash(seed: &[u8]) -> Hash32 {
    sha256(seed)
}

/// Tweak a public key by a chain hash: `P + h·G`.
///
/// # Errors
///
/// `InvalidTweak` if the sum is the point at infinity.
pub fn tweak_public(base: &PublicKey, hash: &Hash32) -> Result<PublicKey, CryptoError> {
    let point = base.to_k256()?.to_projective() + ProjectivePoint::GENERATOR * hash_scalar(hash);
    let tweaked = k256::PublicKey::from_affine(AffinePoint::from(point))
        .map_err(|_| CryptoError::InvalidTweak)?;
    Ok(PublicKey::from_k256(&tweaked))
}

/// Tweak a private key by a chain hash: `d + h mod n`.
///
/// # Errors
///
/// `InvalidTweak` if the sum is zero.
pub fn tweak_private(base: &PrivateKey, hash: &Hash32) -> Result<PrivateKey, CryptoError> {
    let sum = *base.as_k256().to_nonzero_scalar() + hash_scalar(hash);
    let scalar: Option<NonZeroScalar> = NonZeroScalar::new(sum).into();
    let scalar = scalar.ok_or(CryptoError::InvalidTweak)?;
    Ok(PrivateKey::from_k256(k256::SecretKey::from(scalar)))
}

/// Combine two hashes by scalar addition modulo the curve order.
///
/// Commutative, so either party may order the operands.
pub fn add_hashes(a: &Hash32, b: &Hash32) -> Hash32 {
    (hash_scalar(a) + hash_scalar(b)).to_bytes().into()
}

/// Iterator over `(index, hash)` chain positions, starting at index 1.
#[derive(Debug, Clone)]
pub struct ChainWalk {
    index: u64,
    hash: Hash32,
}

impl ChainWalk {
    /// Walk the chain rooted at `seed_hash`.
    pub fn from_seed_hash(seed_hash: Hash32) -> Self {
        Self {
            index: 1,
            hash: seed_hash,
        }
    }

    /// Walk onward from an arbitrary position.
    pub fn from_position(hash: Hash32, index: u64) -> Self {
        Self { index, hash }
    }
}

impl Iterator for ChainWalk {
    type Item = (u64, Hash32);

    fn next(&mut self) -> Option<Self::Item> {
        let current = (self.index, self.hash);
        self.hash = advance(&self.hash);
        self.index += 1;
        Some(current)
    }
}
