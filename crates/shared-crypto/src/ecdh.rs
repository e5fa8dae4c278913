//! # ECDH Key Agreement
//!
//! Shared secret between a private key and a counterparty public key,
//! hashed with SHA-256 so it can be used directly as a symmetric key.

use crate::chain::Hash32;
use crate::hashing::sha256;
use crate::keys::{PrivateKey, PublicKey};
use crate::CryptoError;

/// `SHA256(x(d·Q))` for private key `d` and public key `Q`.
pub fn shared_secret(private: &PrivateKey, public: &PublicKey) -> Result<Hash32, CryptoError> {
    let public = public.to_k256()?;
    let shared =
        k256::ecdh::diffie_hellman(private.as_k256().to_nonzero_scalar(), public.as_affine());
    Ok(sha256(shared.raw_secret_bytes().as_slice()))
}
