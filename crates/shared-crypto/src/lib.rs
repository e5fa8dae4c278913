//! # Shared Crypto - Key Chain Primitives
//!
//! Everything the relationship engine needs from elliptic-curve and
//! symmetric cryptography, kept free of any relationship state.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `chain` | SHA-256 step, additive secp256k1 tweak | One-time key ratchet |
//! | `keys` | secp256k1 | Base and one-time keys |
//! | `ecdh` | secp256k1 ECDH + SHA-256 | Direct payload key agreement |
//! | `symmetric` | XChaCha20-Poly1305 | Payload encryption |
//! | `hashing` | SHA-256 / double SHA-256 | Transaction ids, address hashes |
//!
//! ## Chain Contract
//!
//! Given the same `(base_key, hash)` pair every party computes the same
//! one-time key:
//!
//! ```text
//! tweak_public(P, h)  = P + h·G
//! tweak_private(d, h) = d + h  (mod n)
//! tweak_public(d·G, h) == public_key_of(tweak_private(d, h))
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod ecdh;
pub mod errors;
pub mod hashing;
pub mod keys;
pub mod symmetric;

// Re-exports
pub use chain::{add_hashes, advance, seed_hash, tweak_private, tweak_public, ChainWalk, Hash32};
pub use ecdh::shared_secret;
pub use errors::CryptoError;
pub use hashing::{double_sha256, key_hash, sha256, Sha256Hasher};
pub use keys::{PrivateKey, PublicKey, Signature};
pub use symmetric::{decrypt, encrypt, Nonce, SecretKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
