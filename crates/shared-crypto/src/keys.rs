//! # secp256k1 Keys
//!
//! Base keys come from the wallet; one-time keys are derived from them with
//! the additive tweak in [`crate::chain`]. Both are plain secp256k1 keys.
//!
//! Public keys are always carried in compressed SEC1 form (33 bytes), which
//! is also the form persisted in relationship records.

use crate::CryptoError;
use k256::ecdsa::{
    signature::{Signer, Verifier},
    SigningKey, VerifyingKey,
};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Length of a compressed public key.
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Result<Self, CryptoError> {
        k256::PublicKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Create from a slice, checking length and curve membership.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; PUBLIC_KEY_LENGTH] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_LENGTH,
                actual: bytes.len(),
            })?;
        Self::from_bytes(array)
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Verify a signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<bool, CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig = k256::ecdsa::Signature::from_slice(&signature.0)
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(verifying_key.verify(message, &sig).is_ok())
    }

    pub(crate) fn to_k256(self) -> Result<k256::PublicKey, CryptoError> {
        k256::PublicKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)
    }

    pub(crate) fn from_k256(key: &k256::PublicKey) -> Self {
        let encoded = key.to_encoded_point(true);
        let mut bytes = [0u8; PUBLIC_KEY_LENGTH];
        bytes.copy_from_slice(encoded.as_bytes());
        Self(bytes)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(de::Error::custom)?;
        PublicKey::from_slice(&bytes).map_err(de::Error::custom)
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    secret: k256::SecretKey,
}

impl PrivateKey {
    /// Generate random key.
    pub fn generate() -> Self {
        Self {
            secret: k256::SecretKey::random(&mut rand::thread_rng()),
        }
    }

    /// Create from secret scalar bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let secret = k256::SecretKey::from_bytes((&bytes).into())
            .map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { secret })
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_k256(&self.secret.public_key())
    }

    /// Sign a message (deterministic RFC 6979).
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signing_key = SigningKey::from(&self.secret);
        let sig: k256::ecdsa::Signature = signing_key.sign(message);
        Signature(sig.to_bytes().into())
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes().into()
    }

    pub(crate) fn as_k256(&self) -> &k256::SecretKey {
        &self.secret
    }

    pub(crate) fn from_k256(secret: k256::SecretKey) -> Self {
        Self { secret }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let key = PrivateKey::generate();
        let signature = key.sign(b"funding input");

        assert!(key.public_key().verify(b"funding input", &signature).unwrap());
        assert!(!key.public_key().verify(b"other input", &signature).unwrap());
    }

    #[test]
    fn test_roundtrip_bytes() {
        let original = PrivateKey::generate();
        let restored = PrivateKey::from_bytes(original.to_bytes()).unwrap();

        assert_eq!(original.public_key(), restored.public_key());
    }

    #[test]
    fn test_public_key_is_compressed() {
        let key = PrivateKey::from_bytes([0x11u8; 32]).unwrap();
        let first = key.public_key().as_bytes()[0];
        assert!(first == 0x02 || first == 0x03);
    }

    #[test]
    fn test_from_slice_rejects_bad_length() {
        assert_eq!(
            PublicKey::from_slice(&[2u8; 32]),
            Err(CryptoError::InvalidKeyLength {
                expected: 33,
                actual: 32
            })
        );
    }

    #[test]
    fn test_from_bytes_rejects_off_curve() {
        let mut bytes = [0xFFu8; 33];
        bytes[0] = 0x02;
        assert_eq!(
            PublicKey::from_bytes(bytes),
            Err(CryptoError::InvalidPublicKey)
        );
    }

    #[test]
    fn test_zero_private_key_rejected() {
        assert!(PrivateKey::from_bytes([0u8; 32]).is_err());
    }

    #[test]
    fn test_public_key_serde_hex() {
        let key = PrivateKey::from_bytes([0x22u8; 32]).unwrap().public_key();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key));

        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
