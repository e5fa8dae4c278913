//! # Shared Types Crate
//!
//! Transaction and key-reference types shared across Rendezvous crates.
//!
//! ## Design Principles
//!
//! - **Typed scripts**: locking and unlocking scripts are enums, so callers
//!   extract public keys and addresses without byte-level parsing.
//! - **Deterministic identity**: a transaction id is the double SHA-256 of
//!   its canonical bincode encoding.
//! - **Opaque key references**: relationship code refers to wallet keys by
//!   `(KeyType, index)` and never holds base private keys.

pub mod errors;
pub mod keys;
pub mod script;
pub mod transaction;

pub use errors::*;
pub use keys::*;
pub use script::*;
pub use transaction::*;

pub use shared_crypto::{Hash32, PublicKey};
