//! # Error Types
//!
//! Errors raised while inspecting transactions and scripts.

use thiserror::Error;

/// Errors from transaction and script inspection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Input index past the end of the transaction inputs.
    #[error("Input index {index} out of range ({count} inputs)")]
    InputOutOfRange { index: u32, count: usize },

    /// Output index past the end of the transaction outputs.
    #[error("Output index {index} out of range ({count} outputs)")]
    OutputOutOfRange { index: u32, count: usize },

    /// Script does not carry a public key.
    #[error("Script does not expose a public key")]
    NoPublicKey,

    /// Script is not an address script.
    #[error("Script is not an address template")]
    NotAddress,

    /// Unknown numeric key type.
    #[error("Unknown key type: {0}")]
    UnknownKeyType(u32),

    /// Canonical encoding failed.
    #[error("Encoding error: {0}")]
    Encoding(String),
}
