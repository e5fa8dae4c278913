//! Concrete adapters for the outbound ports.

pub mod envelope;
pub mod memory;

pub use envelope::SealedEnvelope;
pub use memory::InMemoryKVStore;
