//! Domain layer: entities, messages, errors and the persisted layout.

pub mod codec;
pub mod config;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod messages;
pub mod store;
