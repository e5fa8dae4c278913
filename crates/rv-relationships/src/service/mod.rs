//! # Relationship Service
//!
//! The engine implementing [`RelationshipApi`].
//!
//! ## Architecture
//!
//! - `lifecycle`: initiate, accept and send, plus applying each received
//!   message kind
//! - `matcher`: resolves an observed transaction to a relationship, a role
//!   and a sending member, advancing chains as one-time keys are observed
//! - `dispatch`: output decryption and whole-transaction processing
//! - `helpers`: wallet key registration and chain bookkeeping
//!
//! Every operation runs under one mutex around the [`RelationshipStore`],
//! including wallet funding and broadcast, so a lookup and the chain advance
//! it produces are never interleaved with another operation.

mod api;
mod dispatch;
mod helpers;
mod lifecycle;
mod matcher;

use crate::domain::config::RelationshipsConfig;
use crate::domain::errors::RelationshipError;
use crate::domain::store::RelationshipStore;
use crate::ports::outbound::{Broadcaster, EnvelopeTransport, Wallet};
use parking_lot::Mutex;
use std::sync::Arc;

/// Storage key of the persisted relationship collection.
pub const STORE_KEY: &[u8] = b"relationships";

/// The relationship engine.
pub struct RelationshipService<W, E, B>
where
    W: Wallet,
    E: EnvelopeTransport,
    B: Broadcaster,
{
    pub(crate) wallet: Arc<W>,
    pub(crate) envelope: Arc<E>,
    pub(crate) broadcaster: Arc<B>,
    pub(crate) config: RelationshipsConfig,
    pub(crate) store: Mutex<RelationshipStore>,
}

/// Collaborators of [`RelationshipService`].
pub struct RelationshipDependencies<W, E, B> {
    pub wallet: Arc<W>,
    pub envelope: Arc<E>,
    pub broadcaster: Arc<B>,
}

impl<W, E, B> RelationshipService<W, E, B>
where
    W: Wallet,
    E: EnvelopeTransport,
    B: Broadcaster,
{
    /// Create a service with an empty relationship collection.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: `config` fails validation
    pub fn new(
        deps: RelationshipDependencies<W, E, B>,
        config: RelationshipsConfig,
    ) -> Result<Self, RelationshipError> {
        config
            .validate()
            .map_err(|e| RelationshipError::InvalidArgument(e.to_string()))?;

        Ok(Self {
            wallet: deps.wallet,
            envelope: deps.envelope,
            broadcaster: deps.broadcaster,
            config,
            store: Mutex::new(RelationshipStore::new()),
        })
    }

    pub fn config(&self) -> &RelationshipsConfig {
        &self.config
    }

    /// Number of relationships currently held.
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}
