//! # Relationship Service - Helper Methods
//!
//! Chain bookkeeping shared by the lifecycle and matcher paths.

use super::*;
use crate::domain::entities::{ChainPosition, Member, Relationship};
use crate::ports::outbound::AddressRecord;
use rv_telemetry::metrics::{CHAIN_ADVANCES, LOOKAHEAD_HITS};
use shared_crypto::{tweak_private, tweak_public, ChainWalk, PrivateKey};

impl<W, E, B> RelationshipService<W, E, B>
where
    W: Wallet,
    E: EnvelopeTransport,
    B: Broadcaster,
{
    /// Register our one-time keys from the current position through
    /// `lookahead_window` positions ahead, so the wallet recognises
    /// transactions spending from or paying to them.
    pub(crate) fn register_window(&self, r: &Relationship) -> Result<(), RelationshipError> {
        let window = self.config.lookahead_window as usize + 1;
        for (_, hash) in ChainWalk::from_position(*r.next_hash(), r.next_index()).take(window) {
            let key = tweak_public(r.base_key(), &hash)?;
            self.wallet
                .add_independent_key(&key, r.key_type, r.key_index, hash)?;
        }
        Ok(())
    }

    /// Step our chain once and extend the registered window.
    pub(crate) fn advance_local(&self, r: &mut Relationship) -> Result<(), RelationshipError> {
        r.advance()?;
        CHAIN_ADVANCES.with_label_values(&["local"]).inc();
        self.register_window(r)
    }

    /// Move our chain past a position located by a forward search.
    pub(crate) fn adopt_local(
        &self,
        r: &mut Relationship,
        position: ChainPosition,
    ) -> Result<(), RelationshipError> {
        tracing::debug!(
            index = position.index,
            expected = r.next_index(),
            "Local key located ahead of expected position"
        );
        LOOKAHEAD_HITS.inc();
        r.adopt(position)?;
        self.advance_local(r)
    }

    /// Private key behind a wallet record, tweaked for one-time keys.
    pub(crate) fn private_key_for(
        &self,
        record: &AddressRecord,
    ) -> Result<PrivateKey, RelationshipError> {
        let base = self.wallet.get_key(record.key_type, record.key_index)?;
        match record.key_hash {
            Some(hash) => Ok(tweak_private(&base, &hash)?),
            None => Ok(base),
        }
    }
}

/// Step a member's chain once.
pub(crate) fn advance_member(member: &mut Member) -> Result<(), RelationshipError> {
    member.advance()?;
    CHAIN_ADVANCES.with_label_values(&["member"]).inc();
    Ok(())
}

/// Move a member's chain past a position located by a forward search.
pub(crate) fn adopt_member(
    member: &mut Member,
    position: ChainPosition,
) -> Result<(), RelationshipError> {
    tracing::debug!(
        member = %member.base_key,
        index = position.index,
        expected = member.next_index(),
        "Member key located ahead of expected position"
    );
    LOOKAHEAD_HITS.inc();
    member.adopt(position)?;
    advance_member(member)
}
